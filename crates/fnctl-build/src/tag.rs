use std::path::Path;
use tokio::process::Command;

use fnctl_core::TagFormat;

use crate::builder::BuildError;

/// Apply the tag format to an image reference.
///
/// `sha` turns `repo/echo:0.1` into `repo/echo:0.1-<sha>` (`latest-<sha>` when
/// the reference has no tag).
pub fn apply_tag(image: &str, format: TagFormat, sha: Option<&str>) -> String {
    match (format, sha) {
        (TagFormat::Sha, Some(sha)) => {
            let (name, tag) = split_tag(image);
            format!("{name}:{}-{sha}", tag.unwrap_or("latest"))
        }
        _ => image.to_owned(),
    }
}

/// Split `name[:tag]`, ignoring a registry port such as `localhost:5000/echo`.
fn split_tag(image: &str) -> (&str, Option<&str>) {
    let last_slash = image.rfind('/').map_or(0, |i| i + 1);
    match image[last_slash..].rfind(':') {
        Some(idx) => {
            let at = last_slash + idx;
            (&image[..at], Some(&image[at + 1..]))
        }
        None => (image, None),
    }
}

/// Short commit of HEAD in `project_dir`.
pub async fn git_short_sha(project_dir: &Path) -> Result<String, BuildError> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .current_dir(project_dir)
        .output()
        .await
        .map_err(|e| BuildError::GitCommand {
            detail: "failed to execute git rev-parse".to_owned(),
            source: e,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(BuildError::GitFailed {
            detail: format!(
                "git rev-parse exited with {}: {}",
                output.status,
                stderr.trim()
            ),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_owned())
}

/// Resolve the image reference for a run: looks up the commit only when needed.
pub async fn resolve_image(
    image: &str,
    format: TagFormat,
    project_dir: &Path,
) -> Result<String, BuildError> {
    match format {
        TagFormat::Latest => Ok(image.to_owned()),
        TagFormat::Sha => {
            let sha = git_short_sha(project_dir).await?;
            Ok(apply_tag(image, format, Some(&sha)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_leaves_image_untouched() {
        assert_eq!(
            apply_tag("repo/echo:0.1", TagFormat::Latest, Some("abc1234")),
            "repo/echo:0.1"
        );
    }

    #[test]
    fn sha_appends_to_existing_tag() {
        assert_eq!(
            apply_tag("repo/echo:0.1", TagFormat::Sha, Some("abc1234")),
            "repo/echo:0.1-abc1234"
        );
    }

    #[test]
    fn sha_without_tag_uses_latest() {
        assert_eq!(
            apply_tag("repo/echo", TagFormat::Sha, Some("abc1234")),
            "repo/echo:latest-abc1234"
        );
    }

    #[tokio::test]
    async fn latest_does_not_consult_git() {
        let image = resolve_image("repo/echo:0.1", TagFormat::Latest, Path::new("/nonexistent"))
            .await
            .unwrap();
        assert_eq!(image, "repo/echo:0.1");
    }

    #[tokio::test]
    async fn sha_outside_a_repository_fails() {
        let tmp = tempfile::TempDir::new().unwrap();

        let err = resolve_image("repo/echo:0.1", TagFormat::Sha, tmp.path())
            .await
            .unwrap_err();

        assert!(
            matches!(err, BuildError::GitFailed { .. } | BuildError::GitCommand { .. }),
            "{err:?}"
        );
    }

    #[test]
    fn registry_port_is_not_a_tag() {
        assert_eq!(
            apply_tag("localhost:5000/echo", TagFormat::Sha, Some("abc1234")),
            "localhost:5000/echo:latest-abc1234"
        );
        assert_eq!(
            apply_tag("localhost:5000/echo:1.2", TagFormat::Sha, Some("abc1234")),
            "localhost:5000/echo:1.2-abc1234"
        );
    }
}
