//! Ignore rules for the watch loop.
//!
//! Patterns use gitignore semantics (via the `ignore` crate) so the same file
//! can be shared with version control. The repository metadata directory is
//! always the first rule.

use std::path::{Path, PathBuf};

use ignore::gitignore::{Gitignore, GitignoreBuilder};

use crate::{Error, Result};

/// Rule that is always present, ahead of anything read from the file.
pub const METADATA_DIR_RULE: &str = ".git";

/// Ordered gitignore-style rules rooted at a directory. Immutable once loaded.
#[derive(Debug)]
pub struct IgnoreFilter {
    root: PathBuf,
    patterns: Vec<String>,
    matcher: Gitignore,
}

impl IgnoreFilter {
    /// Load rules from `file` (relative paths are resolved against `root`).
    ///
    /// A missing file is an error: the watch loop must know what to skip.
    pub fn load(root: &Path, file: &Path) -> Result<Self> {
        let path = root.join(file);
        if !path.is_file() {
            return Err(Error::IgnoreFileMissing { path });
        }

        let content = std::fs::read_to_string(&path).map_err(|e| Error::IgnoreFileRead {
            path: path.clone(),
            source: e,
        })?;
        Self::from_content(root, &path, &content)
    }

    /// Parse rules from file content.
    pub fn from_content(root: &Path, source_path: &Path, content: &str) -> Result<Self> {
        let mut builder = GitignoreBuilder::new(root);
        let mut patterns = Vec::new();

        builder
            .add_line(None, METADATA_DIR_RULE)
            .map_err(|e| Error::IgnorePattern {
                path: source_path.to_path_buf(),
                line: 0,
                pattern: METADATA_DIR_RULE.to_owned(),
                source: e,
            })?;
        patterns.push(METADATA_DIR_RULE.to_owned());

        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            builder
                .add_line(Some(source_path.to_path_buf()), trimmed)
                .map_err(|e| Error::IgnorePattern {
                    path: source_path.to_path_buf(),
                    line: idx + 1,
                    pattern: trimmed.to_owned(),
                    source: e,
                })?;
            patterns.push(trimmed.to_owned());
        }

        let matcher = builder.build().map_err(|e| Error::IgnoreBuild {
            path: source_path.to_path_buf(),
            source: e,
        })?;

        tracing::debug!(
            path = %source_path.display(),
            patterns = patterns.len(),
            "loaded ignore rules"
        );

        Ok(Self {
            root: root.to_path_buf(),
            patterns,
            matcher,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All rules in order, starting with [`METADATA_DIR_RULE`].
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Whether a change to `path` should be skipped.
    ///
    /// Absolute paths outside the root are never ignored.
    pub fn is_ignored(&self, path: &Path, is_dir: bool) -> bool {
        let relative = if path.is_absolute() {
            match path.strip_prefix(&self.root) {
                Ok(rel) => rel,
                Err(_) => return false,
            }
        } else {
            path
        };

        if relative.as_os_str().is_empty() {
            return false;
        }

        self.matcher
            .matched_path_or_any_parents(relative, is_dir)
            .is_ignore()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(content: &str) -> IgnoreFilter {
        IgnoreFilter::from_content(Path::new("/work"), Path::new("/work/.gitignore"), content)
            .unwrap()
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let f = filter("# comment\n\n*.log\nbuild/\n");
        assert_eq!(f.patterns(), &[".git", "*.log", "build/"]);
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let f = filter("   *.tmp   \n\t# indented comment\n");
        assert_eq!(f.patterns(), &[".git", "*.tmp"]);
    }

    #[test]
    fn metadata_dir_is_always_ignored() {
        let f = filter("");
        assert!(f.is_ignored(Path::new(".git"), true));
        assert!(f.is_ignored(Path::new(".git/objects/ab/cdef"), false));
        assert!(f.is_ignored(Path::new("/work/.git/HEAD"), false));
        assert!(!f.is_ignored(Path::new("handler.py"), false));
    }

    #[test]
    fn suffix_wildcard_matches_anywhere() {
        let f = filter("*.log\n");
        assert!(f.is_ignored(Path::new("debug.log"), false));
        assert!(f.is_ignored(Path::new("fn/echo/out.log"), false));
        assert!(!f.is_ignored(Path::new("fn/echo/handler.go"), false));
    }

    #[test]
    fn directory_only_rule_covers_children() {
        let f = filter("build/\n");
        assert!(f.is_ignored(Path::new("build"), true));
        assert!(f.is_ignored(Path::new("build/echo/Dockerfile"), false));
        assert!(!f.is_ignored(Path::new("build"), false));
    }

    #[test]
    fn negation_reincludes_path() {
        let f = filter("*.yml\n!stack.yml\n");
        assert!(f.is_ignored(Path::new("other.yml"), false));
        assert!(!f.is_ignored(Path::new("stack.yml"), false));
    }

    #[test]
    fn absolute_path_outside_root_is_not_ignored() {
        let f = filter("*.log\n");
        assert!(!f.is_ignored(Path::new("/elsewhere/debug.log"), false));
    }
}
