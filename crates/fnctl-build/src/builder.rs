use fnctl_core::{BuildOptions, NamedFunction};

use crate::docker::DockerError;
use crate::executor::{ContainerExecutor, RealExecutor};

/// Build, publish, and push operations, parameterized over the executor for testability.
pub struct ImageBuilder<E: ContainerExecutor = RealExecutor> {
    executor: E,
}

impl ImageBuilder<RealExecutor> {
    /// Builder running the given container CLI (`docker`, `podman`, ...).
    pub fn new(engine: &str) -> Self {
        Self {
            executor: RealExecutor::new(engine),
        }
    }
}

impl Default for ImageBuilder<RealExecutor> {
    fn default() -> Self {
        Self {
            executor: RealExecutor::default(),
        }
    }
}

impl<E: ContainerExecutor> ImageBuilder<E> {
    pub fn with_executor(executor: E) -> Self {
        Self { executor }
    }

    // ── Build ──

    /// Build one function image.
    ///
    /// With a remote builder the build runs against the remote daemon, which
    /// also pushes the result; the caller skips its own push stage.
    pub async fn build(
        &self,
        function: &NamedFunction,
        image: &str,
        opts: &BuildOptions,
    ) -> Result<(), BuildError> {
        let handler = handler_arg(function)?;
        let mut cmd = Vec::new();

        if let Some(remote) = &opts.remote_builder {
            cmd.extend(args(["--host", remote.as_str()]));
        }
        cmd.extend(args(["build", "--tag", image]));
        cmd.extend(build_arg_flags(function, opts));
        if opts.no_cache {
            cmd.push("--no-cache".to_owned());
        }
        if let Some(secret) = &opts.payload_secret {
            let secret = secret
                .to_str()
                .ok_or_else(|| BuildError::InvalidPath(secret.clone()))?;
            cmd.push("--secret".to_owned());
            cmd.push(format!("id=payload-secret,src={secret}"));
        }
        cmd.push(handler);

        tracing::info!(function = %function.name, image, "building image");
        self.executor
            .exec_streaming(&cmd)
            .await
            .map_err(|e| BuildError::Build {
                function: function.name.clone(),
                source: e,
            })?;

        if let Some(remote) = &opts.remote_builder {
            tracing::info!(function = %function.name, image, remote = %remote, "pushing from remote builder");
            self.executor
                .exec_streaming(&args(["--host", remote.as_str(), "push", image]))
                .await
                .map_err(|e| BuildError::Push {
                    function: function.name.clone(),
                    source: e,
                })?;
        }

        Ok(())
    }

    // ── Publish ──

    /// Multi-platform build and push in one step (`buildx build --push`).
    pub async fn publish(
        &self,
        function: &NamedFunction,
        image: &str,
        opts: &BuildOptions,
        platforms: &[String],
    ) -> Result<(), BuildError> {
        if platforms.is_empty() {
            return Err(BuildError::NoPlatforms);
        }

        let handler = handler_arg(function)?;
        let platform_list = platforms.join(",");

        let mut cmd = args([
            "buildx",
            "build",
            "--platform",
            &platform_list,
            "--push",
            "--tag",
            image,
        ]);
        cmd.extend(build_arg_flags(function, opts));
        if opts.no_cache {
            cmd.push("--no-cache".to_owned());
        }
        cmd.push(handler);

        tracing::info!(function = %function.name, image, platforms = %platform_list, "publishing image");
        self.executor
            .exec_streaming(&cmd)
            .await
            .map_err(|e| BuildError::Publish {
                function: function.name.clone(),
                source: e,
            })
    }

    // ── Push ──

    pub async fn push(&self, function: &NamedFunction, image: &str) -> Result<(), BuildError> {
        tracing::info!(function = %function.name, image, "pushing image");
        self.executor
            .exec_streaming(&args(["push", image]))
            .await
            .map_err(|e| BuildError::Push {
                function: function.name.clone(),
                source: e,
            })
    }
}

// ── Helper ──

fn args<const N: usize>(a: [&str; N]) -> Vec<String> {
    a.iter().map(|s| (*s).to_owned()).collect()
}

fn handler_arg(function: &NamedFunction) -> Result<String, BuildError> {
    let handler = &function.function.handler;
    handler
        .to_str()
        .map(str::to_owned)
        .ok_or_else(|| BuildError::InvalidPath(handler.clone()))
}

/// Stack build args overlaid with `--build-arg` values; flags win.
fn build_arg_flags(function: &NamedFunction, opts: &BuildOptions) -> Vec<String> {
    let mut merged = function.function.build_args.clone();
    merged.extend(opts.build_args.clone());

    merged
        .into_iter()
        .flat_map(|(k, v)| ["--build-arg".to_owned(), format!("{k}={v}")])
        .collect()
}

// ── Error types ──

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("path is not valid UTF-8: {0}")]
    InvalidPath(std::path::PathBuf),

    #[error("no platforms given for publish")]
    NoPlatforms,

    #[error("build failed for function '{function}'")]
    Build { function: String, source: DockerError },

    #[error("publish failed for function '{function}'")]
    Publish { function: String, source: DockerError },

    #[error("push failed for function '{function}'")]
    Push { function: String, source: DockerError },

    #[error("git command failed: {detail}")]
    GitCommand {
        detail: String,
        source: std::io::Error,
    },

    #[error("git failed: {detail}")]
    GitFailed { detail: String },
}
