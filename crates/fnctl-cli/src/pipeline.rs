//! The `up` pipeline: build (or publish), push, deploy, in that order.

use fnctl_core::PipelineOptions;

use crate::watch::WatchTarget;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Build,
    Publish,
    Push,
    Deploy,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Build => "build",
            Self::Publish => "publish",
            Self::Push => "push",
            Self::Deploy => "deploy",
        })
    }
}

/// The stage operations the pipeline sequences.
#[allow(async_fn_in_trait)]
pub trait Stages {
    async fn build(&self) -> anyhow::Result<()>;
    async fn publish(&self, platforms: &[String]) -> anyhow::Result<()>;
    async fn push(&self) -> anyhow::Result<()>;
    async fn deploy(&self) -> anyhow::Result<()>;
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] fnctl_core::Error),

    #[error("{stage} failed")]
    Stage {
        stage: Stage,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

pub struct PipelineRunner<S> {
    options: PipelineOptions,
    default_platforms: Vec<String>,
    stages: S,
}

impl<S: Stages> PipelineRunner<S> {
    /// `default_platforms` is used by publish when --platforms was not given.
    pub fn new(options: PipelineOptions, default_platforms: Vec<String>, stages: S) -> Self {
        Self {
            options,
            default_platforms,
            stages,
        }
    }

    /// One pass through the pipeline. The first failing stage stops it.
    pub async fn run(&self) -> Result<(), PipelineError> {
        let opts = &self.options;
        opts.validate()?;

        if opts.publish {
            if opts.skip_push || opts.remote_builder.is_some() {
                tracing::warn!("--publish pushes its own images; --skip-push and --remote-builder are ignored");
            }
            let platforms = opts.platforms.as_deref().unwrap_or(&self.default_platforms);
            stage(Stage::Publish, self.stages.publish(platforms).await)?;
        } else {
            stage(Stage::Build, self.stages.build().await)?;

            if opts.should_push() {
                stage(Stage::Push, self.stages.push().await)?;
            } else if opts.remote_builder.is_some() {
                tracing::info!("remote builder pushed the images, skipping push");
            } else {
                tracing::info!("skipping push");
            }
        }

        if opts.skip_deploy {
            tracing::info!("skipping deploy");
        } else {
            stage(Stage::Deploy, self.stages.deploy().await)?;
        }
        Ok(())
    }
}

impl<S: Stages> WatchTarget for PipelineRunner<S> {
    async fn run_once(&self) -> anyhow::Result<()> {
        Ok(self.run().await?)
    }
}

fn stage(stage: Stage, result: anyhow::Result<()>) -> Result<(), PipelineError> {
    result.map_err(|e| PipelineError::Stage {
        stage,
        source: e.into(),
    })
}
