use std::path::Path;
use std::time::Duration;

use anyhow::Context as _;
use clap::ArgMatches;
use fnctl_build::{ContainerExecutor, ImageBuilder, RealExecutor};
use fnctl_core::{
    BuildOptions, DeployOptions, IgnoreFilter, PipelineOptions, PublishOptions, PushOptions,
};
use fnctl_gateway::GatewayClient;
use tokio_util::sync::CancellationToken;

use super::{run_build, run_deploy, run_publish, run_push};
use crate::context::Context;
use crate::pipeline::{PipelineRunner, Stages};
use crate::watch::WatchLoop;

/// `fnctl up`: build (or publish), push, and deploy, optionally on every change.
pub async fn up(m: &ArgMatches) -> anyhow::Result<()> {
    let ctx = Context::load()?;

    let build = ctx.build_options(m)?;
    let push = ctx.push_options(m)?;
    let stack = ctx.stack(&build.yaml)?;
    let deploy = ctx.deploy_options(m, stack.as_ref())?;
    let pipeline = ctx.pipeline_options(m);

    pre_run(&build, &deploy, &pipeline, stack.is_some())?;

    let stages = LiveStages {
        ctx: &ctx,
        builder: ctx.builder(),
        gateway: GatewayClient::new(&deploy.gateway),
        build,
        push,
        deploy,
    };
    let runner = PipelineRunner::new(
        pipeline.clone(),
        ctx.config.build.default_platforms.clone(),
        stages,
    );

    if !pipeline.watch {
        runner.run().await?;
        return Ok(());
    }

    let root = ctx
        .project_dir
        .canonicalize()
        .with_context(|| format!("cannot watch {}", ctx.project_dir.display()))?;
    let filter = IgnoreFilter::load(&root, Path::new(&ctx.config.watch.ignore_file))?;
    let watch = WatchLoop::new(filter, Duration::from_millis(ctx.config.watch.debounce_ms));

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("interrupt received, stopping watch"),
            Err(e) => tracing::warn!(error = %e, "could not listen for interrupt"),
        }
        on_interrupt.cancel();
    });

    watch.run(&runner, &cancel).await?;
    Ok(())
}

/// Checks that run before any stage: build and deploy preconditions, then
/// the pipeline's own option rules.
fn pre_run(
    build: &BuildOptions,
    deploy: &DeployOptions,
    pipeline: &PipelineOptions,
    stack_present: bool,
) -> fnctl_core::Result<()> {
    build.validate(stack_present)?;
    deploy.validate(stack_present)?;
    pipeline.validate()
}

/// Stages backed by the container CLI and the gateway.
struct LiveStages<'a, E: ContainerExecutor = RealExecutor> {
    ctx: &'a Context,
    builder: ImageBuilder<E>,
    gateway: GatewayClient,
    build: BuildOptions,
    push: PushOptions,
    deploy: DeployOptions,
}

impl<E: ContainerExecutor> Stages for LiveStages<'_, E> {
    async fn build(&self) -> anyhow::Result<()> {
        run_build(self.ctx, &self.builder, &self.build).await
    }

    async fn publish(&self, platforms: &[String]) -> anyhow::Result<()> {
        let opts = PublishOptions {
            build: BuildOptions {
                remote_builder: None,
                payload_secret: None,
                ..self.build.clone()
            },
            platforms: platforms.to_vec(),
        };
        run_publish(self.ctx, &self.builder, &opts).await
    }

    async fn push(&self) -> anyhow::Result<()> {
        run_push(self.ctx, &self.builder, &self.push).await
    }

    async fn deploy(&self) -> anyhow::Result<()> {
        run_deploy(self.ctx, &self.gateway, &self.deploy).await
    }
}
