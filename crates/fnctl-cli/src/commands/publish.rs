use clap::ArgMatches;
use fnctl_build::{ContainerExecutor, ImageBuilder, resolve_image};
use fnctl_core::PublishOptions;

use crate::context::Context;

/// `fnctl publish`: multi-platform build and push in one step.
pub async fn publish(m: &ArgMatches) -> anyhow::Result<()> {
    let ctx = Context::load()?;
    let opts = PublishOptions {
        build: ctx.build_options(m)?,
        platforms: ctx.platforms(m),
    };
    let stack = ctx.stack(&opts.build.yaml)?;
    opts.build.validate(stack.is_some())?;

    run_publish(&ctx, &ctx.builder(), &opts).await
}

pub(crate) async fn run_publish<E: ContainerExecutor>(
    ctx: &Context,
    builder: &ImageBuilder<E>,
    opts: &PublishOptions,
) -> anyhow::Result<()> {
    let build = &opts.build;
    let functions = ctx.functions(&build.yaml, &build.direct, build.filter.as_deref())?;

    for function in &functions {
        let image = resolve_image(&function.function.image, build.tag, &ctx.project_dir).await?;
        println!(
            "Publishing {} ({image}) for {}...",
            function.name,
            opts.platforms.join(",")
        );
        builder
            .publish(function, &image, build, &opts.platforms)
            .await?;
    }
    Ok(())
}
