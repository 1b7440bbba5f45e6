use clap::ArgMatches;
use fnctl_build::{ContainerExecutor, ImageBuilder, resolve_image};
use fnctl_core::PushOptions;

use crate::context::Context;

/// `fnctl push`
pub async fn push(m: &ArgMatches) -> anyhow::Result<()> {
    let ctx = Context::load()?;
    let opts = ctx.push_options(m)?;
    run_push(&ctx, &ctx.builder(), &opts).await
}

pub(crate) async fn run_push<E: ContainerExecutor>(
    ctx: &Context,
    builder: &ImageBuilder<E>,
    opts: &PushOptions,
) -> anyhow::Result<()> {
    let functions = ctx.functions(&opts.yaml, &opts.direct, opts.filter.as_deref())?;

    for function in &functions {
        let image = resolve_image(&function.function.image, opts.tag, &ctx.project_dir).await?;
        println!("Pushing {} ({image})...", function.name);
        builder.push(function, &image).await?;
    }
    Ok(())
}
