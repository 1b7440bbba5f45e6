use clap::ArgMatches;
use fnctl_build::{ContainerExecutor, ImageBuilder, resolve_image};
use fnctl_core::BuildOptions;

use crate::context::Context;

/// `fnctl build`
pub async fn build(m: &ArgMatches) -> anyhow::Result<()> {
    let ctx = Context::load()?;
    let opts = ctx.build_options(m)?;
    let stack = ctx.stack(&opts.yaml)?;
    opts.validate(stack.is_some())?;

    run_build(&ctx, &ctx.builder(), &opts).await
}

/// Build every selected function image.
pub(crate) async fn run_build<E: ContainerExecutor>(
    ctx: &Context,
    builder: &ImageBuilder<E>,
    opts: &BuildOptions,
) -> anyhow::Result<()> {
    let functions = ctx.functions(&opts.yaml, &opts.direct, opts.filter.as_deref())?;

    for function in &functions {
        let image = resolve_image(&function.function.image, opts.tag, &ctx.project_dir).await?;
        match &opts.remote_builder {
            Some(remote) => println!("Building {} ({image}) on {remote}...", function.name),
            None => println!("Building {} ({image})...", function.name),
        }
        builder.build(function, &image, opts).await?;
    }

    println!("Built {} function(s).", functions.len());
    Ok(())
}
