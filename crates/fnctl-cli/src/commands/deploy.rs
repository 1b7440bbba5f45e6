use clap::ArgMatches;
use fnctl_build::resolve_image;
use fnctl_core::DeployOptions;
use fnctl_gateway::{DeployMode, DeployOutcome, DeployRequest, GatewayClient};

use crate::context::Context;

/// `fnctl deploy`
pub async fn deploy(m: &ArgMatches) -> anyhow::Result<()> {
    let ctx = Context::load()?;
    let yaml = crate::context::yaml(m);
    let stack = ctx.stack(&yaml)?;
    let opts = ctx.deploy_options(m, stack.as_ref())?;
    opts.validate(stack.is_some())?;

    run_deploy(&ctx, &GatewayClient::new(&opts.gateway), &opts).await
}

/// Deploy every selected function to the gateway.
pub(crate) async fn run_deploy(
    ctx: &Context,
    gateway: &GatewayClient,
    opts: &DeployOptions,
) -> anyhow::Result<()> {
    let functions = ctx.functions(&opts.yaml, &opts.direct, opts.filter.as_deref())?;
    let mode = DeployMode::from_flags(opts.replace, opts.update);

    for function in &functions {
        let image = resolve_image(&function.function.image, opts.tag, &ctx.project_dir).await?;
        let request = DeployRequest::from_function(function, &image, opts);

        println!("Deploying {} ({image})...", function.name);
        let outcome = gateway.deploy_function(&request, mode).await?;
        let verb = match outcome {
            DeployOutcome::Updated => "Updated",
            DeployOutcome::Created => "Deployed",
        };
        println!(
            "{verb} {}: {}/function/{}",
            function.name,
            gateway.gateway(),
            function.name
        );
    }
    Ok(())
}
