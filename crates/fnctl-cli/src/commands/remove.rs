use clap::ArgMatches;
use fnctl_core::FnctlConfig;
use fnctl_gateway::{DeleteOutcome, GatewayClient};

use crate::cli;

/// `fnctl remove NAME...`
pub async fn remove(m: &ArgMatches) -> anyhow::Result<()> {
    let config = FnctlConfig::load(std::path::Path::new("."))?;
    let gateway = config.gateway_url(cli::string(m, "gateway").as_deref(), None);
    let client = GatewayClient::new(&gateway);

    for name in cli::strings(m, "names") {
        println!("Deleting: {name}.");
        match client.delete_function(&name).await? {
            DeleteOutcome::Removed => println!("Removing old function."),
            DeleteOutcome::NotFound => println!("No existing function to remove"),
        }
    }
    Ok(())
}
