mod cli;
mod commands;
mod context;
mod pipeline;
mod watch;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = cli::command()?.get_matches();

    match matches.subcommand() {
        Some(("build", m)) => commands::build(m).await?,
        Some(("push", m)) => commands::push(m).await?,
        Some(("deploy", m)) => commands::deploy(m).await?,
        Some(("publish", m)) => commands::publish(m).await?,
        Some(("up", m)) => commands::up(m).await?,
        Some(("remove", m)) => commands::remove(m).await?,
        Some((other, _)) => anyhow::bail!("unknown command '{other}'"),
        None => anyhow::bail!("no command given; see `fnctl --help`"),
    }

    Ok(())
}
