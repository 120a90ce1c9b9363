use anyhow::Result;
use clap::Parser;
use pazuzu::{cli::Cli, config::Config};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    pazuzu::setup_logger(&config.log_filter)?;
    pazuzu::run(cli, config).await
}
