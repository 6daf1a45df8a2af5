use anyhow::Result;
use clap::Parser;
use fundtransfer::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    fundtransfer::logging::init_logging(cli.verbose);
    cli.run().await
}
