use clap::Parser;
use docqa::cli::Cli;
use docqa::logging::init_logging;

fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (ignore errors if missing)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.logging_config())?;

    cli.run()
}
