use anyhow::Result;
use clap::Parser;

use apiprobe::{
    app::load_config,
    cli::{handle_command, Cli},
    utils::init_logger,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    init_logger(cli.verbose);

    // Load configuration
    let config = load_config(cli.config.as_deref())?;

    // Exit with appropriate code
    if !handle_command(cli.command, &config).await? {
        std::process::exit(1);
    }

    Ok(())
}
