// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Validate them into a RunConfig (bad flags stop us before any request)
// 3. Run the scrape and wait until every image is handled
// 4. Exit with 0, or 1 after printing a fatal error
//
// Individual failed downloads are not fatal. They are logged as warnings
// while the run continues, and the exit code stays 0.
// =============================================================================

mod cli; // src/cli.rs - command-line parsing
mod config; // src/config.rs - validated run configuration
mod crawl; // src/crawl/ - fetching and the job pipeline
mod extract; // src/extract/ - finding images in HTML
mod logging; // src/logging.rs - tracing setup
mod save; // src/save/ - filenames, inline images, the limit gate

use anyhow::{anyhow, Result};
use clap::Parser;
use tracing::info;

use cli::{Cli, Commands, ScrapeArgs};
use config::RunConfig;

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        None => {
            // clap enforces this, but stay explicit
            let url = cli.url.ok_or_else(|| anyhow!("a page URL is required"))?;
            handle_scrape(&url, &cli.scrape).await
        }
    }
}

async fn handle_scrape(url: &str, args: &ScrapeArgs) -> Result<()> {
    logging::init_logging(args.verbose);

    // Fatal on any bad flag, before the first request
    let config = RunConfig::from_args(url, args)?;

    let summary = crawl::scrape(config).await?;
    info!(saved = summary.saved, failed = summary.failed, "run finished");

    Ok(())
}
