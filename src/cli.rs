// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// The tool is called with one positional argument (the page to scrape) and a
// handful of flags that control where images go and how politely we fetch
// them. There is also a tiny `version` subcommand.
//
// Numeric flags are parsed as signed integers on purpose: `--limit -1` must
// reach our validation in config.rs and fail there with a clear message,
// instead of being rejected by clap as "unexpected argument".
// =============================================================================

use clap::{Args, Parser, Subcommand};

// This struct represents our entire CLI application
//
// args_conflicts_with_subcommands + subcommand_negates_reqs let
// `imgo version` work without the otherwise-required URL.
#[derive(Parser, Debug)]
#[command(
    name = "imgo",
    about = "Download every image embedded in a web page",
    long_about = "imgo fetches a page, finds its <img> and <source> images (including srcset \
                  candidates and inline base64 data URIs) and saves them to a directory.",
    args_conflicts_with_subcommands = true,
    subcommand_negates_reqs = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Page URL to scrape images from (e.g., https://example.com/gallery)
    #[arg(required = true)]
    pub url: Option<String>,

    #[command(flatten)]
    pub scrape: ScrapeArgs,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the version number
    Version,
}

// The flags that shape a scrape run
//
// These are raw values straight from the command line. They become a
// validated RunConfig in config.rs before anything touches the network.
#[derive(Args, Debug, Clone)]
pub struct ScrapeArgs {
    /// Cookie to send with requests, as key:value. Repeat for several cookies.
    ///
    /// Example: -c session:abc123 -c theme:dark
    #[arg(short = 'c', long = "cookie", value_name = "KEY:VALUE")]
    pub cookies: Vec<String>,

    /// Directory to save the images into (must already exist)
    #[arg(long, default_value = "./")]
    pub dest: String,

    /// Seconds to wait after each request before its slot is reused
    #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
    pub delay: i64,

    /// Maximum number of images to save
    #[arg(short, long, default_value_t = 256, allow_negative_numbers = true)]
    pub limit: i64,

    /// Number of parallel HTTP requests (0 = unbounded)
    #[arg(long, default_value_t = 5, allow_negative_numbers = true)]
    pub parallel: i64,

    /// Credentials for HTTP Basic authentication, as username:password
    #[arg(short, long, value_name = "USERNAME:PASSWORD")]
    pub user: Option<String>,

    /// Trace every response
    #[arg(short, long)]
    pub verbose: bool,
}
