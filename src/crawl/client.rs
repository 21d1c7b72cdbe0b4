// src/crawl/client.rs
// =============================================================================
// Builds the HTTP client shared by every request of a run.
//
// - A desktop browser user agent, since many image hosts refuse unknown bots
// - A cookie jar pre-loaded with the --cookie values for the seed URL, so
//   they travel with every request to that site
// - No overall timeout (see dispatch.rs)
// =============================================================================

use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::cookie::Jar;
use reqwest::Client;

use crate::config::RunConfig;

pub const USER_AGENT: &str = concat!(
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) ",
    "AppleWebKit/537.36 (KHTML, like Gecko) ",
    "Chrome/91.0.4472.124 Safari/537.36"
);

pub fn build_client(config: &RunConfig) -> Result<Client> {
    let jar = Arc::new(Jar::default());
    for cookie in &config.cookies {
        jar.add_cookie_str(&format!("{}={}", cookie.name, cookie.value), &config.seed);
    }

    Client::builder()
        .user_agent(USER_AGENT)
        .cookie_provider(jar)
        .build()
        .context("Failed to create HTTP client")
}
