// src/crawl/mod.rs
// =============================================================================
// This module runs the scrape: fetching the page, queueing its images and
// handing each response to the save module.
//
// Submodules:
// - client: the shared reqwest client (user agent, cookies)
// - dispatch: parallelism and delay between requests
// - pipeline: the job loop and its stages
// =============================================================================

mod client;
mod dispatch;
mod pipeline;

// Re-export the main entry point
pub use pipeline::{scrape, RunSummary};
