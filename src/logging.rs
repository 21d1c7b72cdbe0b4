// src/logging.rs
// =============================================================================
// Sets up tracing output on stderr.
//
// RUST_LOG wins when it is set. Otherwise a normal run only shows warnings
// (failed requests, write errors) and --verbose opens up the per-response
// trace lines.
// =============================================================================

use tracing_subscriber::EnvFilter;

fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "imgo=debug"
    } else {
        "imgo=warn"
    }
}

pub fn init_logging(verbose: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_opens_debug() {
        assert_eq!(default_directive(true), "imgo=debug");
        assert_eq!(default_directive(false), "imgo=warn");
    }
}
