//! Logging setup for the kiln CLI.
//!
//! Built on the `tracing` ecosystem:
//!
//! - `--verbose` enables debug output for kiln crates
//! - `--quiet` limits output to errors
//! - `RUST_LOG` overrides the default filter
//!
//! # Example
//!
//! ```rust,no_run
//! use kiln_dev::logger::init_logger;
//!
//! init_logger(false, false, false);
//! tracing::info!("Watching for changes");
//! ```

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const VERBOSE_FILTER: &str = "kiln=debug,kiln_dev=debug,kiln_graph=debug";
const QUIET_FILTER: &str = "kiln_dev=error,kiln_graph=error";
const DEFAULT_FILTER: &str = "kiln_dev=info,kiln_graph=info";

/// Pick the filter directives for the given flags.
///
/// `--verbose` wins over `--quiet`, and both win over `RUST_LOG`.
fn filter_for(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else if quiet {
        EnvFilter::new(QUIET_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Initialize the global tracing subscriber.
///
/// Call once at startup, before anything logs.
///
/// # Arguments
///
/// * `verbose` - Debug-level logging for kiln crates (overrides `quiet`)
/// * `quiet` - Errors only
/// * `no_color` - Disable ANSI colors
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    init_logger_with_filter(filter_for(verbose, quiet), no_color);
}

/// Initialize the global subscriber with an explicit filter.
///
/// ```rust,no_run
/// use kiln_dev::logger::init_logger_with_filter;
/// use tracing_subscriber::EnvFilter;
///
/// init_logger_with_filter(EnvFilter::new("kiln_dev=trace,notify=off"), false);
/// ```
pub fn init_logger_with_filter(filter: EnvFilter, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .compact();

    // A second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
