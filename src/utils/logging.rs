//! Diagnostic logging setup.
//!
//! Everything the user should see is written into the chat field; tracing
//! output is for operators and always goes to stderr so the native
//! messaging host keeps stdout for framed replies.

use std::io;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV_VAR: &str = "PROMPTLINE_LOG";
const DEFAULT_DIRECTIVE: &str = "warn";

fn build_filter(directive: Option<&str>) -> EnvFilter {
    match directive.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => {
            EnvFilter::try_new(value).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
        }
        None => EnvFilter::new(DEFAULT_DIRECTIVE),
    }
}

/// Install the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init_tracing(verbose: bool) {
    let directive = if verbose {
        Some("promptline=debug".to_string())
    } else {
        std::env::var(LOG_ENV_VAR).ok()
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(build_filter(directive.as_deref()))
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}
