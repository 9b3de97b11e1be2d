//! Subcommand implementations.

pub mod build;
pub mod mirrors;
pub mod template;

use std::sync::Arc;

use cygmir_core::reporter::{ConsoleReporter, Reporter, Verbosity};

/// Console reporter honouring the global `--quiet` flag.
pub fn make_reporter(quiet: bool) -> Arc<dyn Reporter> {
    let threshold = if quiet {
        Verbosity::Low
    } else {
        Verbosity::Medium
    };
    Arc::new(ConsoleReporter::new(threshold))
}
