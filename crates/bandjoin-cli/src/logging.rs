//! Subscriber setup for the `bandjoin` binary.

use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Install a `fmt` subscriber writing to stdout and, if given, appending to
/// `log_file`. The filter defaults to `info` unless `RUST_LOG` is set.
///
/// Returns whether this call installed the subscriber. Only the first call
/// in a process can; a later one still creates `log_file` but nothing is
/// written to it, and that is reported through the existing subscriber.
pub fn init(log_file: Option<&Path>) -> io::Result<bool> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let installed = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder
                .with_ansi(false)
                .with_writer(io::stdout.and(Arc::new(file)))
                .try_init()
        }
        None => builder.with_writer(io::stdout).try_init(),
    };

    match (installed, log_file) {
        (Ok(()), _) => Ok(true),
        (Err(err), Some(path)) => {
            warn!(%err, log_file = %path.display(), "subscriber already installed; log file not attached");
            Ok(false)
        }
        (Err(err), None) => {
            debug!(%err, "subscriber already installed");
            Ok(false)
        }
    }
}
