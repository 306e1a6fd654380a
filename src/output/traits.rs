//! Output handler trait and error types

use crate::output::CrawlStatsSnapshot;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Malformed record in {file}: {message}")]
    Format { file: String, message: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Consumes the final statistics of a crawl
///
/// Handlers run after the worker pool has joined, so they see a complete,
/// immutable snapshot.
pub trait OutputHandler {
    /// Short name used in log lines
    fn name(&self) -> &str;

    /// Writes the snapshot to the handler's destination
    fn emit(&self, snapshot: &CrawlStatsSnapshot) -> OutputResult<()>;
}

/// Runs every handler in order, stopping at the first failure
pub fn emit_all(handlers: &[&dyn OutputHandler], snapshot: &CrawlStatsSnapshot) -> OutputResult<()> {
    for handler in handlers {
        handler.emit(snapshot)?;
        tracing::debug!("Output handler '{}' finished", handler.name());
    }
    Ok(())
}
