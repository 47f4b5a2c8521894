//! Storage-layer errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while opening or migrating the durable tiers.
///
/// Read/write failures on the hot path never surface as errors: a broken
/// cache read degrades to a miss and a broken quota write is logged, so
/// storage trouble can slow the engine down but not take it down.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Opening the SQLite database failed.
    #[error("failed to open SQLite database at {path}: {source}")]
    OpenDatabase {
        /// Location of the SQLite database on disk.
        path: PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// Creating or migrating the schema failed.
    #[error("failed to initialise schema: {source}")]
    Schema {
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// Generic SQLite failure.
    #[error(transparent)]
    Database(#[from] rusqlite::Error),
}
