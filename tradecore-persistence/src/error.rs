use thiserror::Error;

/// Store read/write failure (spec.md §7, `PersistenceError`). Always
/// logged at the writer; never propagated into the hot path (ingestion →
/// indicators → signals → orders).
#[derive(Debug, Error, Clone)]
pub enum PersistenceError {
    #[error("store write failed: {0}")]
    Write(String),

    #[error("store read failed: {0}")]
    Read(String),

    #[error("row missing required field: {0}")]
    MalformedRow(String),
}
