use thiserror::Error;

/// Failures of the persistence layer. The engine and analytics never fail.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid analytics JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("Unable to resolve a data directory for this platform")]
    NoDataDir,
}

pub type Result<T, E = StorageError> = std::result::Result<T, E>;
