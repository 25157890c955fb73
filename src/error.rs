use thiserror::Error;

/// Infrastructure and input faults.
///
/// These never describe a business outcome; a store that cannot be reached is
/// reported as `Rejection::Internal`, not as a missing or redeemed record.
#[derive(Error, Debug)]
pub enum ScanPassError {
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDBError(#[from] rocksdb::Error),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl ScanPassError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(Box::new(std::io::Error::other(message.into())))
    }
}

pub type Result<T> = std::result::Result<T, ScanPassError>;
