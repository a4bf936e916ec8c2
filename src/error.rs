//! Store error taxonomy.
//!
//! Only file-integrity and disk-space failures are fatal; everything else
//! is recoverable by retrying on the next sampling cycle.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Data file is absent and creation was not requested.
    #[error("database \"{}\" not found", path.display())]
    NotFound { path: PathBuf },

    /// Data file exists but holds 0 bytes.
    #[error("database \"{}\" contains 0 bytes and isn't a valid database", path.display())]
    EmptyDatabase { path: PathBuf },

    /// Not enough free space to create a new data file.
    #[error("not enough free disk space available in \"{}\"", dir.display())]
    InsufficientSpace { dir: PathBuf },

    /// A single statement failed to prepare or execute.
    #[error("statement failed: {sql}: {source}")]
    Statement {
        sql: String,
        #[source]
        source: sqlx::Error,
    },

    /// A multi-statement write was rolled back.
    #[error("transaction rolled back: {0}")]
    Transaction(#[source] Box<StoreError>),

    #[error("unknown interface \"{0}\"")]
    UnknownInterface(String),

    #[error("interface \"{0}\" already exists")]
    InterfaceExists(String),

    #[error("interface name must be non-empty")]
    InvalidInterfaceName,

    /// Byte delta, or the total it would produce, does not fit a SQLite INTEGER.
    #[error("traffic delta {value} exceeds storable range")]
    DeltaOutOfRange { value: u64 },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// True when the store cannot be trusted at all and the process should stop.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StoreError::EmptyDatabase { .. } | StoreError::InsufficientSpace { .. }
        )
    }

    /// False when the same call can never succeed, whatever the store state.
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::InvalidInterfaceName | StoreError::DeltaOutOfRange { .. } => false,
            StoreError::Transaction(inner) => inner.is_retryable(),
            _ => true,
        }
    }
}
