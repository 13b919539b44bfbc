/// Errors that can occur within the storage layer.
///
/// # Examples
///
/// ```rust
/// use dialmon_storage::error::StoreError;
///
/// let err = StoreError::Other("connection pool exhausted".to_string());
/// assert!(err.to_string().contains("exhausted"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An underlying SQLite error.
    #[error("store: SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The database file could not be opened or created.
    #[error("store: cannot open database at '{path}': {source}")]
    Open {
        path: String,
        source: rusqlite::Error,
    },

    /// Generic storage error for cases not covered by other variants.
    #[error("store: {0}")]
    Other(String),
}

/// Convenience `Result` alias for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;
