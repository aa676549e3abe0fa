//! Search error types.

use thiserror::Error;

/// Errors that can occur while indexing or querying.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The backend cannot serve requests right now.
    #[error("Search backend unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for search operations.
pub type Result<T> = std::result::Result<T, SearchError>;
