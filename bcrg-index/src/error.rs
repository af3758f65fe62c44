//! Error types for bcrg-index

use thiserror::Error;

use crate::db::DbError;
use crate::services::file_source::FileSourceError;
use crate::services::pattern_compiler::PatternError;

/// Index error type
#[derive(Debug, Error)]
pub enum IndexError {
    /// Filename template rejected
    #[error("Pattern error: {0}")]
    Pattern(#[from] PatternError),

    /// Directory listing or file access failed
    #[error("File source error: {0}")]
    Source(#[from] FileSourceError),

    /// Database document could not be loaded or saved
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// bcrg-common error
    #[error("Common error: {0}")]
    Common(#[from] bcrg_common::Error),
}

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;
