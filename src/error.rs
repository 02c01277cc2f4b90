//! Error types for Droplink.

use thiserror::Error;

/// Common error type for Droplink.
#[derive(Error, Debug)]
pub enum DropError {
    /// Database error.
    ///
    /// Generic database error wrapping failures from sqlx. Conversions
    /// from sqlx errors are automatic except for unique-key conflicts,
    /// which the upload repository maps to [`DropError::DuplicateCode`].
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Upload request carried no file part.
    #[error("no file provided")]
    NoFile,

    /// A generated code collided with an existing record.
    ///
    /// Internal signal consumed by the upload service's retry loop;
    /// never surfaced to clients directly.
    #[error("code already exists")]
    DuplicateCode,

    /// Code generation kept colliding until the retry budget ran out.
    #[error("code space exhausted after {0} attempts")]
    CodeSpaceExhausted(u32),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// The code exists but its share link has expired.
    #[error("share link expired")]
    Gone,

    /// Metadata exists but the backing blob is missing from storage.
    #[error("blob missing for stored file {0}")]
    BlobMissing(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

// Conversion from sqlx errors
impl From<sqlx::Error> for DropError {
    fn from(e: sqlx::Error) -> Self {
        DropError::Database(e.to_string())
    }
}

/// Result type alias for Droplink operations.
pub type Result<T> = std::result::Result<T, DropError>;
