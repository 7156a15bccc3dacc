//! Error types for invoice resolution, rendering and artifact access.

use crate::entity::ProductId;
use std::fmt;

/// Result type for invoice operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the invoice service.
///
/// Every operation is a single attempt; the first error aborts the request.
/// The `Display` output of the client-facing variants is the exact status
/// message returned over HTTP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A requested product ID is not in the product store.
    ///
    /// Only the first missing ID in request order is reported.
    ProductNotFound(ProductId),

    /// The requested render type is not in the format registry.
    UnknownFormat(String),

    /// A caller-supplied file name failed the file name guard.
    IllegalFileAccess,

    /// The requested cached artifact does not exist on disk.
    ArtifactMissing(String),

    /// PDF document rendering failed.
    Generation(String),

    /// Reading or writing the artifact directory failed.
    Storage(String),

    /// The product store failed to answer a lookup.
    Store(String),

    /// The request was malformed (missing or unparsable `id` parameters).
    InvalidRequest(String),

    /// Configuration error during startup.
    ///
    /// **Recovery:** Fix configuration and restart.
    ConfigError(String),
}

impl Error {
    /// True for errors caused by the caller rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::ProductNotFound(_)
                | Error::UnknownFormat(_)
                | Error::IllegalFileAccess
                | Error::ArtifactMissing(_)
                | Error::InvalidRequest(_)
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ProductNotFound(id) => write!(f, "Product of ID {} not found.", id),
            Error::UnknownFormat(kind) => write!(f, "Type {} does not exist.", kind),
            Error::IllegalFileAccess => write!(f, "Illegal file access"),
            Error::ArtifactMissing(name) => write!(f, "File {} does not exist.", name),
            Error::Generation(msg) => write!(f, "Generation error: {}", msg),
            Error::Storage(msg) => write!(f, "Storage error: {}", msg),
            Error::Store(msg) => write!(f, "Product store error: {}", msg),
            Error::InvalidRequest(msg) => write!(f, "{}", msg),
            Error::ConfigError(msg) => write!(f, "Config error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ============================================================================
// Conversions from other error types
// ============================================================================

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

impl From<lopdf::Error> for Error {
    fn from(e: lopdf::Error) -> Self {
        Error::Generation(e.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(e: tokio::task::JoinError) -> Self {
        Error::Generation(format!("render task failed: {}", e))
    }
}
