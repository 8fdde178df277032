use aerial_catalog::CatalogError;
use thiserror::Error;

/// Errors that can occur when using the aerial client
#[derive(Error, Debug)]
pub enum AerialError {
    /// Error from the catalog store
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// File I/O error
    #[error("file operation failed: {0}")]
    Io(#[from] std::io::Error),

    /// A pre-batch check failed; no work was started
    #[error("preflight check failed: {message}")]
    Preflight { message: String },

    /// Generic error with custom message
    #[error("{message}")]
    Other { message: String },
}

impl AerialError {
    /// Create a new preflight error
    pub fn preflight<S: Into<String>>(message: S) -> Self {
        Self::Preflight {
            message: message.into(),
        }
    }

    /// Create a generic error with custom message
    pub fn other<S: Into<String>>(message: S) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

/// Type alias for Results using AerialError
pub type Result<T> = std::result::Result<T, AerialError>;
