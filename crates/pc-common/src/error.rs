//! Error types shared across the point-cloud streaming crates.

use thiserror::Error;

/// Result type alias using `PcError`.
pub type PcResult<T> = Result<T, PcError>;

/// Primary error type for point-cloud store/hierarchy/read operations.
#[derive(Debug, Error)]
pub enum PcError {
    // === Client-observable request errors ===
    #[error("dataset not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    // === Store errors (recoverable: caller degrades to empty/pruned) ===
    #[error("store error: {0}")]
    Store(String),

    #[error("cache i/o error: {0}")]
    CacheIo(String),

    // === Schema registry ===
    #[error("schema conflict: {0}")]
    SchemaConflict(String),

    #[error("codec error: {0}")]
    Codec(String),
}

impl PcError {
    /// HTTP status code an (out-of-scope) HTTP layer would map this to.
    pub fn http_status_code(&self) -> u16 {
        match self {
            PcError::BadRequest(_) => 400,
            PcError::NotFound(_) => 404,
            PcError::Store(_) | PcError::CacheIo(_) | PcError::SchemaConflict(_) | PcError::Codec(_) => 500,
        }
    }

    /// True if this error represents a degraded-but-valid response (prune
    /// subtree / empty frame / cache miss) rather than something that must
    /// be surfaced to the caller.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PcError::Store(_) | PcError::CacheIo(_))
    }
}

impl From<std::io::Error> for PcError {
    fn from(err: std::io::Error) -> Self {
        PcError::CacheIo(err.to_string())
    }
}

impl From<serde_json::Error> for PcError {
    fn from(err: serde_json::Error) -> Self {
        PcError::CacheIo(format!("serde_json error: {err}"))
    }
}
