//! Error types for the cache engine
//!
//! Provides unified error handling using thiserror.
//!
//! Failures of the wrapped object itself are never wrapped in these types:
//! the proxy propagates them unchanged as the target's own error type.

use thiserror::Error;

// == Cache Error Enum ==
/// Engine-level error type.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CacheError {
    /// An operation was registered twice in the same registry
    #[error("Operation already registered: {0}")]
    DuplicateOperation(String),

    /// A cacheable operation was registered with a zero TTL
    #[error("Cacheable operation has zero TTL: {0}")]
    ZeroTtl(String),

    /// Configured expire threshold is outside [0, 1]
    #[error("Expire threshold out of range: {0}")]
    InvalidThreshold(f64),
}

// == Result Type Alias ==
/// Convenience Result type for engine-level operations.
pub type Result<T> = std::result::Result<T, CacheError>;
