//! Cache Error Hierarchy
//!
//! Separates the three failure classes of the cache layer:
//! - consumer misuse (unmatched close, refcount underflow, listeners left on
//!   a disposed entry), which is a defect in the calling component
//! - store failures raised by helpers, propagated unchanged
//! - configuration failures

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Cache consumer broke the open/close contract
    #[error(transparent)]
    Misuse(#[from] CacheMisuseError),

    /// Underlying store read failed inside a helper
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Configuration source could not be read or parsed
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Configuration was parsed but holds unusable values
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

/// Never expected in correct code. Every variant means a caller violated the
/// nesting contract of `open`/`close` and the cache refused to corrupt state.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CacheMisuseError {
    #[error("[{cache}] close called without a matching open")]
    UnmatchedClose { cache: &'static str },

    #[error("[{cache}] refcount would drop below zero")]
    NegativeRefcount { cache: &'static str },

    #[error("[{cache}] disposing an entry that still has {listeners} listener(s)")]
    ListenersOnDispose {
        cache: &'static str,
        listeners: usize,
    },

    #[error("[{cache}] entry vanished while an open was outstanding")]
    EntryVanished { cache: &'static str },

    #[error("snapshot update called with a row of a different identity: expected {expected}, got {actual}")]
    MismatchedSnapshot { expected: String, actual: String },
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    /// Store is closed or not reachable
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A query against a single table failed
    #[error("Query on table {table} failed: {reason}")]
    Query { table: &'static str, reason: String },
}

impl Error {
    pub fn is_misuse(&self) -> bool {
        matches!(self, Error::Misuse(_))
    }
}
