//! Domain error model.

use rust_decimal::Decimal;
use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic business failures (validation, stock
/// shortfalls, conflicts). Infrastructure concerns belong elsewhere; in
/// particular, broadcast transport failures are logged and swallowed and never
/// appear here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed or out-of-range input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A consumption request exceeded the total available remaining stock.
    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock {
        requested: Decimal,
        available: Decimal,
    },

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A referenced material, batch, product, or order was not found.
    #[error("not found")]
    NotFound,

    /// Lock contention or stale-write detection.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn insufficient_stock(requested: Decimal, available: Decimal) -> Self {
        Self::InsufficientStock {
            requested,
            available,
        }
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    /// Shortfall carried by an `InsufficientStock` error, if that is what
    /// this error is.
    pub fn shortfall(&self) -> Option<Decimal> {
        match self {
            Self::InsufficientStock {
                requested,
                available,
            } => Some(requested - available),
            _ => None,
        }
    }
}
