//! Entity identity and optimistic-concurrency primitives.

use crate::error::{DomainError, DomainResult};

/// Minimal interface for domain entities with identity and versioned state.
///
/// The version counter increases by one on every committed mutation; stores
/// use it for stale-write detection via [`ExpectedVersion`].
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// Monotonically increasing version of the entity's state.
    fn version(&self) -> u64;
}

/// Optimistic concurrency expectation for an entity write.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip version checking (useful for idempotent writes).
    Any,
    /// Require the entity to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }

    pub fn check(self, actual: u64) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "stale write detected (expected: {self:?}, actual: {actual})"
            )))
        }
    }
}
