//! Error taxonomy for the engine and its store drivers.
//!
//! The engine distinguishes caller mistakes ([`Error::Validation`]), schema
//! declaration mistakes ([`Error::Schema`]), uniqueness conflicts
//! ([`Error::Duplicate`]) and everything else the store reports
//! ([`Error::Storage`], cause preserved). Absence of a row is never an error:
//! `get` returns `None` and `delete` reports zero rows affected.

use thiserror::Error;

/// Convenience alias used across the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// Engine-level errors surfaced to callers.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed filter/sort/payload specification: unknown operator,
    /// unknown field, or a filter shape the relation kind does not define.
    #[error("validation error: {0}")]
    Validation(String),

    /// The declared schema cannot be classified: unresolvable foreign key,
    /// ambiguous junction, unknown target entity. Raised at registration
    /// time, before the first query.
    #[error("schema error: {0}")]
    Schema(String),

    /// A uniqueness constraint was violated on a write. This is the only
    /// storage failure the engine translates.
    #[error("duplicate value: {0}")]
    Duplicate(String),

    /// Any other persistence failure, with the driver's cause intact.
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl Error {
    /// Build a validation error from anything displayable.
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// Build a schema error from anything displayable.
    pub fn schema(msg: impl Into<String>) -> Self {
        Error::Schema(msg.into())
    }
}

/// Errors produced by [`UnitOfWork`](crate::UnitOfWork) implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A declared unique column would hold the same value twice.
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    /// Any other driver failure.
    #[error("store failure: {0}")]
    Other(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl StoreError {
    /// Wrap an arbitrary driver error as a non-unique-violation failure.
    pub fn other<E>(cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StoreError::Other(Box::new(cause))
    }
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::UniqueViolation(column) => Error::Duplicate(column),
            StoreError::Other(cause) => Error::Storage(cause),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("disk on fire")]
    struct DiskError;

    #[test]
    fn unique_violation_becomes_duplicate() {
        let err: Error = StoreError::UniqueViolation("users.email".to_string()).into();
        assert!(matches!(err, Error::Duplicate(_)));
    }

    #[test]
    fn other_store_errors_keep_their_cause() {
        let err: Error = StoreError::other(DiskError).into();
        let Error::Storage(cause) = &err else {
            panic!("expected storage error");
        };
        assert_eq!(cause.to_string(), "disk on fire");
    }
}
