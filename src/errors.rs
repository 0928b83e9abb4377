//! Unified error types for the catalog core.
//!
//! Every failure is scoped to a single user operation. Nothing here is fatal to
//! the process, and no variant is produced after a partial write.

use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised by catalog, preference and junction operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A shared catalog write carried a stale version token.
    #[error("Version conflict on catalog item {id}: expected version {expected}, found {actual}")]
    VersionConflict {
        /// Catalog item id
        id: i64,
        /// Version supplied by the caller
        expected: i32,
        /// Version currently stored
        actual: i32,
    },

    /// The `(relation, left, right)` pair already exists.
    #[error("Link {relation} already exists between {left_id} and {right_id}")]
    DuplicateLink {
        /// Relation name
        relation: String,
        /// Left catalog item id
        left_id: i64,
        /// Right catalog item id
        right_id: i64,
    },

    /// The row is still referenced and cannot be hard-deleted.
    #[error("{entity} {id} still has dependents: {dependents:?}")]
    HasDependencies {
        /// Kind of row that was targeted
        entity: &'static str,
        /// Row id
        id: i64,
        /// Dependent row counts keyed by source
        dependents: BTreeMap<String, u64>,
    },

    /// The referenced row does not exist or is not visible to the caller.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of row that was looked up
        entity: &'static str,
        /// Row id
        id: i64,
    },

    /// Malformed input caught before touching the database.
    #[error("Invalid {field}: {message}")]
    Validation {
        /// Offending field
        field: String,
        /// Developer-facing reason
        message: String,
    },

    /// The actor may not perform this operation on an entity of this scope.
    #[error("Scope violation: {message}")]
    ScopeViolation {
        /// Developer-facing reason
        message: String,
    },

    /// Configuration could not be read or parsed.
    #[error("Configuration error: {message}")]
    Config {
        /// Developer-facing reason
        message: String,
    },

    /// Transport or storage failure; the operation is treated as not applied.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl Error {
    /// Builds a [`Error::Validation`] for `field`.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Whether the caller can recover by re-fetching state and trying again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::VersionConflict { .. }
                | Self::DuplicateLink { .. }
                | Self::HasDependencies { .. }
                | Self::NotFound { .. }
                | Self::Database(_)
        )
    }

    /// Locale key of the user-facing message for this error.
    #[must_use]
    pub const fn message_key(&self) -> &'static str {
        match self {
            Self::VersionConflict { .. } => "error.version_conflict",
            Self::DuplicateLink { .. } => "error.duplicate_link",
            Self::HasDependencies { .. } => "error.has_dependencies",
            Self::NotFound { .. } => "error.not_found",
            Self::Validation { .. } => "error.validation",
            Self::ScopeViolation { .. } => "error.scope_violation",
            Self::Config { .. } => "error.config",
            Self::Database(_) => "error.transport",
        }
    }
}

/// Returns true when a database error is a unique-constraint violation.
pub(crate) fn is_unique_violation(err: &sea_orm::DbErr) -> bool {
    matches!(
        err.sql_err(),
        Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
    )
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let conflict = Error::VersionConflict {
            id: 1,
            expected: 3,
            actual: 4,
        };
        assert!(conflict.is_retryable());
        assert!(!Error::validation("code", "empty").is_retryable());
        assert!(
            !Error::ScopeViolation {
                message: "nope".to_string()
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_message_keys_are_namespaced() {
        let err = Error::NotFound {
            entity: "catalog_item",
            id: 7,
        };
        assert_eq!(err.message_key(), "error.not_found");
        assert_eq!(err.to_string(), "catalog_item 7 not found");
    }
}
