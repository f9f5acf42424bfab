//! Error types for Roomly operations.

use thiserror::Error;

/// Result type alias for Roomly operations.
pub type Result<T> = std::result::Result<T, RoomlyError>;

/// Result type alias for repository calls.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failures reported by a repository implementation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation {
        /// Name of the violated constraint
        constraint: String,
    },

    /// The row addressed by the write does not exist.
    #[error("Row not found")]
    NotFound,

    /// Connection, query or decoding failure.
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Constraint name guarding slot exclusivity.
pub const SLOT_CONSTRAINT: &str = "reservations_active_slot_key";
/// Constraint name guarding one like per user and post.
pub const LIKE_CONSTRAINT: &str = "likes_post_user_key";
/// Constraint name guarding unique user e-mails.
pub const USER_EMAIL_CONSTRAINT: &str = "users_email_key";

impl StoreError {
    /// Returns `true` if the write violated `constraint`.
    #[must_use]
    pub fn violates(&self, constraint: &str) -> bool {
        matches!(self, Self::UniqueViolation { constraint: c } if c == constraint)
    }
}

/// Operation-level error taxonomy.
///
/// Every failure is synchronous and terminal for the operation that raised it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoomlyError {
    // ═══════════════════════════════════════════════════════════
    // Rejected before touching the store
    // ═══════════════════════════════════════════════════════════

    /// Malformed or missing input.
    #[error("Validation failed: {0}")]
    Validation(String),

    // ═══════════════════════════════════════════════════════════
    // Business rule rejections
    // ═══════════════════════════════════════════════════════════

    /// The slot is taken or a rate limit has not elapsed.
    #[error("{0}")]
    Conflict(String),

    /// The entity is not in a state that allows the transition.
    #[error("Invalid state: {0}")]
    State(String),

    /// The referenced entity does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Entity kind
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// The actor is not allowed to perform the operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    // ═══════════════════════════════════════════════════════════
    // Infrastructure
    // ═══════════════════════════════════════════════════════════

    /// Underlying store failure.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl RoomlyError {
    /// Shorthand for [`RoomlyError::NotFound`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns `true` if the caller can fix the request and retry.
    ///
    /// # Examples
    ///
    /// ```
    /// # use roomly_core::error::{RoomlyError, StoreError};
    /// assert!(RoomlyError::Validation("no slot".into()).is_user_error());
    /// assert!(!RoomlyError::Store(StoreError::NotFound).is_user_error());
    /// ```
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        !matches!(self, Self::Store(_))
    }

    /// Stable machine-readable kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION",
            Self::Conflict(_) => "CONFLICT",
            Self::State(_) => "STATE",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Store(_) => "STORE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violates_matches_constraint_name() {
        let err = StoreError::UniqueViolation {
            constraint: SLOT_CONSTRAINT.to_string(),
        };
        assert!(err.violates(SLOT_CONSTRAINT));
        assert!(!err.violates(LIKE_CONSTRAINT));
        assert!(!StoreError::NotFound.violates(SLOT_CONSTRAINT));
    }

    #[test]
    fn test_conflict_message_is_verbatim() {
        let err = RoomlyError::Conflict("Slot already taken".into());
        assert_eq!(err.to_string(), "Slot already taken");
        assert_eq!(err.kind(), "CONFLICT");
    }

    #[test]
    fn test_store_errors_convert() {
        let err: RoomlyError = StoreError::Backend("connection reset".into()).into();
        assert_eq!(err.kind(), "STORE");
        assert!(!err.is_user_error());
    }
}
