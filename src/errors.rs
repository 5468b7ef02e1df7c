//! Unified error type for the studio service.
//!
//! Storage failures, configuration problems, missing records, role violations
//! and form validation all flow through [`Error`]. Business refusals (a visit
//! with no lessons left, deleting a plan still in use) are not errors; the
//! services report them as outcome values instead.

use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Field-level validation messages, keyed by form field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    /// Creates an empty set of field errors.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A set holding one message.
    #[must_use]
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Records a message against a field.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Returns true when no field has an error.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages recorded for one field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Converts into `Ok(())` when empty, or `Err(Error::Validation)`.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self))
        }
    }
}

/// Error type shared by the core services and the web layer.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or unreadable configuration
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Any failure reported by the database layer
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Socket or file I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A view context could not be serialized
    #[error("Render error: {0}")]
    Render(#[from] serde_json::Error),

    /// Submitted form data failed validation
    #[error("Validation failed")]
    Validation(FieldErrors),

    /// No student with this id
    #[error("Child not found: {id}")]
    ChildNotFound {
        /// Requested child id
        id: i64,
    },

    /// The student exists but has no subscription
    #[error("Subscription not found for child {child_id}")]
    SubscriptionNotFound {
        /// Child whose subscription was requested
        child_id: i64,
    },

    /// No plan with this id
    #[error("Subscription type not found: {id}")]
    SubscriptionTypeNotFound {
        /// Requested plan id
        id: i64,
    },

    /// No training session with this id
    #[error("Training session not found: {id}")]
    SessionNotFound {
        /// Requested session id
        id: i64,
    },

    /// No account with this id (or not in the expected group)
    #[error("Account not found: {id}")]
    AccountNotFound {
        /// Requested account id
        id: i64,
    },

    /// Request carried no usable identity
    #[error("Authentication required")]
    Unauthorized,

    /// Identity is known but the role does not allow the route
    #[error("Access denied: {reason}")]
    Forbidden {
        /// Shown to the caller
        reason: String,
    },
}

impl From<FieldErrors> for Error {
    fn from(errors: FieldErrors) -> Self {
        Self::Validation(errors)
    }
}

impl Error {
    /// True for the not-found family of errors.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ChildNotFound { .. }
                | Self::SubscriptionNotFound { .. }
                | Self::SubscriptionTypeNotFound { .. }
                | Self::SessionNotFound { .. }
                | Self::AccountNotFound { .. }
        )
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_errors_collects_messages_per_field() {
        let mut errors = FieldErrors::new();
        assert!(errors.clone().into_result().is_ok());

        errors.add("name", "required");
        errors.add("name", "too long");
        errors.add("price", "negative");

        assert_eq!(errors.get("name").map(<[String]>::len), Some(2));
        assert!(errors.get("notes").is_none());
        assert!(matches!(errors.into_result(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_not_found_family() {
        assert!(Error::ChildNotFound { id: 1 }.is_not_found());
        assert!(Error::SubscriptionNotFound { child_id: 1 }.is_not_found());
        assert!(!Error::Unauthorized.is_not_found());
    }
}
