//! Audit database error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum StateError {
    #[error("database error: {message}")]
    DatabaseError { message: String },

    #[error("transaction failed: {message}")]
    TransactionFailed { message: String },

    #[error("migration failed: {message}")]
    MigrationFailed { message: String },
}

impl UserFacingError for StateError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::DatabaseError { .. } => {
                Some("Make sure no other imgaudit process holds the audit database.")
            }
            Self::MigrationFailed { .. } => {
                Some("The audit database may come from a newer release; check `store.db_path`.")
            }
            Self::TransactionFailed { .. } => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::DatabaseError { .. } | Self::TransactionFailed { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::DatabaseError { .. } => "state.database",
            Self::TransactionFailed { .. } => "state.transaction_failed",
            Self::MigrationFailed { .. } => "state.migration_failed",
        };
        Some(code)
    }
}
