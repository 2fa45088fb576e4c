//! Integrity-tracking error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum IntegrityError {
    #[error("file already registered: {path}")]
    AlreadyRegistered { path: String },

    #[error("file not registered: {path}")]
    NotFound { path: String },

    #[error("no change to approve for {path}: contents still match {hash}")]
    NoChange { path: String, hash: String },

    #[error("hash chain broken for {path}: expected previous hash {expected}, store holds {actual}")]
    HashChainBroken {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("invalid digest: {message}")]
    InvalidDigest { message: String },

    #[error("store corruption: {message}")]
    StoreCorruption { message: String },
}

impl IntegrityError {
    /// Shorthand for a corruption error
    pub fn corruption(message: impl Into<String>) -> Self {
        Self::StoreCorruption {
            message: message.into(),
        }
    }
}

impl UserFacingError for IntegrityError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::AlreadyRegistered { .. } => {
                Some("Use `verify` to check the file or `remove` before registering it again.")
            }
            Self::NotFound { .. } => Some("Register the file first with `register`."),
            Self::NoChange { .. } => {
                Some("Save the edited image before approving; the file on disk is unchanged.")
            }
            Self::HashChainBroken { .. } => {
                Some("Another approval landed first; verify the file and approve again.")
            }
            Self::InvalidDigest { .. } => None,
            Self::StoreCorruption { .. } => {
                Some("Run `chain` on the affected file and restore the database from backup.")
            }
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::AlreadyRegistered { .. } => "integrity.already_registered",
            Self::NotFound { .. } => "integrity.not_found",
            Self::NoChange { .. } => "integrity.no_change",
            Self::HashChainBroken { .. } => "integrity.hash_chain_broken",
            Self::InvalidDigest { .. } => "integrity.invalid_digest",
            Self::StoreCorruption { .. } => "integrity.store_corruption",
        };
        Some(code)
    }
}
