use serde::{Deserialize, Serialize};

use imgaudit_errors::UserFacingError;

/// Structured failure information shared across domains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Short user-facing message.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl FailureContext {
    /// Build failure context from a `UserFacingError` implementation.
    #[must_use]
    pub fn from_error<E: UserFacingError + ?Sized>(error: &E) -> Self {
        Self {
            code: error.user_code().map(Into::into),
            message: error.user_message().into_owned(),
            hint: error.user_hint().map(Into::into),
        }
    }
}

pub mod edit;
pub mod general;
pub mod registry;
pub mod verification;

pub use edit::*;
pub use general::*;
pub use registry::*;
pub use verification::*;

/// Top-level application event enum that aggregates all domain-specific events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// Warnings and operation lifecycle
    General(GeneralEvent),

    /// Registration and removal of file records
    Registry(RegistryEvent),

    /// Single-file and batch verification
    Verification(VerificationEvent),

    /// Approved edits
    Edit(EditEvent),
}

impl AppEvent {
    /// Determine the appropriate tracing log level for this event
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        use tracing::Level;

        match self {
            Self::General(GeneralEvent::OperationFailed { .. })
            | Self::Registry(RegistryEvent::RegistrationFailed { .. }) => Level::ERROR,

            Self::General(GeneralEvent::Warning { .. }) => Level::WARN,
            Self::Verification(VerificationEvent::Completed { classification, .. })
                if classification.needs_attention() =>
            {
                Level::WARN
            }

            Self::Verification(VerificationEvent::Started { .. }) => Level::DEBUG,

            _ => Level::INFO,
        }
    }

    /// Forward the event to the tracing subscriber at its natural level
    pub fn log(&self) {
        let payload = serde_json::to_string(self).unwrap_or_default();
        match self.log_level() {
            tracing::Level::ERROR => tracing::error!(event = %payload),
            tracing::Level::WARN => tracing::warn!(event = %payload),
            tracing::Level::INFO => tracing::info!(event = %payload),
            tracing::Level::DEBUG => tracing::debug!(event = %payload),
            tracing::Level::TRACE => tracing::trace!(event = %payload),
        }
    }
}
