//! CLI error handling

use std::fmt;

use imgaudit_errors::UserFacingError;

/// CLI-specific error type
#[derive(Debug)]
pub enum CliError {
    /// Error from the engine or store
    Audit(imgaudit_errors::Error),
    /// Some files in a multi-file command failed; details were already shown
    Partial { failed: usize, total: usize },
    /// I/O error
    Io(std::io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Audit(e) => {
                let message = e.user_message();
                write!(f, "{message}")?;
                if let Some(code) = e.user_code() {
                    write!(f, "\n  Code: {code}")?;
                }
                if let Some(hint) = e.user_hint() {
                    write!(f, "\n  Hint: {hint}")?;
                }
                if e.is_retryable() {
                    write!(f, "\n  Retry: safe to retry this operation.")?;
                }
                Ok(())
            }
            CliError::Partial { failed, total } => {
                write!(f, "{failed} of {total} file(s) could not be processed")
            }
            CliError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Audit(e) => Some(e),
            CliError::Io(e) => Some(e),
            CliError::Partial { .. } => None,
        }
    }
}

impl From<imgaudit_errors::Error> for CliError {
    fn from(e: imgaudit_errors::Error) -> Self {
        CliError::Audit(e)
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}
