//! Record status and verification outcomes

use crate::ParseEnumError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Persisted status of a file record.
///
/// Only approval changes this value. Tampering is never written back; it is
/// a [`Classification`] computed when a file is verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    #[default]
    Original,
    ApprovedEdit,
}

impl FileStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::ApprovedEdit => "approved_edit",
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Original => f.write_str("Original"),
            Self::ApprovedEdit => f.write_str("Approved Edit"),
        }
    }
}

impl FromStr for FileStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "original" => Ok(Self::Original),
            "approved_edit" => Ok(Self::ApprovedEdit),
            _ => Err(ParseEnumError::new("file status", s)),
        }
    }
}

/// Outcome of checking a file against the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// No record exists for the path
    Unregistered,
    /// Contents hash to the record's current hash
    Verified,
    /// Contents match an earlier approved edit but not the current hash
    ApprovedModification,
    /// Contents match no sanctioned state
    Tampered,
    /// The file could not be hashed
    Error,
}

impl Classification {
    /// Whether the result needs a human to look at it
    #[must_use]
    pub fn needs_attention(self) -> bool {
        matches!(self, Self::Tampered | Self::Error | Self::ApprovedModification)
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Unregistered => "NOT REGISTERED",
            Self::Verified => "CLEAN",
            Self::ApprovedModification => "APPROVED MODIFICATION",
            Self::Tampered => "TAMPERED",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Ordering of edit history projections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryOrder {
    /// Oldest first, used for reports and chain checks
    #[default]
    Ascending,
    /// Newest first, used for interactive display
    Descending,
}

impl HistoryOrder {
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}
