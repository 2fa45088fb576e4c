//! Outcomes returned by the verification engine

use chrono::{DateTime, Utc};
use imgaudit_errors::{Error, UserFacingError};
use imgaudit_events::{BatchCounts, FailureContext};
use imgaudit_hash::Hash;
use imgaudit_store::FileRecord;
use imgaudit_types::{Classification, EditType};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Operator input for approving an edit
#[derive(Debug, Clone)]
pub struct EditApproval {
    pub edit_type: EditType,
    pub description: String,
    pub approved_by: String,
    pub software_used: String,
}

/// Classification of one file with the evidence behind it
#[derive(Debug, Clone, Serialize)]
pub struct VerificationResult {
    pub path: PathBuf,
    pub filename: String,
    pub classification: Classification,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stored_hash: Option<Hash>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_hash: Option<Hash>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_stored: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_current: Option<u64>,
    /// Edit whose result the file matches, for `ApprovedModification`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_edit_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
    pub checked_at: DateTime<Utc>,
}

fn filename_of(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

impl VerificationResult {
    pub(crate) fn unregistered(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            filename: filename_of(path),
            classification: Classification::Unregistered,
            message: "File not in database".to_string(),
            stored_hash: None,
            current_hash: None,
            size_stored: None,
            size_current: None,
            matched_edit_id: None,
            error_code: None,
            checked_at: Utc::now(),
        }
    }

    /// Result for a file that could not be checked.
    ///
    /// `record` is present when the failure happened after the lookup, so the
    /// stored evidence can still be shown.
    pub(crate) fn failed(path: &Path, record: Option<&FileRecord>, error: &Error) -> Self {
        Self {
            path: record.map_or_else(|| path.to_path_buf(), |r| r.filepath.clone()),
            filename: record.map_or_else(|| filename_of(path), |r| r.filename.clone()),
            classification: Classification::Error,
            message: format!("Could not verify file: {}", error.user_message()),
            stored_hash: record.map(|r| r.current_hash.clone()),
            current_hash: None,
            size_stored: record.map(|r| r.file_size),
            size_current: None,
            matched_edit_id: None,
            error_code: error.user_code(),
            checked_at: Utc::now(),
        }
    }

    pub(crate) fn checked(
        record: &FileRecord,
        classification: Classification,
        current: Hash,
        size_current: u64,
        matched_edit_id: Option<i64>,
        checked_at: DateTime<Utc>,
    ) -> Self {
        let mut message = match classification {
            Classification::Verified => {
                "File integrity verified - no tampering detected".to_string()
            }
            Classification::ApprovedModification => format!(
                "File matches approved edit {} but not the current approved state",
                matched_edit_id.unwrap_or_default()
            ),
            _ => "WARNING: file contents changed without an approved edit".to_string(),
        };
        if size_current != record.file_size {
            use std::fmt::Write;
            let _ = write!(
                message,
                " (size {size_current} bytes, registered at {} bytes)",
                record.file_size
            );
        }

        Self {
            path: record.filepath.clone(),
            filename: record.filename.clone(),
            classification,
            message,
            stored_hash: Some(record.current_hash.clone()),
            current_hash: Some(current),
            size_stored: Some(record.file_size),
            size_current: Some(size_current),
            matched_edit_id,
            error_code: None,
            checked_at,
        }
    }

    /// Stored hash as shown in diagnostics (`0123456789abcdef...`)
    #[must_use]
    pub fn stored_hash_prefix(&self) -> Option<String> {
        self.stored_hash.as_ref().map(Hash::display_prefix)
    }

    /// Freshly computed hash as shown in diagnostics
    #[must_use]
    pub fn current_hash_prefix(&self) -> Option<String> {
        self.current_hash.as_ref().map(Hash::display_prefix)
    }
}

/// Results of verifying several files in order
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchVerification {
    pub results: Vec<VerificationResult>,
    pub counts: BatchCounts,
    /// Cancelled before every file was checked
    pub interrupted: bool,
}

impl BatchVerification {
    pub(crate) fn push(&mut self, result: VerificationResult) {
        self.counts.record(result.classification);
        self.results.push(result);
    }

    /// Whether any file was tampered with or could not be checked
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.counts.tampered > 0 || self.counts.errors > 0
    }
}

/// A file that a directory registration skipped
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationFailure {
    pub path: PathBuf,
    pub failure: FailureContext,
}

/// Outcome of registering every matching file under a directory
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegistrationSummary {
    pub registered: Vec<FileRecord>,
    pub failures: Vec<RegistrationFailure>,
}

impl RegistrationSummary {
    #[must_use]
    pub fn total(&self) -> usize {
        self.registered.len() + self.failures.len()
    }
}
