//! Database models for the integrity store
//!
//! `*Row` types mirror the tables one-to-one. The public record types are
//! decoded from them with every stored value validated; a malformed row is
//! reported as store corruption instead of panicking.

use chrono::{DateTime, Utc};
use imgaudit_errors::{Error, IntegrityError};
use imgaudit_hash::Hash;
use imgaudit_types::{EditType, FileStatus, HashAlgorithm};
use serde::Serialize;
use sqlx::FromRow;
use std::path::PathBuf;

/// Raw `file_records` row
#[derive(Debug, Clone, FromRow)]
pub struct FileRecordRow {
    pub id: i64,
    pub filename: String,
    pub filepath: String,
    pub hash_algorithm: String,
    pub original_hash: String,
    pub current_hash: String,
    pub file_size: i64,
    pub registered_by: String,
    pub created_at: i64,
    pub last_verified_at: Option<i64>,
    pub last_modified_at: Option<i64>,
    pub status: String,
    pub notes: Option<String>,
}

/// Raw `edit_history` row
#[derive(Debug, Clone, FromRow)]
pub struct EditRecordRow {
    pub id: i64,
    pub file_id: i64,
    pub edit_date: i64,
    pub edit_type: String,
    pub edit_description: String,
    pub previous_hash: String,
    pub new_hash: String,
    pub approved_by: String,
    pub software_used: String,
}

/// A monitored file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub id: i64,
    pub filename: String,
    pub filepath: PathBuf,
    pub original_hash: Hash,
    pub current_hash: Hash,
    pub file_size: u64,
    pub registered_by: String,
    pub created_date: DateTime<Utc>,
    pub last_verified: Option<DateTime<Utc>>,
    pub last_modified: Option<DateTime<Utc>>,
    pub status: FileStatus,
    pub notes: Option<String>,
}

impl FileRecord {
    /// Algorithm every digest of this record uses
    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.original_hash.algorithm()
    }
}

/// One approved edit in a file's custody chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditRecord {
    pub id: i64,
    pub file_id: i64,
    pub edit_date: DateTime<Utc>,
    pub edit_type: EditType,
    pub edit_description: String,
    pub previous_hash: Hash,
    pub new_hash: Hash,
    pub approved_by: String,
    pub software_used: String,
}

/// Input for appending an edit
#[derive(Debug, Clone)]
pub struct NewEdit {
    pub edit_type: EditType,
    pub description: String,
    pub approved_by: String,
    pub software_used: String,
    pub previous_hash: Hash,
    pub new_hash: Hash,
}

/// Result of removing a record
#[derive(Debug, Clone, Serialize)]
pub struct RemovedRecord {
    pub record: FileRecord,
    pub edits_removed: u64,
}

fn corrupt(what: &str, id: i64, detail: impl std::fmt::Display) -> Error {
    IntegrityError::corruption(format!("{what} {id}: {detail}")).into()
}

fn timestamp(what: &str, id: i64, millis: i64) -> Result<DateTime<Utc>, Error> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| corrupt(what, id, format!("timestamp {millis} out of range")))
}

fn digest(what: &str, id: i64, algorithm: HashAlgorithm, hex: &str) -> Result<Hash, Error> {
    Hash::from_hex(algorithm, hex).map_err(|e| corrupt(what, id, e))
}

impl TryFrom<FileRecordRow> for FileRecord {
    type Error = Error;

    fn try_from(row: FileRecordRow) -> Result<Self, Self::Error> {
        const WHAT: &str = "file record";
        let id = row.id;
        let algorithm: HashAlgorithm = row
            .hash_algorithm
            .parse()
            .map_err(|e| corrupt(WHAT, id, e))?;

        Ok(Self {
            id,
            filename: row.filename,
            filepath: PathBuf::from(row.filepath),
            original_hash: digest(WHAT, id, algorithm, &row.original_hash)?,
            current_hash: digest(WHAT, id, algorithm, &row.current_hash)?,
            file_size: u64::try_from(row.file_size).map_err(|e| corrupt(WHAT, id, e))?,
            registered_by: row.registered_by,
            created_date: timestamp(WHAT, id, row.created_at)?,
            last_verified: row
                .last_verified_at
                .map(|ms| timestamp(WHAT, id, ms))
                .transpose()?,
            last_modified: row
                .last_modified_at
                .map(|ms| timestamp(WHAT, id, ms))
                .transpose()?,
            status: row.status.parse().map_err(|e| corrupt(WHAT, id, e))?,
            notes: row.notes,
        })
    }
}

impl EditRecordRow {
    /// Decode using the owning record's algorithm
    ///
    /// # Errors
    ///
    /// Returns a corruption error if any stored value fails to parse.
    pub fn decode(self, algorithm: HashAlgorithm) -> Result<EditRecord, Error> {
        const WHAT: &str = "edit record";
        let id = self.id;

        Ok(EditRecord {
            id,
            file_id: self.file_id,
            edit_date: timestamp(WHAT, id, self.edit_date)?,
            edit_type: self.edit_type.parse().map_err(|e| corrupt(WHAT, id, e))?,
            edit_description: self.edit_description,
            previous_hash: digest(WHAT, id, algorithm, &self.previous_hash)?,
            new_hash: digest(WHAT, id, algorithm, &self.new_hash)?,
            approved_by: self.approved_by,
            software_used: self.software_used,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> FileRecordRow {
        let hash = Hash::from_data(HashAlgorithm::Sha256, b"gel").to_hex();
        FileRecordRow {
            id: 1,
            filename: "gel.scn".into(),
            filepath: "/lab/gel.scn".into(),
            hash_algorithm: "sha256".into(),
            original_hash: hash.clone(),
            current_hash: hash,
            file_size: 3,
            registered_by: "Geo".into(),
            created_at: 1_700_000_000_000,
            last_verified_at: None,
            last_modified_at: None,
            status: "original".into(),
            notes: None,
        }
    }

    #[test]
    fn decodes_valid_row() {
        let record = FileRecord::try_from(row()).unwrap();
        assert_eq!(record.status, FileStatus::Original);
        assert_eq!(record.algorithm(), HashAlgorithm::Sha256);
        assert_eq!(record.original_hash, record.current_hash);
    }

    #[test]
    fn bad_values_are_corruption_not_panics() {
        for mutate in [
            (|r: &mut FileRecordRow| r.current_hash = "zz".into()) as fn(&mut FileRecordRow),
            |r| r.status = "TAMPERED".into(),
            |r| r.hash_algorithm = "md5".into(),
            |r| r.file_size = -1,
        ] {
            let mut bad = row();
            mutate(&mut bad);
            let err = FileRecord::try_from(bad).unwrap_err();
            assert!(matches!(
                err,
                Error::Integrity(IntegrityError::StoreCorruption { .. })
            ));
        }
    }
}
