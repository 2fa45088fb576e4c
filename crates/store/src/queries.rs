//! Runtime SQL queries for the integrity store

use crate::models::{EditRecordRow, FileRecordRow, NewEdit};
use imgaudit_errors::{Error, StateError};
use imgaudit_hash::Hash;
use imgaudit_types::{FileStatus, HashAlgorithm, HistoryOrder};
use sqlx::{query, query_as, query_scalar, Sqlite, Transaction};

const FILE_COLUMNS: &str = "id, filename, filepath, hash_algorithm, original_hash, current_hash, \
     file_size, registered_by, created_at, last_verified_at, last_modified_at, status, notes";

const EDIT_COLUMNS: &str = "id, file_id, edit_date, edit_type, edit_description, previous_hash, \
     new_hash, approved_by, software_used";

/// All records, newest registration first
pub const SELECT_ALL_FILES: &str = "SELECT id, filename, filepath, hash_algorithm, original_hash, \
     current_hash, file_size, registered_by, created_at, last_verified_at, last_modified_at, \
     status, notes FROM file_records ORDER BY created_at DESC, id DESC";

/// Values for a new `file_records` row
#[derive(Debug, Clone)]
pub struct NewFileRecord<'a> {
    pub filename: &'a str,
    pub filepath: &'a str,
    pub algorithm: HashAlgorithm,
    pub hash: &'a Hash,
    pub file_size: i64,
    pub registered_by: &'a str,
    pub created_at: i64,
}

/// Look up a record by its canonical path
pub async fn get_file_by_path(
    tx: &mut Transaction<'_, Sqlite>,
    filepath: &str,
) -> Result<Option<FileRecordRow>, Error> {
    let sql = format!("SELECT {FILE_COLUMNS} FROM file_records WHERE filepath = ?1");
    let row = query_as::<_, FileRecordRow>(&sql)
        .bind(filepath)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row)
}

/// Look up a record by id
pub async fn get_file_by_id(
    tx: &mut Transaction<'_, Sqlite>,
    id: i64,
) -> Result<Option<FileRecordRow>, Error> {
    let sql = format!("SELECT {FILE_COLUMNS} FROM file_records WHERE id = ?1");
    let row = query_as::<_, FileRecordRow>(&sql)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row)
}

/// Insert a new record; both hashes start equal
pub async fn insert_file_record(
    tx: &mut Transaction<'_, Sqlite>,
    record: &NewFileRecord<'_>,
) -> Result<i64, sqlx::Error> {
    let hash = record.hash.to_hex();
    let result = query(
        "INSERT INTO file_records (filename, filepath, hash_algorithm, original_hash, current_hash, \
         file_size, registered_by, created_at, status) \
         VALUES (?1, ?2, ?3, ?4, ?4, ?5, ?6, ?7, ?8)",
    )
    .bind(record.filename)
    .bind(record.filepath)
    .bind(record.algorithm.as_str())
    .bind(&hash)
    .bind(record.file_size)
    .bind(record.registered_by)
    .bind(record.created_at)
    .bind(FileStatus::Original.as_str())
    .execute(&mut **tx)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Append an edit row
pub async fn insert_edit(
    tx: &mut Transaction<'_, Sqlite>,
    file_id: i64,
    edit: &NewEdit,
    edit_date: i64,
) -> Result<i64, Error> {
    let result = query(
        "INSERT INTO edit_history (file_id, edit_date, edit_type, edit_description, \
         previous_hash, new_hash, approved_by, software_used) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )
    .bind(file_id)
    .bind(edit_date)
    .bind(edit.edit_type.as_str())
    .bind(&edit.description)
    .bind(edit.previous_hash.to_hex())
    .bind(edit.new_hash.to_hex())
    .bind(&edit.approved_by)
    .bind(&edit.software_used)
    .execute(&mut **tx)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Move `current_hash` forward, guarded on the expected previous value.
///
/// Returns the number of rows changed; zero means the record moved on.
pub async fn advance_current_hash(
    tx: &mut Transaction<'_, Sqlite>,
    file_id: i64,
    previous_hash: &Hash,
    new_hash: &Hash,
    modified_at: i64,
    notes: &str,
) -> Result<u64, Error> {
    let result = query(
        "UPDATE file_records \
         SET current_hash = ?3, status = ?4, last_modified_at = ?5, notes = ?6 \
         WHERE id = ?1 AND current_hash = ?2",
    )
    .bind(file_id)
    .bind(previous_hash.to_hex())
    .bind(new_hash.to_hex())
    .bind(FileStatus::ApprovedEdit.as_str())
    .bind(modified_at)
    .bind(notes)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected())
}

/// Record when a file was last checked
pub async fn set_last_verified(
    tx: &mut Transaction<'_, Sqlite>,
    file_id: i64,
    verified_at: i64,
) -> Result<u64, Error> {
    let result = query("UPDATE file_records SET last_verified_at = ?2 WHERE id = ?1")
        .bind(file_id)
        .bind(verified_at)
        .execute(&mut **tx)
        .await?;
    Ok(result.rows_affected())
}

/// Edits of one file in the requested order
pub async fn get_edits(
    tx: &mut Transaction<'_, Sqlite>,
    file_id: i64,
    order: HistoryOrder,
) -> Result<Vec<EditRecordRow>, Error> {
    let direction = order.as_sql();
    let sql = format!(
        "SELECT {EDIT_COLUMNS} FROM edit_history WHERE file_id = ?1 \
         ORDER BY edit_date {direction}, id {direction}"
    );
    let rows = query_as::<_, EditRecordRow>(&sql)
        .bind(file_id)
        .fetch_all(&mut **tx)
        .await?;
    Ok(rows)
}

/// Most recent edit of a file that produced `new_hash`
pub async fn find_edit_by_new_hash(
    tx: &mut Transaction<'_, Sqlite>,
    file_id: i64,
    new_hash: &Hash,
) -> Result<Option<EditRecordRow>, Error> {
    let sql = format!(
        "SELECT {EDIT_COLUMNS} FROM edit_history WHERE file_id = ?1 AND new_hash = ?2 \
         ORDER BY edit_date DESC, id DESC LIMIT 1"
    );
    let row = query_as::<_, EditRecordRow>(&sql)
        .bind(file_id)
        .bind(new_hash.to_hex())
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row)
}

pub async fn get_edit_by_id(
    tx: &mut Transaction<'_, Sqlite>,
    id: i64,
) -> Result<EditRecordRow, Error> {
    let sql = format!("SELECT {EDIT_COLUMNS} FROM edit_history WHERE id = ?1");
    query_as::<_, EditRecordRow>(&sql)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| {
            StateError::TransactionFailed {
                message: format!("edit {id} vanished inside its own transaction"),
            }
            .into()
        })
}

pub async fn count_edits(tx: &mut Transaction<'_, Sqlite>, file_id: i64) -> Result<i64, Error> {
    let count: i64 = query_scalar("SELECT COUNT(*) FROM edit_history WHERE file_id = ?1")
        .bind(file_id)
        .fetch_one(&mut **tx)
        .await?;
    Ok(count)
}

/// Delete a record together with its edit history
pub async fn delete_file(tx: &mut Transaction<'_, Sqlite>, file_id: i64) -> Result<u64, Error> {
    let edits = query("DELETE FROM edit_history WHERE file_id = ?1")
        .bind(file_id)
        .execute(&mut **tx)
        .await?
        .rows_affected();

    query("DELETE FROM file_records WHERE id = ?1")
        .bind(file_id)
        .execute(&mut **tx)
        .await?;

    Ok(edits)
}

pub async fn count_files(tx: &mut Transaction<'_, Sqlite>) -> Result<i64, Error> {
    let count: i64 = query_scalar("SELECT COUNT(*) FROM file_records")
        .fetch_one(&mut **tx)
        .await?;
    Ok(count)
}
