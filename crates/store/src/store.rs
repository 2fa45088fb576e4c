//! Integrity store handle

use crate::models::{EditRecord, FileRecord, FileRecordRow, NewEdit, RemovedRecord};
use crate::queries::{self, NewFileRecord};
use chrono::{DateTime, Utc};
use futures::stream::{Stream, StreamExt};
use imgaudit_errors::{Error, IntegrityError, StateError, StorageError};
use imgaudit_hash::{Hash, HashAlgorithm};
use imgaudit_types::{FileStatus, HistoryOrder};
use sqlx::{Pool, Sqlite, Transaction};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Durable repository of file records and their edit history
#[derive(Clone)]
pub struct IntegrityStore {
    pool: Pool<Sqlite>,
}

/// Resolve the identity key for a path.
///
/// Existing files resolve through symlinks. For a path that no longer
/// exists the parent directory is resolved instead, so records of deleted
/// files can still be looked up and removed.
///
/// # Errors
///
/// Returns an error if the path is empty or not valid UTF-8.
pub async fn canonical_key(path: &Path) -> Result<(PathBuf, String), Error> {
    let resolved = match tokio::fs::canonicalize(path).await {
        Ok(resolved) => resolved,
        Err(_) => {
            let absolute = std::path::absolute(path).map_err(|e| StorageError::InvalidPath {
                path: format!("{}: {e}", path.display()),
            })?;
            match (absolute.parent(), absolute.file_name()) {
                (Some(parent), Some(name)) => match tokio::fs::canonicalize(parent).await {
                    Ok(parent) => parent.join(name),
                    Err(_) => absolute,
                },
                _ => absolute,
            }
        }
    };

    let key = resolved
        .to_str()
        .ok_or_else(|| StorageError::InvalidPath {
            path: resolved.display().to_string(),
        })?
        .to_owned();

    Ok((resolved, key))
}

fn not_found_id(file_id: i64) -> Error {
    IntegrityError::NotFound {
        path: format!("file id {file_id}"),
    }
    .into()
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

impl IntegrityStore {
    /// Open (creating if needed) the store at `db_path` and apply migrations
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created, the
    /// database cannot be opened, or migrations fail.
    pub async fn open(db_path: &Path, busy_timeout: Duration) -> Result<Self, Error> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::io_with_path(&e, parent))?;
        }

        let pool = crate::create_pool(db_path, busy_timeout).await?;
        crate::run_migrations(&pool).await?;
        tracing::debug!(db = %db_path.display(), "integrity store opened");

        Ok(Self { pool })
    }

    /// Wrap an existing, already migrated pool
    #[must_use]
    pub fn with_pool(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Register a file under its canonical path
    ///
    /// # Errors
    ///
    /// Returns `AlreadyRegistered` if a record exists for the path, or an
    /// I/O error if the file cannot be hashed.
    pub async fn register(
        &self,
        path: &Path,
        registered_by: &str,
        algorithm: HashAlgorithm,
    ) -> Result<FileRecord, Error> {
        let (canonical, key) = canonical_key(path).await?;

        let mut tx = self.pool.begin().await?;
        if queries::get_file_by_path(&mut tx, &key).await?.is_some() {
            return Err(IntegrityError::AlreadyRegistered { path: key }.into());
        }

        let (hash, size) = Hash::hash_file_with_size(&canonical, algorithm).await?;
        let filename = display_name(&canonical);
        let new_record = NewFileRecord {
            filename: &filename,
            filepath: &key,
            algorithm,
            hash: &hash,
            file_size: i64::try_from(size)
                .map_err(|_| Error::internal(format!("file too large: {size} bytes")))?,
            registered_by,
            created_at: Utc::now().timestamp_millis(),
        };

        let id = match queries::insert_file_record(&mut tx, &new_record).await {
            Ok(id) => id,
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                return Err(IntegrityError::AlreadyRegistered { path: key }.into());
            }
            Err(e) => return Err(e.into()),
        };

        let record = Self::load_by_id(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(
            path = %key,
            hash = %hash.display_prefix(),
            size,
            registered_by,
            "file registered"
        );
        Ok(record)
    }

    /// Look up a record by path
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no record exists for the path.
    pub async fn find(&self, path: &Path) -> Result<FileRecord, Error> {
        match self.try_find(path).await? {
            Some(record) => Ok(record),
            None => Err(IntegrityError::NotFound {
                path: path.display().to_string(),
            }
            .into()),
        }
    }

    /// Look up a record by path, returning `None` when absent
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the stored row is malformed.
    pub async fn try_find(&self, path: &Path) -> Result<Option<FileRecord>, Error> {
        let (_, key) = canonical_key(path).await?;
        let mut tx = self.pool.begin().await?;
        let row = queries::get_file_by_path(&mut tx, &key).await?;
        tx.commit().await?;
        row.map(FileRecord::try_from).transpose()
    }

    /// Look up a record by id
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no record has this id.
    pub async fn find_by_id(&self, file_id: i64) -> Result<FileRecord, Error> {
        let mut tx = self.pool.begin().await?;
        let record = Self::load_by_id(&mut tx, file_id).await?;
        tx.commit().await?;
        Ok(record)
    }

    async fn load_by_id(
        tx: &mut Transaction<'_, Sqlite>,
        file_id: i64,
    ) -> Result<FileRecord, Error> {
        queries::get_file_by_id(tx, file_id)
            .await?
            .ok_or_else(|| not_found_id(file_id))
            .and_then(FileRecord::try_from)
    }

    /// Append an approved edit and advance the record's current hash.
    ///
    /// Both writes happen in one transaction. The edit is rejected if its
    /// `previous_hash` is not the hash the store currently holds.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `HashChainBroken`, `NoChange`, `InvalidDigest` if
    /// the hashes use another algorithm than the record, or a database error.
    pub async fn record_edit(&self, file_id: i64, edit: NewEdit) -> Result<EditRecord, Error> {
        let mut tx = self.pool.begin().await?;
        let record = Self::load_by_id(&mut tx, file_id).await?;
        let path = record.filepath.display().to_string();

        let algorithm = record.algorithm();
        if edit.previous_hash.algorithm() != algorithm || edit.new_hash.algorithm() != algorithm {
            return Err(IntegrityError::InvalidDigest {
                message: format!("{path} is tracked with {algorithm}"),
            }
            .into());
        }

        if edit.previous_hash != record.current_hash {
            return Err(IntegrityError::HashChainBroken {
                path,
                expected: edit.previous_hash.display_prefix(),
                actual: record.current_hash.display_prefix(),
            }
            .into());
        }

        if edit.previous_hash == edit.new_hash {
            return Err(IntegrityError::NoChange {
                path,
                hash: edit.new_hash.display_prefix(),
            }
            .into());
        }

        let now = Utc::now().timestamp_millis();
        let notes = format!("{}: {}", edit.edit_type, edit.description);
        let edit_id = queries::insert_edit(&mut tx, file_id, &edit, now).await?;
        let updated = queries::advance_current_hash(
            &mut tx,
            file_id,
            &edit.previous_hash,
            &edit.new_hash,
            now,
            &notes,
        )
        .await?;
        if updated != 1 {
            // Dropping the transaction rolls back the edit row.
            return Err(StateError::TransactionFailed {
                message: format!("current hash of {path} moved during approval"),
            }
            .into());
        }

        let stored = queries::get_edit_by_id(&mut tx, edit_id)
            .await?
            .decode(algorithm)?;
        tx.commit().await?;

        tracing::info!(
            path = %path,
            edit_type = %stored.edit_type,
            from = %stored.previous_hash.display_prefix(),
            to = %stored.new_hash.display_prefix(),
            "edit approved"
        );
        Ok(stored)
    }

    /// Edit history of a record in the requested order
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the record does not exist, or `StoreCorruption`
    /// if edits reference a record that is gone.
    pub async fn edit_history(
        &self,
        file_id: i64,
        order: HistoryOrder,
    ) -> Result<Vec<EditRecord>, Error> {
        let mut tx = self.pool.begin().await?;
        let history = Self::load_history(&mut tx, file_id, order).await;
        tx.commit().await?;
        history.map(|(_, edits)| edits)
    }

    async fn load_history(
        tx: &mut Transaction<'_, Sqlite>,
        file_id: i64,
        order: HistoryOrder,
    ) -> Result<(FileRecord, Vec<EditRecord>), Error> {
        let Some(row) = queries::get_file_by_id(tx, file_id).await? else {
            let orphans = queries::count_edits(tx, file_id).await?;
            if orphans > 0 {
                tracing::warn!(file_id, orphans, "edit rows without a file record");
                return Err(IntegrityError::corruption(format!(
                    "{orphans} edit record(s) reference missing file id {file_id}"
                ))
                .into());
            }
            return Err(not_found_id(file_id));
        };

        let record = FileRecord::try_from(row)?;
        let edits = queries::get_edits(tx, file_id, order)
            .await?
            .into_iter()
            .map(|row| row.decode(record.algorithm()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok((record, edits))
    }

    /// Most recent edit of a record whose result was `hash`
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the stored row is malformed.
    pub async fn find_edit_with_hash(
        &self,
        file_id: i64,
        hash: &Hash,
    ) -> Result<Option<EditRecord>, Error> {
        let mut tx = self.pool.begin().await?;
        let row = queries::find_edit_by_new_hash(&mut tx, file_id, hash).await?;
        tx.commit().await?;
        row.map(|row| row.decode(hash.algorithm())).transpose()
    }

    /// Check that a record's edits form an unbroken hash chain from the
    /// original hash to the current hash. Returns the number of links.
    ///
    /// # Errors
    ///
    /// Returns `StoreCorruption` describing the first broken link.
    pub async fn verify_chain(&self, file_id: i64) -> Result<usize, Error> {
        let mut tx = self.pool.begin().await?;
        let loaded = Self::load_history(&mut tx, file_id, HistoryOrder::Ascending).await;
        tx.commit().await?;
        let (record, edits) = loaded?;
        let path = record.filepath.display();

        let mut expected = &record.original_hash;
        for (index, edit) in edits.iter().enumerate() {
            if edit.previous_hash != *expected {
                tracing::warn!(%path, edit_id = edit.id, "hash chain broken");
                return Err(IntegrityError::corruption(format!(
                    "{path}: edit #{} (id {}) starts at {} but the chain is at {}",
                    index + 1,
                    edit.id,
                    edit.previous_hash.display_prefix(),
                    expected.display_prefix()
                ))
                .into());
            }
            expected = &edit.new_hash;
        }

        if *expected != record.current_hash {
            return Err(IntegrityError::corruption(format!(
                "{path}: chain ends at {} but current hash is {}",
                expected.display_prefix(),
                record.current_hash.display_prefix()
            ))
            .into());
        }

        let expected_status = if edits.is_empty() {
            FileStatus::Original
        } else {
            FileStatus::ApprovedEdit
        };
        if record.status != expected_status {
            return Err(IntegrityError::corruption(format!(
                "{path}: status {} does not match {} edit(s)",
                record.status,
                edits.len()
            ))
            .into());
        }

        Ok(edits.len())
    }

    /// Record when a file was last checked
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the record does not exist.
    pub async fn touch_verified(&self, file_id: i64, at: DateTime<Utc>) -> Result<(), Error> {
        let mut tx = self.pool.begin().await?;
        let updated = queries::set_last_verified(&mut tx, file_id, at.timestamp_millis()).await?;
        if updated == 0 {
            return Err(not_found_id(file_id));
        }
        tx.commit().await?;
        Ok(())
    }

    /// Delete a record and its edit history
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no record exists for the path.
    pub async fn remove(&self, path: &Path) -> Result<RemovedRecord, Error> {
        let (_, key) = canonical_key(path).await?;
        let mut tx = self.pool.begin().await?;

        let record = match queries::get_file_by_path(&mut tx, &key).await? {
            Some(row) => FileRecord::try_from(row)?,
            None => return Err(IntegrityError::NotFound { path: key }.into()),
        };
        let edits_removed = queries::delete_file(&mut tx, record.id).await?;
        tx.commit().await?;

        tracing::info!(path = %key, edits_removed, "file record removed");
        Ok(RemovedRecord {
            record,
            edits_removed,
        })
    }

    /// Lazily stream every record, newest registration first
    pub fn all_records(&self) -> impl Stream<Item = Result<FileRecord, Error>> + '_ {
        sqlx::query_as::<_, FileRecordRow>(queries::SELECT_ALL_FILES)
            .fetch(&self.pool)
            .map(|row| row.map_err(Error::from).and_then(FileRecord::try_from))
    }

    /// Number of registered files
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn count(&self) -> Result<u64, Error> {
        let mut tx = self.pool.begin().await?;
        let count = queries::count_files(&mut tx).await?;
        tx.commit().await?;
        Ok(count.unsigned_abs())
    }

    /// Close the pool, waiting for open connections to finish
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
