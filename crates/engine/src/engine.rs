//! Verification engine

use crate::result::{
    BatchVerification, EditApproval, RegistrationFailure, RegistrationSummary, VerificationResult,
};
use crate::scan;
use chrono::Utc;
use futures::stream::Stream;
use imgaudit_errors::{Error, IntegrityError};
use imgaudit_events::{
    AppEvent, EditEvent, EventEmitter, EventSender, FailureContext, RegistryEvent,
    VerificationEvent,
};
use imgaudit_hash::{Hash, HashAlgorithm};
use imgaudit_store::{EditRecord, FileRecord, IntegrityStore, NewEdit, RemovedRecord};
use imgaudit_types::{Classification, HistoryOrder};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Classifies files against the integrity store.
///
/// The engine is the only component that advances a record's current hash,
/// and it does so only through [`VerificationEngine::approve_edit`].
/// Verification itself writes nothing but the last-verified timestamp.
#[derive(Clone)]
pub struct VerificationEngine {
    store: IntegrityStore,
    algorithm: HashAlgorithm,
    follow_symlinks: bool,
    events: Option<EventSender>,
}

impl EventEmitter for VerificationEngine {
    fn event_sender(&self) -> Option<&EventSender> {
        self.events.as_ref()
    }
}

impl VerificationEngine {
    /// Create an engine over an opened store
    #[must_use]
    pub fn new(store: IntegrityStore, algorithm: HashAlgorithm) -> Self {
        Self {
            store,
            algorithm,
            follow_symlinks: false,
            events: None,
        }
    }

    /// Open the store at `db_path` and build an engine over it
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened or migrated.
    pub async fn open(
        db_path: &Path,
        busy_timeout: Duration,
        algorithm: HashAlgorithm,
    ) -> Result<Self, Error> {
        let store = IntegrityStore::open(db_path, busy_timeout).await?;
        Ok(Self::new(store, algorithm))
    }

    /// Attach an event sender
    #[must_use]
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Follow symlinks when walking directories
    #[must_use]
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    #[must_use]
    pub fn store(&self) -> &IntegrityStore {
        &self.store
    }

    /// Algorithm used for new registrations
    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Register a file
    ///
    /// # Errors
    ///
    /// Returns `AlreadyRegistered` if the path is tracked, or an I/O error if
    /// the file cannot be hashed.
    pub async fn register(&self, path: &Path, registered_by: &str) -> Result<FileRecord, Error> {
        match self.store.register(path, registered_by, self.algorithm).await {
            Ok(record) => {
                self.emit(AppEvent::Registry(RegistryEvent::FileRegistered {
                    path: record.filepath.clone(),
                    hash_prefix: record.original_hash.display_prefix(),
                    size: record.file_size,
                    registered_by: record.registered_by.clone(),
                }));
                Ok(record)
            }
            Err(e) => {
                self.emit(AppEvent::Registry(RegistryEvent::RegistrationFailed {
                    path: path.to_path_buf(),
                    failure: FailureContext::from_error(&e),
                }));
                Err(e)
            }
        }
    }

    /// Look up the record for a path
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the path is not registered.
    pub async fn find(&self, path: &Path) -> Result<FileRecord, Error> {
        self.store.find(path).await
    }

    /// Classify the current contents of a file.
    ///
    /// Never fails: problems reading the file or the store become an
    /// `Error` result. Only `Verified`, `ApprovedModification` and
    /// `Tampered` results update the record's last-verified time.
    pub async fn verify(&self, path: &Path) -> VerificationResult {
        self.emit(AppEvent::Verification(VerificationEvent::Started {
            path: path.to_path_buf(),
        }));

        let result = match self.store.try_find(path).await {
            Ok(None) => VerificationResult::unregistered(path),
            Ok(Some(record)) => match self.check(&record).await {
                Ok(result) => result,
                Err(e) => VerificationResult::failed(path, Some(&record), &e),
            },
            Err(e) => VerificationResult::failed(path, None, &e),
        };

        match result.classification {
            Classification::Tampered => tracing::warn!(
                path = %result.path.display(),
                stored = ?result.stored_hash_prefix(),
                current = ?result.current_hash_prefix(),
                "tampering detected"
            ),
            Classification::Error => {
                tracing::warn!(path = %result.path.display(), message = %result.message, "verification failed");
            }
            classification => {
                tracing::debug!(path = %result.path.display(), %classification, "file verified");
            }
        }

        self.emit(AppEvent::Verification(VerificationEvent::Completed {
            path: result.path.clone(),
            classification: result.classification,
            message: result.message.clone(),
        }));
        result
    }

    async fn check(&self, record: &FileRecord) -> Result<VerificationResult, Error> {
        let (current, size) =
            Hash::hash_file_with_size(&record.filepath, record.algorithm()).await?;
        let checked_at = Utc::now();

        let (classification, matched_edit_id) = if current == record.current_hash {
            (Classification::Verified, None)
        } else {
            match self.store.find_edit_with_hash(record.id, &current).await? {
                Some(edit) => (Classification::ApprovedModification, Some(edit.id)),
                None => (Classification::Tampered, None),
            }
        };

        let result = VerificationResult::checked(
            record,
            classification,
            current,
            size,
            matched_edit_id,
            checked_at,
        );

        // The classification stands even if the timestamp cannot be stored
        if let Err(e) = self.store.touch_verified(record.id, checked_at).await {
            tracing::warn!(
                path = %record.filepath.display(),
                error = %e,
                "could not record verification time"
            );
            self.emit_warning_with_context(
                format!(
                    "Verification time not saved for {}",
                    record.filepath.display()
                ),
                e.to_string(),
            );
        }

        if let Some(edit_id) = matched_edit_id {
            self.emit_warning_with_context(
                format!(
                    "{} matches approved edit {edit_id}, not the latest approved state",
                    record.filepath.display()
                ),
                format!("stored hash {}", record.current_hash.display_prefix()),
            );
        }

        Ok(result)
    }

    /// Approve the file's present contents as a sanctioned edit
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the path is not registered, `NoChange` if the
    /// contents still match the current hash, an I/O error if the file
    /// cannot be hashed, or `HashChainBroken` if another approval landed
    /// first.
    pub async fn approve_edit(
        &self,
        path: &Path,
        approval: EditApproval,
    ) -> Result<EditRecord, Error> {
        let record = self.store.find(path).await?;
        let current = Hash::hash_file(&record.filepath, record.algorithm()).await?;

        if current == record.current_hash {
            self.emit(AppEvent::Edit(EditEvent::NothingToApprove {
                path: record.filepath.clone(),
            }));
            return Err(IntegrityError::NoChange {
                path: record.filepath.display().to_string(),
                hash: current.display_prefix(),
            }
            .into());
        }

        let edit = self
            .store
            .record_edit(
                record.id,
                NewEdit {
                    edit_type: approval.edit_type,
                    description: approval.description,
                    approved_by: approval.approved_by,
                    software_used: approval.software_used,
                    previous_hash: record.current_hash,
                    new_hash: current,
                },
            )
            .await?;

        self.emit(AppEvent::Edit(EditEvent::Approved {
            path: record.filepath,
            edit_type: edit.edit_type,
            previous_hash: edit.previous_hash.display_prefix(),
            new_hash: edit.new_hash.display_prefix(),
            approved_by: edit.approved_by.clone(),
        }));
        Ok(edit)
    }

    /// Verify files one after another in the order given.
    ///
    /// The token is checked before each file; once cancelled the results
    /// gathered so far are returned with `interrupted` set.
    pub async fn verify_many<I, P>(&self, paths: I, cancel: &CancellationToken) -> BatchVerification
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let paths: Vec<P> = paths.into_iter().collect();
        self.emit(AppEvent::Verification(VerificationEvent::BatchStarted {
            total: paths.len(),
        }));

        let mut batch = BatchVerification::default();
        for path in &paths {
            if cancel.is_cancelled() {
                batch.interrupted = true;
                break;
            }
            batch.push(self.verify(path.as_ref()).await);
        }

        if batch.interrupted {
            tracing::info!(
                checked = batch.results.len(),
                total = paths.len(),
                "batch verification interrupted"
            );
        }
        self.emit(AppEvent::Verification(VerificationEvent::BatchCompleted {
            counts: batch.counts.clone(),
            interrupted: batch.interrupted,
        }));
        batch
    }

    /// Register every matching file under a directory.
    ///
    /// Per-file failures are collected rather than aborting the walk.
    ///
    /// # Errors
    ///
    /// Returns an error only if the directory itself cannot be walked.
    pub async fn register_directory(
        &self,
        dir: &Path,
        extensions: &[String],
        registered_by: &str,
    ) -> Result<RegistrationSummary, Error> {
        const OPERATION: &str = "register directory";
        self.emit_operation_started(OPERATION);
        let files = self.scan(OPERATION, dir, extensions).await?;

        let mut summary = RegistrationSummary::default();
        for path in files {
            match self.register(&path, registered_by).await {
                Ok(record) => summary.registered.push(record),
                Err(e) => summary.failures.push(RegistrationFailure {
                    failure: FailureContext::from_error(&e),
                    path,
                }),
            }
        }

        self.emit_operation_completed(OPERATION, summary.failures.is_empty());
        Ok(summary)
    }

    /// Verify every matching file under a directory
    ///
    /// # Errors
    ///
    /// Returns an error only if the directory itself cannot be walked.
    pub async fn verify_directory(
        &self,
        dir: &Path,
        extensions: &[String],
        cancel: &CancellationToken,
    ) -> Result<BatchVerification, Error> {
        const OPERATION: &str = "verify directory";
        self.emit_operation_started(OPERATION);
        let files = self.scan(OPERATION, dir, extensions).await?;

        let batch = self.verify_many(files, cancel).await;
        self.emit_operation_completed(OPERATION, !batch.interrupted && !batch.has_failures());
        Ok(batch)
    }

    async fn scan(
        &self,
        operation: &str,
        dir: &Path,
        extensions: &[String],
    ) -> Result<Vec<PathBuf>, Error> {
        let files = match scan::collect_matching_files(dir, extensions, self.follow_symlinks).await
        {
            Ok(files) => files,
            Err(e) => {
                self.emit_operation_failed(operation, FailureContext::from_error(&e));
                return Err(e);
            }
        };
        self.emit(AppEvent::Registry(RegistryEvent::DirectoryScanned {
            root: dir.to_path_buf(),
            matched: files.len(),
        }));
        Ok(files)
    }

    /// Approved edits of a registered file
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the path is not registered.
    pub async fn edit_history(
        &self,
        path: &Path,
        order: HistoryOrder,
    ) -> Result<Vec<EditRecord>, Error> {
        let record = self.store.find(path).await?;
        self.store.edit_history(record.id, order).await
    }

    /// Check the hash chain of a registered file, returning its length
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the path is not registered or `StoreCorruption`
    /// if the chain is broken.
    pub async fn verify_chain(&self, path: &Path) -> Result<usize, Error> {
        let record = self.store.find(path).await?;
        self.store.verify_chain(record.id).await
    }

    /// Stop tracking a file, discarding its edit history
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the path is not registered.
    pub async fn remove(&self, path: &Path) -> Result<RemovedRecord, Error> {
        let removed = self.store.remove(path).await?;
        self.emit(AppEvent::Registry(RegistryEvent::FileRemoved {
            path: removed.record.filepath.clone(),
            edits_removed: removed.edits_removed,
        }));
        Ok(removed)
    }

    /// Lazily stream every record, newest registration first
    pub fn all_records(&self) -> impl Stream<Item = Result<FileRecord, Error>> + '_ {
        self.store.all_records()
    }

    /// Release the store's connections
    pub async fn close(&self) {
        self.store.close().await;
    }
}
