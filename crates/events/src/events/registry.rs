use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// File record lifecycle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegistryEvent {
    FileRegistered {
        path: PathBuf,
        hash_prefix: String,
        size: u64,
        registered_by: String,
    },

    RegistrationFailed {
        path: PathBuf,
        failure: super::FailureContext,
    },

    FileRemoved {
        path: PathBuf,
        edits_removed: u64,
    },

    DirectoryScanned {
        root: PathBuf,
        matched: usize,
    },
}
