use imgaudit_types::EditType;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EditEvent {
    Approved {
        path: PathBuf,
        edit_type: EditType,
        previous_hash: String,
        new_hash: String,
        approved_by: String,
    },

    /// Approval requested but the file still matches its current hash
    NothingToApprove {
        path: PathBuf,
    },
}
