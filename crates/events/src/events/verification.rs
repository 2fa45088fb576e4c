use imgaudit_types::Classification;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Counts per classification at the end of a batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchCounts {
    pub verified: usize,
    pub approved_modification: usize,
    pub tampered: usize,
    pub unregistered: usize,
    pub errors: usize,
}

impl BatchCounts {
    pub fn record(&mut self, classification: Classification) {
        match classification {
            Classification::Verified => self.verified += 1,
            Classification::ApprovedModification => self.approved_modification += 1,
            Classification::Tampered => self.tampered += 1,
            Classification::Unregistered => self.unregistered += 1,
            Classification::Error => self.errors += 1,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.verified + self.approved_modification + self.tampered + self.unregistered + self.errors
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VerificationEvent {
    Started {
        path: PathBuf,
    },

    Completed {
        path: PathBuf,
        classification: Classification,
        message: String,
    },

    BatchStarted {
        total: usize,
    },

    BatchCompleted {
        counts: BatchCounts,
        interrupted: bool,
    },
}
