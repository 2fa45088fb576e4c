#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Verification engine for imgaudit
//!
//! Decides whether a file is clean, carries an earlier approved edit, or
//! was changed outside the approval workflow, and runs the approval
//! protocol that advances a record's authorized state.

mod engine;
mod result;
pub mod scan;

pub use engine::VerificationEngine;
pub use result::{
    BatchVerification, EditApproval, RegistrationFailure, RegistrationSummary, VerificationResult,
};
pub use tokio_util::sync::CancellationToken;
