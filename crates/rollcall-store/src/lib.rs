//! rollcall-store — File-backed persistence for the attendance system.
//!
//! Deliberately flat formats, compatible with external inspection: one
//! reference JPEG and one roll-number text file per user, one JSON age
//! record per user, and a single CSV attendance ledger.

mod ages;
mod identity;
mod ledger;

pub use ages::{AgeEstimateStore, AgeRecord};
pub use identity::{IdentityStore, ROLL_NUMBER_MISSING};
pub use ledger::{AttendanceEntry, AttendanceLedger};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("image encode failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("age record parse failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("ledger: {0}")]
    Csv(#[from] csv::Error),
}
