//! Append-only attendance ledger over a flat CSV file.
//!
//! One row per logged recognition event. The writer does not dedup
//! (name, date) pairs; the presence check is satisfied by ANY matching
//! row with today's date, so duplicate rows are harmless to readers.

use crate::StoreError;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";
const STATUS_PRESENT: &str = "Present";
/// Rows are never written for an unrecognized face.
const UNKNOWN_NAME: &str = "Unknown";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceEntry {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Roll No")]
    pub roll_number: String,
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Time")]
    pub time: String,
    #[serde(rename = "Status")]
    pub status: String,
}

pub struct AttendanceLedger {
    path: PathBuf,
}

impl AttendanceLedger {
    /// Open the ledger, creating the file with its header row if absent.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let ledger = Self { path: path.into() };

        if !ledger.path.exists() {
            if let Some(parent) = ledger.path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut writer = csv::Writer::from_path(&ledger.path)?;
            writer.write_record(["Name", "Roll No", "Date", "Time", "Status"])?;
            writer.flush()?;
            tracing::info!(path = %ledger.path.display(), "created attendance ledger");
        }

        Ok(ledger)
    }

    /// Append a "Present" row stamped with the local date and time.
    ///
    /// Returns `false` without writing when `name` is the unknown label.
    /// Does NOT check for an existing row today — callers logging on
    /// every recognition produce duplicate rows by design (see
    /// [`is_present_today`](Self::is_present_today)).
    pub fn log(&self, name: &str, roll_number: &str) -> Result<bool, StoreError> {
        if name == UNKNOWN_NAME {
            return Ok(false);
        }

        let now = Local::now();
        let file = fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        writer.serialize(AttendanceEntry {
            name: name.trim().to_string(),
            roll_number: roll_number.trim().to_string(),
            date: now.format(DATE_FORMAT).to_string(),
            time: now.format(TIME_FORMAT).to_string(),
            status: STATUS_PRESENT.to_string(),
        })?;
        writer.flush()?;

        tracing::info!(name, roll_number, "attendance logged");
        Ok(true)
    }

    /// Whether any row matches this name, roll number, and today's date
    /// (string equality after whitespace trimming). A missing ledger
    /// file means absent, not an error.
    pub fn is_present_today(&self, name: &str, roll_number: &str) -> Result<bool, StoreError> {
        if !self.path.exists() {
            return Ok(false);
        }

        let today = Local::now().format(DATE_FORMAT).to_string();
        let mut reader = csv::Reader::from_path(&self.path)?;

        for entry in reader.deserialize::<AttendanceEntry>() {
            let entry = entry?;
            if entry.name.trim() == name.trim()
                && entry.roll_number.trim() == roll_number.trim()
                && entry.date.trim() == today
            {
                return Ok(true);
            }
        }

        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> (tempfile::TempDir, AttendanceLedger) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attendance.csv");
        let ledger = AttendanceLedger::open(&path).unwrap();
        (dir, ledger)
    }

    fn line_count(ledger: &AttendanceLedger) -> usize {
        std::fs::read_to_string(&ledger.path).unwrap().lines().count()
    }

    #[test]
    fn test_open_creates_header_only() {
        let (_dir, ledger) = ledger();
        let contents = std::fs::read_to_string(&ledger.path).unwrap();
        assert_eq!(contents.trim(), "Name,Roll No,Date,Time,Status");
    }

    #[test]
    fn test_open_existing_file_preserved() {
        let (_dir, ledger) = ledger();
        assert!(ledger.log("Alice", "101").unwrap());

        let reopened = AttendanceLedger::open(&ledger.path).unwrap();
        assert!(reopened.is_present_today("Alice", "101").unwrap());
    }

    #[test]
    fn test_log_then_present_today() {
        let (_dir, ledger) = ledger();
        assert!(!ledger.is_present_today("Alice", "101").unwrap());

        assert!(ledger.log("Alice", "101").unwrap());
        assert!(ledger.is_present_today("Alice", "101").unwrap());
    }

    #[test]
    fn test_present_survives_unrelated_logs() {
        let (_dir, ledger) = ledger();
        assert!(ledger.log("Alice", "101").unwrap());
        assert!(ledger.log("Bob", "202").unwrap());
        assert!(ledger.log("Carol", "303").unwrap());

        assert!(ledger.is_present_today("Alice", "101").unwrap());
    }

    #[test]
    fn test_unknown_never_logged() {
        let (_dir, ledger) = ledger();
        assert!(!ledger.log("Unknown", "101").unwrap());
        assert_eq!(line_count(&ledger), 1); // header only
        assert!(!ledger.is_present_today("Unknown", "101").unwrap());
    }

    #[test]
    fn test_duplicate_rows_are_appended_and_tolerated() {
        let (_dir, ledger) = ledger();
        assert!(ledger.log("Alice", "101").unwrap());
        assert!(ledger.log("Alice", "101").unwrap());

        assert_eq!(line_count(&ledger), 3); // header + two rows
        assert!(ledger.is_present_today("Alice", "101").unwrap());
    }

    #[test]
    fn test_roll_number_must_match() {
        let (_dir, ledger) = ledger();
        assert!(ledger.log("Alice", "101").unwrap());
        assert!(!ledger.is_present_today("Alice", "999").unwrap());
    }

    #[test]
    fn test_whitespace_trimmed_on_lookup() {
        let (_dir, ledger) = ledger();
        assert!(ledger.log(" Alice ", " 101 ").unwrap());
        assert!(ledger.is_present_today("Alice", "101").unwrap());
    }

    #[test]
    fn test_missing_file_is_absent() {
        let (_dir, ledger) = ledger();
        std::fs::remove_file(&ledger.path).unwrap();
        assert!(!ledger.is_present_today("Alice", "101").unwrap());
    }
}
