//! Rolling per-user age estimates with a derived running median.
//!
//! One JSON file per user: `{"predictions": [..], "median_age": n}`.
//! The sample log is append-only and never trimmed — old estimates keep
//! influencing the median for the lifetime of the record.

use crate::StoreError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Samples required before a median is derived.
const MIN_SAMPLES_FOR_MEDIAN: usize = 5;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AgeRecord {
    pub predictions: Vec<u32>,
    /// Lower-median of the full prediction history. Absent until the
    /// record holds [`MIN_SAMPLES_FOR_MEDIAN`] samples.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub median_age: Option<u32>,
}

pub struct AgeEstimateStore {
    ages_dir: PathBuf,
}

impl AgeEstimateStore {
    pub fn new(ages_dir: impl Into<PathBuf>) -> Self {
        Self { ages_dir: ages_dir.into() }
    }

    /// Append one age sample and re-derive the median when the history
    /// is long enough. The median is always recomputed over the FULL
    /// history, not a trailing window.
    pub fn record(&self, name: &str, age: u32) -> Result<(), StoreError> {
        fs::create_dir_all(&self.ages_dir)?;

        let mut record = self.load(name)?;
        record.predictions.push(age);
        if record.predictions.len() >= MIN_SAMPLES_FOR_MEDIAN {
            record.median_age = Some(lower_median(&record.predictions));
        }

        fs::write(self.record_path(name), serde_json::to_string(&record)?)?;
        tracing::debug!(
            name,
            age,
            samples = record.predictions.len(),
            median = ?record.median_age,
            "recorded age estimate"
        );
        Ok(())
    }

    /// The user's age record; a missing file is an empty record.
    pub fn load(&self, name: &str) -> Result<AgeRecord, StoreError> {
        let path = self.record_path(name);
        if !path.exists() {
            return Ok(AgeRecord::default());
        }
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }

    /// Derived median age, once enough samples exist. Unreadable records
    /// report no median rather than an error.
    pub fn median_age(&self, name: &str) -> Option<u32> {
        self.load(name).ok().and_then(|record| record.median_age)
    }

    fn record_path(&self, name: &str) -> PathBuf {
        self.ages_dir.join(format!("{name}.json"))
    }
}

/// Element at index ⌊n/2⌋ of the sorted sequence.
fn lower_median(values: &[u32]) -> u32 {
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    sorted[sorted.len() / 2]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, AgeEstimateStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = AgeEstimateStore::new(dir.path().join("ages"));
        (dir, store)
    }

    #[test]
    fn test_lower_median_odd() {
        assert_eq!(lower_median(&[30, 10, 20]), 20);
    }

    #[test]
    fn test_lower_median_even_picks_upper_of_pair() {
        // Lower-median is index n/2 of the sorted sequence: for
        // [10, 20, 30, 40] that is 30.
        assert_eq!(lower_median(&[40, 10, 30, 20]), 30);
    }

    #[test]
    fn test_no_median_before_fifth_sample() {
        let (_dir, store) = store();
        for age in [21, 22, 23, 24] {
            store.record("Alice", age).unwrap();
        }
        assert_eq!(store.median_age("Alice"), None);
    }

    #[test]
    fn test_median_appears_at_fifth_sample() {
        let (_dir, store) = store();
        for age in [25, 21, 29, 23, 27] {
            store.record("Alice", age).unwrap();
        }
        assert_eq!(store.median_age("Alice"), Some(25));
    }

    #[test]
    fn test_median_recomputed_over_full_history() {
        let (_dir, store) = store();
        for age in [20, 20, 20, 20, 20] {
            store.record("Alice", age).unwrap();
        }
        assert_eq!(store.median_age("Alice"), Some(20));

        // Three more high samples shift the full-history median.
        for age in [40, 40, 40] {
            store.record("Alice", age).unwrap();
        }
        // Sorted: [20,20,20,20,20,40,40,40], index 4 → 20.
        assert_eq!(store.median_age("Alice"), Some(20));

        for age in [40, 40] {
            store.record("Alice", age).unwrap();
        }
        // Sorted: [20×5, 40×5], index 5 → 40.
        assert_eq!(store.median_age("Alice"), Some(40));
    }

    #[test]
    fn test_median_missing_user() {
        let (_dir, store) = store();
        assert_eq!(store.median_age("Nobody"), None);
    }

    #[test]
    fn test_record_file_shape() {
        let (_dir, store) = store();
        store.record("Alice", 30).unwrap();

        let raw = std::fs::read_to_string(store.record_path("Alice")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["predictions"], serde_json::json!([30]));
        // No median key until the threshold is reached.
        assert!(value.get("median_age").is_none());
    }

    #[test]
    fn test_records_are_per_user() {
        let (_dir, store) = store();
        store.record("Alice", 30).unwrap();
        store.record("Bob", 50).unwrap();

        assert_eq!(store.load("Alice").unwrap().predictions, vec![30]);
        assert_eq!(store.load("Bob").unwrap().predictions, vec![50]);
    }
}
