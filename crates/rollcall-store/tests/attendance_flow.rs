//! End-to-end store flow: register a user, then mark attendance.

use rollcall_store::{AgeEstimateStore, AttendanceLedger, IdentityStore};

#[test]
fn register_then_mark_present() {
    let dir = tempfile::tempdir().unwrap();
    let identities =
        IdentityStore::new(dir.path().join("images"), dir.path().join("roll_numbers"));
    let ledger = AttendanceLedger::open(dir.path().join("attendance.csv")).unwrap();

    let face = image::RgbImage::from_pixel(16, 16, image::Rgb([120, 110, 100]));
    identities.register("Alice", "101", &face).unwrap();

    // Nothing logged yet for today.
    assert!(!ledger.is_present_today("Alice", "101").unwrap());

    // A recognition event logs one Present row keyed by the stored roll number.
    let roll = identities.roll_number("Alice");
    assert_eq!(roll, "101");
    assert!(ledger.log("Alice", &roll).unwrap());
    assert!(ledger.is_present_today("Alice", &roll).unwrap());
}

#[test]
fn age_samples_accumulate_across_recognitions() {
    let dir = tempfile::tempdir().unwrap();
    let ages = AgeEstimateStore::new(dir.path().join("ages"));

    for age in [24, 26, 25, 27, 25, 90] {
        ages.record("Alice", age).unwrap();
    }

    // Sorted: [24, 25, 25, 26, 27, 90] — lower-median is index 3.
    assert_eq!(ages.median_age("Alice"), Some(26));
}
