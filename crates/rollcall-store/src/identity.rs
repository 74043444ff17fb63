//! Per-user reference image and roll-number persistence.
//!
//! The display name is the whole identity: it is the filename stem of
//! both the reference JPEG and the roll-number text file. Registering a
//! name that already exists silently replaces both files.

use crate::StoreError;
use std::fs;
use std::path::PathBuf;

/// Sentinel returned when a user has no roll-number file.
pub const ROLL_NUMBER_MISSING: &str = "N/A";

pub struct IdentityStore {
    images_dir: PathBuf,
    rolls_dir: PathBuf,
}

impl IdentityStore {
    pub fn new(images_dir: impl Into<PathBuf>, rolls_dir: impl Into<PathBuf>) -> Self {
        Self {
            images_dir: images_dir.into(),
            rolls_dir: rolls_dir.into(),
        }
    }

    /// Register a user: write the reference image and the roll number.
    ///
    /// Overwrites any previous registration under the same name; no
    /// uniqueness check is performed.
    pub fn register(
        &self,
        name: &str,
        roll_number: &str,
        face: &image::RgbImage,
    ) -> Result<(), StoreError> {
        fs::create_dir_all(&self.images_dir)?;
        fs::create_dir_all(&self.rolls_dir)?;

        let image_path = self.image_path(name);
        face.save(&image_path)?;
        fs::write(self.roll_path(name), roll_number)?;

        tracing::info!(name, roll_number, path = %image_path.display(), "registered user");
        Ok(())
    }

    /// The user's roll number, trimmed. A name that was never registered
    /// (or lost its roll file) yields [`ROLL_NUMBER_MISSING`], never an
    /// error.
    pub fn roll_number(&self, name: &str) -> String {
        match fs::read_to_string(self.roll_path(name)) {
            Ok(contents) => contents.trim().to_string(),
            Err(_) => ROLL_NUMBER_MISSING.to_string(),
        }
    }

    /// Sorted names of all registered users, from the `.jpg` stems in
    /// the images directory. A missing directory is an empty roster.
    pub fn registered_names(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.images_dir) else {
            return Vec::new();
        };

        let mut names: Vec<String> = entries
            .flatten()
            .filter_map(|entry| {
                let path = entry.path();
                let is_jpg = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("jpg"));
                if !is_jpg {
                    return None;
                }
                path.file_stem()
                    .and_then(|s| s.to_str())
                    .map(|s| s.to_string())
            })
            .collect();

        names.sort();
        names
    }

    /// Path of the user's reference image (whether or not it exists).
    pub fn image_path(&self, name: &str) -> PathBuf {
        self.images_dir.join(format!("{name}.jpg"))
    }

    fn roll_path(&self, name: &str) -> PathBuf {
        self.rolls_dir.join(format!("{name}.txt"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, IdentityStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = IdentityStore::new(dir.path().join("images"), dir.path().join("rolls"));
        (dir, store)
    }

    fn face() -> image::RgbImage {
        image::RgbImage::from_pixel(8, 8, image::Rgb([90, 90, 90]))
    }

    #[test]
    fn test_register_writes_image_and_roll() {
        let (_dir, store) = store();
        store.register("Alice", "101", &face()).unwrap();

        assert!(store.image_path("Alice").exists());
        assert_eq!(store.roll_number("Alice"), "101");
    }

    #[test]
    fn test_reregistration_overwrites() {
        let (_dir, store) = store();
        store.register("Alice", "101", &face()).unwrap();
        store.register("Alice", "202", &face()).unwrap();

        assert_eq!(store.roll_number("Alice"), "202");
        assert_eq!(store.registered_names(), vec!["Alice".to_string()]);
    }

    #[test]
    fn test_roll_number_unregistered_is_sentinel() {
        let (_dir, store) = store();
        assert_eq!(store.roll_number("Nobody"), ROLL_NUMBER_MISSING);
    }

    #[test]
    fn test_roll_number_is_trimmed() {
        let (_dir, store) = store();
        store.register("Bob", "  42  \n", &face()).unwrap();
        assert_eq!(store.roll_number("Bob"), "42");
    }

    #[test]
    fn test_registered_names_sorted() {
        let (_dir, store) = store();
        store.register("Carol", "3", &face()).unwrap();
        store.register("Alice", "1", &face()).unwrap();
        store.register("Bob", "2", &face()).unwrap();

        assert_eq!(
            store.registered_names(),
            vec!["Alice".to_string(), "Bob".to_string(), "Carol".to_string()]
        );
    }

    #[test]
    fn test_registered_names_missing_dir_is_empty() {
        let (_dir, store) = store();
        assert!(store.registered_names().is_empty());
    }

    #[test]
    fn test_registered_names_ignores_non_jpg() {
        let (_dir, store) = store();
        store.register("Alice", "1", &face()).unwrap();
        std::fs::write(store.image_path("x").with_extension("png"), b"junk").unwrap();

        assert_eq!(store.registered_names(), vec!["Alice".to_string()]);
    }
}
