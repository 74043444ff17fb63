//! Gallery search: match a probe face against the stored reference images.
//!
//! The reference gallery is the images directory itself — one `.jpg` per
//! registered user, the file stem being the user's name. References are
//! embedded lazily and cached against the file's modification time, so
//! re-registering a user invalidates only that user's cached embedding.

use crate::embedder::{EmbedderError, FaceEmbedder};
use crate::types::{Embedding, Identity, RankedMatch};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecognitionError {
    #[error("embedder: {0}")]
    Embedder(#[from] EmbedderError),
    #[error("reference image unreadable: {0}")]
    ReferenceImage(#[from] image::ImageError),
    #[error("gallery scan failed: {0}")]
    GalleryScan(#[from] std::io::Error),
}

struct CachedReference {
    modified: SystemTime,
    embedding: Embedding,
}

/// Nearest-reference search with a distance threshold.
pub struct RecognitionService {
    embedder: FaceEmbedder,
    images_dir: PathBuf,
    threshold: f32,
    cache: HashMap<PathBuf, CachedReference>,
}

impl RecognitionService {
    pub fn new(embedder: FaceEmbedder, images_dir: impl Into<PathBuf>, threshold: f32) -> Self {
        Self {
            embedder,
            images_dir: images_dir.into(),
            threshold,
            cache: HashMap::new(),
        }
    }

    /// Identify a cropped face.
    ///
    /// Fails soft: any failure — no gallery yet, unreadable reference,
    /// inference error — degrades to [`Identity::Unknown`] and is logged
    /// at debug level. Never returns an error.
    pub fn identify(&mut self, face: &image::RgbImage) -> Identity {
        match self.ranked(face) {
            Ok(ranked) => resolve(&ranked, self.threshold),
            Err(err) => {
                tracing::debug!(error = %err, "recognition failed, treating face as unknown");
                Identity::Unknown
            }
        }
    }

    /// Embed the probe and rank every gallery reference by cosine
    /// distance, ascending.
    pub fn ranked(&mut self, face: &image::RgbImage) -> Result<Vec<RankedMatch>, RecognitionError> {
        let probe = self.embedder.embed(face)?;

        let mut matches = Vec::new();
        for entry in std::fs::read_dir(&self.images_dir)? {
            let path = entry?.path();
            let is_jpg = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("jpg"));
            if !is_jpg {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let reference = self.reference_embedding(&path)?;
            matches.push(RankedMatch {
                name: name.to_string(),
                distance: probe.cosine_distance(&reference),
                path,
            });
        }

        matches.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(matches)
    }

    /// Embedding for one reference image, served from the mtime-keyed
    /// cache when the file has not changed since it was last embedded.
    fn reference_embedding(&mut self, path: &Path) -> Result<Embedding, RecognitionError> {
        let modified = std::fs::metadata(path)?.modified()?;

        if let Some(cached) = self.cache.get(path) {
            if cached.modified == modified {
                return Ok(cached.embedding.clone());
            }
        }

        let reference = image::open(path)?.to_rgb8();
        let embedding = self.embedder.embed(&reference)?;
        tracing::debug!(path = %path.display(), "embedded gallery reference");

        self.cache.insert(
            path.to_path_buf(),
            CachedReference { modified, embedding: embedding.clone() },
        );
        Ok(embedding)
    }
}

/// Threshold decision over a ranked candidate list.
///
/// The single closest match is accepted only when its distance is
/// STRICTLY below the threshold; a distance exactly at the threshold is
/// a non-match.
pub fn resolve(ranked: &[RankedMatch], threshold: f32) -> Identity {
    match ranked.first() {
        Some(best) if best.distance < threshold => Identity::Known(best.name.clone()),
        _ => Identity::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, distance: f32) -> RankedMatch {
        RankedMatch {
            name: name.to_string(),
            path: PathBuf::from(format!("{name}.jpg")),
            distance,
        }
    }

    #[test]
    fn test_resolve_below_threshold_matches() {
        let ranked = vec![candidate("Alice", 0.59), candidate("Bob", 0.8)];
        assert_eq!(resolve(&ranked, 0.6), Identity::Known("Alice".into()));
    }

    #[test]
    fn test_resolve_exact_threshold_is_unknown() {
        // Boundary is exclusive on the match side.
        let ranked = vec![candidate("Alice", 0.6)];
        assert_eq!(resolve(&ranked, 0.6), Identity::Unknown);
    }

    #[test]
    fn test_resolve_above_threshold_is_unknown() {
        let ranked = vec![candidate("Alice", 0.61)];
        assert_eq!(resolve(&ranked, 0.6), Identity::Unknown);
    }

    #[test]
    fn test_resolve_empty_gallery_is_unknown() {
        assert_eq!(resolve(&[], 0.6), Identity::Unknown);
    }

    #[test]
    fn test_resolve_examines_only_the_head() {
        // resolve trusts the ranking: only the first candidate decides.
        let ranked = vec![candidate("Alice", 0.7), candidate("Bob", 0.2)];
        assert_eq!(resolve(&ranked, 0.6), Identity::Unknown);
    }
}
