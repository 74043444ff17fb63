//! Face region locator backed by the SeetaFace funnel cascade.
//!
//! The classical (non-learned-embedding) stage of the pipeline: given a
//! frame, return candidate face rectangles. Everything downstream — who
//! the face belongs to, what it expresses — is the recognition and
//! analysis models' business.

use crate::types::FaceRegion;
use std::path::Path;
use thiserror::Error;

// --- Cascade tuning (counterpart of Haar scale-factor 1.1 / min-neighbors 5) ---
const MIN_FACE_SIZE: u32 = 40;
const SCORE_THRESHOLD: f64 = 2.0;
const PYRAMID_SCALE_FACTOR: f32 = 0.8;
const SLIDE_WINDOW_STEP: u32 = 4;

#[derive(Error, Debug)]
pub enum LocatorError {
    #[error("cascade model not found: {0} — place seeta_fd_frontal_v1.0.bin in the model directory")]
    ModelNotFound(String),
    #[error("cascade model unreadable: {0}")]
    ModelLoad(String),
}

/// Cascade-based face locator.
///
/// Holds only the parsed cascade model; a throwaway detector instance is
/// built per call, so [`detect`](Self::detect) is side-effect-free and
/// takes `&self`.
pub struct FaceLocator {
    model: rustface::Model,
}

// `rustface::Model` is not `Debug`, so derive won't work; the locator's
// Debug output omits the opaque cascade model.
impl std::fmt::Debug for FaceLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaceLocator").finish_non_exhaustive()
    }
}

impl FaceLocator {
    /// Load the SeetaFace cascade model from the given path.
    pub fn load(model_path: &str) -> Result<Self, LocatorError> {
        if !Path::new(model_path).exists() {
            return Err(LocatorError::ModelNotFound(model_path.to_string()));
        }

        let file = std::fs::File::open(model_path)
            .map_err(|e| LocatorError::ModelLoad(format!("{model_path}: {e}")))?;
        let model = rustface::read_model(std::io::BufReader::new(file))
            .map_err(|e| LocatorError::ModelLoad(format!("{model_path}: {e}")))?;

        tracing::info!(path = model_path, "loaded cascade model");

        Ok(Self { model })
    }

    /// Locate faces in a frame, returning regions sorted by confidence.
    ///
    /// Converts the frame to single-channel intensity and runs the
    /// cascade. Zero detections is an empty vector, never an error.
    /// Returned regions are clamped to the frame bounds.
    pub fn detect(&self, frame: &image::RgbImage) -> Vec<FaceRegion> {
        let gray = image::imageops::grayscale(frame);
        let (width, height) = gray.dimensions();

        let mut detector = rustface::create_detector_with_model(self.model.clone());
        detector.set_min_face_size(MIN_FACE_SIZE);
        detector.set_score_thresh(SCORE_THRESHOLD);
        detector.set_pyramid_scale_factor(PYRAMID_SCALE_FACTOR);
        detector.set_slide_window_step(SLIDE_WINDOW_STEP, SLIDE_WINDOW_STEP);

        let faces = detector.detect(&rustface::ImageData::new(gray.as_raw(), width, height));

        let mut regions: Vec<FaceRegion> = faces
            .iter()
            .filter_map(|face| {
                let bbox = face.bbox();
                clamp_region(
                    bbox.x(),
                    bbox.y(),
                    bbox.width(),
                    bbox.height(),
                    face.score() as f32,
                    width,
                    height,
                )
            })
            .collect();

        regions.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        regions
    }
}

/// Clamp a raw cascade rectangle to the frame. Rectangles that fall
/// entirely outside the frame (the cascade may report negative origins
/// near edges) are dropped.
fn clamp_region(
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    confidence: f32,
    frame_width: u32,
    frame_height: u32,
) -> Option<FaceRegion> {
    let x_start = x.clamp(0, frame_width as i32);
    let y_start = y.clamp(0, frame_height as i32);
    let x_end = (x + width as i32).clamp(0, frame_width as i32);
    let y_end = (y + height as i32).clamp(0, frame_height as i32);

    let width = (x_end - x_start) as u32;
    let height = (y_end - y_start) as u32;
    if width == 0 || height == 0 {
        return None;
    }

    Some(FaceRegion {
        x: x_start as u32,
        y: y_start as u32,
        width,
        height,
        confidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_region_inside() {
        let r = clamp_region(10, 20, 30, 40, 5.0, 640, 480).unwrap();
        assert_eq!((r.x, r.y, r.width, r.height), (10, 20, 30, 40));
    }

    #[test]
    fn test_clamp_region_negative_origin() {
        let r = clamp_region(-5, -10, 30, 40, 5.0, 640, 480).unwrap();
        assert_eq!((r.x, r.y), (0, 0));
        assert_eq!((r.width, r.height), (25, 30));
    }

    #[test]
    fn test_clamp_region_overflows_frame() {
        let r = clamp_region(620, 470, 30, 40, 5.0, 640, 480).unwrap();
        assert_eq!((r.width, r.height), (20, 10));
    }

    #[test]
    fn test_clamp_region_outside_frame() {
        assert!(clamp_region(700, 500, 30, 40, 5.0, 640, 480).is_none());
        assert!(clamp_region(-50, 0, 30, 40, 5.0, 640, 480).is_none());
    }

    #[test]
    fn test_load_missing_model() {
        let err = FaceLocator::load("/nonexistent/cascade.bin").unwrap_err();
        assert!(matches!(err, LocatorError::ModelNotFound(_)));
    }

    #[test]
    fn test_load_unreadable_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bogus.bin");
        std::fs::write(&path, b"not a cascade").unwrap();
        let err = FaceLocator::load(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, LocatorError::ModelLoad(_)));
    }
}
