//! Age / gender / emotion estimation via pretrained ONNX models.
//!
//! Two sessions: a combined gender+age head and an 8-class FER+ emotion
//! classifier. Both operate on an already-cropped face region — there is
//! no detection enforcement here. Every public operation fails soft: a
//! model failure is logged at debug level and absorbed into `None`.

use crate::types::Gender;
use image::imageops::FilterType;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

// --- Gender+age head (outputs: [woman_prob, man_prob, age/100]) ---
const GENDERAGE_INPUT_SIZE: u32 = 96;
const GENDERAGE_OUTPUTS: usize = 3;
const AGE_SCALE: f32 = 100.0;
const AGE_MAX: f32 = 120.0;

// --- FER+ emotion classifier (64x64 single-channel input) ---
const EMOTION_INPUT_SIZE: u32 = 64;
const EMOTION_LABELS: [&str; 8] = [
    "neutral",
    "happiness",
    "surprise",
    "sadness",
    "anger",
    "disgust",
    "fear",
    "contempt",
];

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("analysis model not found: {0}")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Fixed capability surface for face attribute estimation.
///
/// The set of operations is static — callers never probe for support at
/// run time. Each `estimate_*` returns `None` on any failure.
pub struct AnalysisService {
    genderage: Session,
    emotion: Session,
}

impl AnalysisService {
    /// Load both attribute models.
    pub fn load(genderage_path: &str, emotion_path: &str) -> Result<Self, AnalysisError> {
        let genderage = load_session(genderage_path)?;
        let emotion = load_session(emotion_path)?;
        Ok(Self { genderage, emotion })
    }

    /// Estimated integer age for a cropped face, or `None` on failure.
    pub fn estimate_age(&mut self, face: &image::RgbImage) -> Option<u32> {
        match self.run_genderage(face) {
            Ok((_, age)) => Some(age),
            Err(err) => {
                tracing::debug!(error = %err, "age estimation failed");
                None
            }
        }
    }

    /// Estimated gender for a face image, or `None` on failure.
    pub fn estimate_gender(&mut self, face: &image::RgbImage) -> Option<Gender> {
        match self.run_genderage(face) {
            Ok((gender, _)) => Some(gender),
            Err(err) => {
                tracing::debug!(error = %err, "gender estimation failed");
                None
            }
        }
    }

    /// Dominant emotion label for a cropped face, or `None` on failure.
    pub fn estimate_emotion(&mut self, face: &image::RgbImage) -> Option<&'static str> {
        match self.run_emotion(face) {
            Ok(label) => Some(label),
            Err(err) => {
                tracing::debug!(error = %err, "emotion estimation failed");
                None
            }
        }
    }

    fn run_genderage(&mut self, face: &image::RgbImage) -> Result<(Gender, u32), AnalysisError> {
        let input = preprocess_rgb(face, GENDERAGE_INPUT_SIZE);

        let outputs = self
            .genderage
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| AnalysisError::InferenceFailed(format!("gender+age head: {e}")))?;

        if raw.len() < GENDERAGE_OUTPUTS {
            return Err(AnalysisError::InferenceFailed(format!(
                "gender+age head returned {} values, need {GENDERAGE_OUTPUTS}",
                raw.len()
            )));
        }

        let gender = if raw[1] > raw[0] { Gender::Man } else { Gender::Woman };
        let age = (raw[2] * AGE_SCALE).round().clamp(0.0, AGE_MAX) as u32;

        Ok((gender, age))
    }

    fn run_emotion(&mut self, face: &image::RgbImage) -> Result<&'static str, AnalysisError> {
        let input = preprocess_gray(face, EMOTION_INPUT_SIZE);

        let outputs = self
            .emotion
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| AnalysisError::InferenceFailed(format!("emotion classifier: {e}")))?;

        if raw.len() < EMOTION_LABELS.len() {
            return Err(AnalysisError::InferenceFailed(format!(
                "emotion classifier returned {} scores, need {}",
                raw.len(),
                EMOTION_LABELS.len()
            )));
        }

        let dominant = argmax(&raw[..EMOTION_LABELS.len()])
            .ok_or_else(|| AnalysisError::InferenceFailed("empty emotion scores".into()))?;
        Ok(EMOTION_LABELS[dominant])
    }
}

fn load_session(model_path: &str) -> Result<Session, AnalysisError> {
    if !Path::new(model_path).exists() {
        return Err(AnalysisError::ModelNotFound(model_path.to_string()));
    }

    let session = Session::builder()?
        .with_intra_threads(2)?
        .commit_from_file(model_path)?;

    tracing::info!(
        path = model_path,
        outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
        "loaded analysis model"
    );

    Ok(session)
}

/// Resize an RGB crop and pack it as a raw-valued NCHW tensor.
fn preprocess_rgb(face: &image::RgbImage, input_size: u32) -> Array4<f32> {
    let size = input_size as usize;
    let resized = image::imageops::resize(face, input_size, input_size, FilterType::Triangle);

    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for channel in 0..3 {
            tensor[[0, channel, y as usize, x as usize]] = pixel[channel] as f32;
        }
    }
    tensor
}

/// Resize a crop to single-channel intensity, packed as (1, 1, S, S).
fn preprocess_gray(face: &image::RgbImage, input_size: u32) -> Array4<f32> {
    let size = input_size as usize;
    let gray = image::imageops::grayscale(face);
    let resized = image::imageops::resize(&gray, input_size, input_size, FilterType::Triangle);

    let mut tensor = Array4::<f32>::zeros((1, 1, size, size));
    for (x, y, pixel) in resized.enumerate_pixels() {
        tensor[[0, 0, y as usize, x as usize]] = pixel[0] as f32;
    }
    tensor
}

/// Index of the largest score, ignoring NaNs.
fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((i, score)),
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax_basic() {
        assert_eq!(argmax(&[0.1, 0.9, 0.3]), Some(1));
        assert_eq!(argmax(&[2.0]), Some(0));
    }

    #[test]
    fn test_argmax_empty() {
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_argmax_skips_nan() {
        assert_eq!(argmax(&[f32::NAN, 0.5, 0.2]), Some(1));
        assert_eq!(argmax(&[f32::NAN]), None);
    }

    #[test]
    fn test_argmax_first_wins_on_tie() {
        assert_eq!(argmax(&[0.5, 0.5]), Some(0));
    }

    #[test]
    fn test_preprocess_rgb_shape_and_values() {
        let face = image::RgbImage::from_pixel(30, 50, image::Rgb([10, 20, 30]));
        let tensor = preprocess_rgb(&face, GENDERAGE_INPUT_SIZE);
        assert_eq!(tensor.shape(), &[1, 3, 96, 96]);
        // Raw pixel values, no normalization.
        assert!((tensor[[0, 0, 48, 48]] - 10.0).abs() < 1.0);
        assert!((tensor[[0, 2, 48, 48]] - 30.0).abs() < 1.0);
    }

    #[test]
    fn test_preprocess_gray_shape() {
        let face = image::RgbImage::from_pixel(128, 128, image::Rgb([128, 128, 128]));
        let tensor = preprocess_gray(&face, EMOTION_INPUT_SIZE);
        assert_eq!(tensor.shape(), &[1, 1, 64, 64]);
        assert!((tensor[[0, 0, 32, 32]] - 128.0).abs() < 1.0);
    }

    #[test]
    fn test_emotion_labels_cover_ferplus_classes() {
        assert_eq!(EMOTION_LABELS.len(), 8);
        assert_eq!(EMOTION_LABELS[argmax(&[0.0, 9.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]).unwrap()], "happiness");
    }

    #[test]
    fn test_load_missing_model() {
        let err = load_session("/nonexistent/genderage.onnx").unwrap_err();
        assert!(matches!(err, AnalysisError::ModelNotFound(_)));
    }
}
