//! FaceNet embedding extractor via ONNX Runtime.
//!
//! Turns an already-cropped face region into a 128-dimensional,
//! L2-normalized embedding for gallery search.

use crate::types::Embedding;
use image::imageops::FilterType;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const EMBED_INPUT_SIZE: u32 = 160;
const EMBED_MEAN: f32 = 127.5;
const EMBED_STD: f32 = 128.0;
const EMBED_DIM: usize = 128;

#[derive(Error, Debug)]
pub enum EmbedderError {
    #[error("embedding model not found: {0} — place facenet128.onnx in the model directory")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// FaceNet-based embedding extractor.
#[derive(Debug)]
pub struct FaceEmbedder {
    session: Session,
}

impl FaceEmbedder {
    /// Load the FaceNet ONNX model from the given path.
    pub fn load(model_path: &str) -> Result<Self, EmbedderError> {
        if !Path::new(model_path).exists() {
            return Err(EmbedderError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = model_path,
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded embedding model"
        );

        Ok(Self { session })
    }

    /// Extract an embedding from a cropped face image.
    ///
    /// The crop is resized to the model input size; no detection or
    /// alignment is performed here.
    pub fn embed(&mut self, face: &image::RgbImage) -> Result<Embedding, EmbedderError> {
        let input = Self::preprocess(face);

        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| EmbedderError::InferenceFailed(format!("embedding extraction: {e}")))?;

        if raw.len() != EMBED_DIM {
            return Err(EmbedderError::InferenceFailed(format!(
                "expected {EMBED_DIM}-dim embedding, got {}",
                raw.len()
            )));
        }

        // L2-normalize so cosine distance is well-behaved downstream.
        let norm: f32 = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
        let values = if norm > 0.0 {
            raw.iter().map(|x| x / norm).collect()
        } else {
            raw.to_vec()
        };

        Ok(Embedding { values })
    }

    /// Resize an RGB crop to the model input and pack it as a normalized
    /// NCHW float tensor.
    fn preprocess(face: &image::RgbImage) -> Array4<f32> {
        let size = EMBED_INPUT_SIZE as usize;
        let resized = image::imageops::resize(face, EMBED_INPUT_SIZE, EMBED_INPUT_SIZE, FilterType::Triangle);

        let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
        for (x, y, pixel) in resized.enumerate_pixels() {
            for channel in 0..3 {
                tensor[[0, channel, y as usize, x as usize]] =
                    (pixel[channel] as f32 - EMBED_MEAN) / EMBED_STD;
            }
        }

        tensor
    }
}
