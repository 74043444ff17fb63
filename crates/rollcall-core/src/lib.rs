//! rollcall-core — Face location, recognition, and attribute analysis.
//!
//! Wraps a SeetaFace funnel cascade for face region location and
//! pretrained ONNX models (via ONNX Runtime) for embedding extraction
//! and age / gender / emotion estimation.

pub mod analysis;
pub mod embedder;
pub mod locator;
pub mod recognition;
pub mod types;

pub use analysis::AnalysisService;
pub use embedder::FaceEmbedder;
pub use locator::FaceLocator;
pub use recognition::RecognitionService;
pub use types::{Embedding, FaceRegion, Gender, Identity, RankedMatch};
