use std::path::PathBuf;

/// Application configuration, loaded once from `ROLLCALL_*` environment
/// variables and passed by reference to each component. Immutable after
/// startup.
pub struct Config {
    /// V4L2 device path (default: /dev/video0).
    pub camera_device: String,
    /// Directory containing the cascade and ONNX model files.
    pub model_dir: PathBuf,
    /// Directory of per-user reference images (`<name>.jpg`).
    pub images_dir: PathBuf,
    /// Directory of per-user roll-number files (`<name>.txt`).
    pub rolls_dir: PathBuf,
    /// Directory of per-user age records (`<name>.json`).
    pub ages_dir: PathBuf,
    /// Path of the attendance CSV ledger.
    pub attendance_path: PathBuf,
    /// Cosine distance below which a gallery match is accepted
    /// (exclusive: a distance equal to this is a non-match).
    pub match_threshold: f32,
}

impl Config {
    /// Load configuration from `ROLLCALL_*` environment variables with
    /// defaults.
    pub fn from_env() -> Self {
        let data_dir = std::env::var("ROLLCALL_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_data_dir());

        let model_dir = std::env::var("ROLLCALL_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("models"));

        Self {
            camera_device: std::env::var("ROLLCALL_CAMERA_DEVICE")
                .unwrap_or_else(|_| "/dev/video0".to_string()),
            images_dir: data_dir.join("images"),
            rolls_dir: data_dir.join("roll_numbers"),
            ages_dir: data_dir.join("ages"),
            attendance_path: data_dir.join("attendance.csv"),
            model_dir,
            match_threshold: env_f32("ROLLCALL_MATCH_THRESHOLD", 0.6),
        }
    }

    /// Path to the SeetaFace cascade model.
    pub fn cascade_model_path(&self) -> String {
        self.model_dir
            .join("seeta_fd_frontal_v1.0.bin")
            .to_string_lossy()
            .into_owned()
    }

    /// Path to the FaceNet embedding model.
    pub fn embedding_model_path(&self) -> String {
        self.model_dir
            .join("facenet128.onnx")
            .to_string_lossy()
            .into_owned()
    }

    /// Path to the combined gender+age model.
    pub fn genderage_model_path(&self) -> String {
        self.model_dir
            .join("genderage.onnx")
            .to_string_lossy()
            .into_owned()
    }

    /// Path to the FER+ emotion model.
    pub fn emotion_model_path(&self) -> String {
        self.model_dir
            .join("emotion_ferplus.onnx")
            .to_string_lossy()
            .into_owned()
    }
}

fn default_data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("rollcall")
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
