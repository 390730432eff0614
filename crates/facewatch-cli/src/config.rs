use facewatch_core::detector::DETECTOR_MODEL_FILE;
use facewatch_core::landmarks::LANDMARK_MODEL_FILE;
use facewatch_core::DEFAULT_MATCH_THRESHOLD;
use std::path::PathBuf;

/// CLI configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    /// Directory containing ONNX model files.
    pub model_dir: PathBuf,
    /// Directory where enrolled and queried images are retained.
    pub upload_dir: PathBuf,
    /// Euclidean distance ceiling for a positive match.
    pub match_threshold: f64,
    /// Minimum SCRFD confidence for a detected face.
    pub face_score_threshold: f32,
}

impl Config {
    /// Load configuration from `FACEWATCH_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let data_dir = facewatch_core::default_data_dir();

        Self {
            db_path: env_path("FACEWATCH_DB_PATH").unwrap_or_else(|| data_dir.join("records.db")),
            model_dir: env_path("FACEWATCH_MODEL_DIR")
                .unwrap_or_else(facewatch_core::default_model_dir),
            upload_dir: env_path("FACEWATCH_UPLOAD_DIR").unwrap_or_else(|| data_dir.join("uploads")),
            match_threshold: env_parse("FACEWATCH_MATCH_THRESHOLD", DEFAULT_MATCH_THRESHOLD),
            face_score_threshold: env_parse("FACEWATCH_FACE_SCORE_THRESHOLD", 0.5),
        }
    }

    /// Path to the SCRFD face detector model.
    pub fn detector_model_path(&self) -> String {
        self.model_path(DETECTOR_MODEL_FILE)
    }

    /// Path to the 68-point landmark model.
    pub fn landmark_model_path(&self) -> String {
        self.model_path(LANDMARK_MODEL_FILE)
    }

    fn model_path(&self, file: &str) -> String {
        self.model_dir.join(file).to_string_lossy().into_owned()
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key).ok().map(PathBuf::from)
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    parse_or(std::env::var(key).ok().as_deref(), default)
}

fn parse_or<T: std::str::FromStr>(raw: Option<&str>, default: T) -> T {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}
