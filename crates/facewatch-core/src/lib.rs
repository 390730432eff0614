//! facewatch-core — Face descriptor and matching engine.
//!
//! Turns an ordered set of facial landmarks into a geometric descriptor
//! (consecutive landmark distances) and matches descriptors against an
//! enrolled gallery by thresholded nearest-neighbor search.

pub mod alert;
pub mod descriptor;
pub mod detector;
pub mod landmarks;
mod letterbox;
pub mod matcher;
pub mod types;

pub use alert::{AlertPolicy, FlaggedPersonPolicy, Notification};
pub use descriptor::{Descriptor, DescriptorError};
pub use detector::{FaceBox, FaceDetector};
pub use landmarks::{LandmarkError, LandmarkProvider, OnnxLandmarkProvider};
pub use matcher::{EuclideanMatcher, Matcher, DEFAULT_MATCH_THRESHOLD};
pub use types::{EnrollmentRecord, Identity, LandmarkPoint, MatchReport, MatchResult, PointSequence};

use std::path::PathBuf;

/// Default directory for model files: `$XDG_DATA_HOME/facewatch/models`.
pub fn default_model_dir() -> PathBuf {
    default_data_dir().join("models")
}

/// Default data directory: `$XDG_DATA_HOME/facewatch`, falling back to
/// `~/.local/share/facewatch`.
pub fn default_data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("facewatch")
}
