//! Facial landmark localization.
//!
//! [`LandmarkProvider`] is the seam between the matching engine and whatever
//! model finds faces. [`OnnxLandmarkProvider`] is a two-stage pipeline: an
//! SCRFD [`FaceDetector`] picks the most confident face, then a 68-point
//! landmark regressor runs on a crop around it.
//!
//! Landmark model contract (`landmarks_68.onnx`):
//! - input `[1, 3, 112, 112]` float, `(p - 127.5) / 128`, grayscale
//!   replicated to three channels, the face crop letterboxed
//! - output 0: 136 floats, the 68 `(x, y)` pairs normalized to the input square

use crate::detector::{FaceBox, FaceDetector};
use crate::letterbox::{letterbox_tensor, Letterbox};
use crate::types::{LandmarkPoint, PointSequence};
use image::GrayImage;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const LANDMARK_INPUT_SIZE: usize = 112;
const LANDMARK_MEAN: f32 = 127.5;
const LANDMARK_STD: f32 = 128.0;
/// Fraction of the box size added on every side before cropping.
const CROP_MARGIN: f32 = 0.1;

/// Points per face produced by the bundled model.
pub const LANDMARK_COUNT: usize = 68;
/// File name of the landmark model inside the model directory.
pub const LANDMARK_MODEL_FILE: &str = "landmarks_68.onnx";

#[derive(Error, Debug)]
pub enum LandmarkError {
    #[error("model file not found: {0} — place the detector and landmark models in the model directory")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Locates the landmarks of the primary face in an image.
pub trait LandmarkProvider {
    /// Returns the ordered landmarks of the first detected face, or an empty
    /// sequence when there is no face.
    fn detect_primary_face(&mut self, image: &GrayImage) -> Result<PointSequence, LandmarkError>;
}

/// Pixel rectangle cut out of the source image for landmark regression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CropRegion {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

impl CropRegion {
    /// Expand `face` by [`CROP_MARGIN`] and clamp it to the image bounds.
    /// `None` when nothing of the box lies inside the image.
    fn around(face: &FaceBox, image_width: u32, image_height: u32) -> Option<Self> {
        let margin_x = face.width * CROP_MARGIN;
        let margin_y = face.height * CROP_MARGIN;

        let x1 = (face.x - margin_x).floor().clamp(0.0, image_width as f32);
        let y1 = (face.y - margin_y).floor().clamp(0.0, image_height as f32);
        let x2 = (face.x + face.width + margin_x).ceil().clamp(0.0, image_width as f32);
        let y2 = (face.y + face.height + margin_y).ceil().clamp(0.0, image_height as f32);

        let (width, height) = ((x2 - x1) as u32, (y2 - y1) as u32);
        if width == 0 || height == 0 {
            return None;
        }

        Some(Self {
            x: x1 as u32,
            y: y1 as u32,
            width,
            height,
        })
    }
}

/// SCRFD detection followed by 68-point landmark regression.
pub struct OnnxLandmarkProvider {
    detector: FaceDetector,
    session: Session,
}

impl OnnxLandmarkProvider {
    /// Load both models. `detection_threshold` is the minimum SCRFD
    /// confidence for a face to count.
    pub fn load(
        detector_path: &str,
        landmark_path: &str,
        detection_threshold: f32,
    ) -> Result<Self, LandmarkError> {
        if !Path::new(landmark_path).exists() {
            return Err(LandmarkError::ModelNotFound(landmark_path.to_string()));
        }
        let detector = FaceDetector::load(detector_path, detection_threshold)?;

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(landmark_path)?;

        tracing::info!(
            path = landmark_path,
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded landmark model"
        );

        Ok(Self { detector, session })
    }
}

impl LandmarkProvider for OnnxLandmarkProvider {
    fn detect_primary_face(&mut self, image: &GrayImage) -> Result<PointSequence, LandmarkError> {
        if image.width() == 0 || image.height() == 0 {
            return Ok(PointSequence::empty());
        }

        let faces = self.detector.detect(image)?;
        let Some(face) = faces.first() else {
            tracing::debug!("no face detected");
            return Ok(PointSequence::empty());
        };
        let Some(region) = CropRegion::around(face, image.width(), image.height()) else {
            tracing::debug!(?face, "detected face lies outside the image");
            return Ok(PointSequence::empty());
        };
        tracing::debug!(faces = faces.len(), confidence = face.confidence, ?region, "primary face");

        let crop = image::imageops::crop_imm(image, region.x, region.y, region.width, region.height).to_image();
        let (input, letterbox) = letterbox_tensor(&crop, LANDMARK_INPUT_SIZE, LANDMARK_MEAN, LANDMARK_STD);

        let outputs = self.session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;
        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| LandmarkError::InferenceFailed(format!("landmarks: {e}")))?;

        decode_landmarks(raw, &letterbox, &region)
    }
}

/// Turn the flat model output into source-image landmarks: undo the
/// letterbox, then shift by the crop origin.
fn decode_landmarks(
    raw: &[f32],
    letterbox: &Letterbox,
    region: &CropRegion,
) -> Result<PointSequence, LandmarkError> {
    if raw.len() != LANDMARK_COUNT * 2 {
        return Err(LandmarkError::InferenceFailed(format!(
            "expected {} landmark values, got {}",
            LANDMARK_COUNT * 2,
            raw.len()
        )));
    }

    let size = LANDMARK_INPUT_SIZE as f32;
    Ok(raw
        .chunks_exact(2)
        .map(|xy| {
            let (x, y) = letterbox.unmap(xy[0] * size, xy[1] * size);
            LandmarkPoint::new(
                f64::from(x) + f64::from(region.x),
                f64::from(y) + f64::from(region.y),
            )
        })
        .collect())
}
