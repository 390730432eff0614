use facewatch_core::{
    AlertPolicy, Descriptor, DescriptorError, EnrollmentRecord, EuclideanMatcher, FlaggedPersonPolicy,
    Identity, LandmarkError, LandmarkProvider, MatchReport, MatchResult, Matcher, Notification,
};
use facewatch_store::{decode_candidates, RecordStore, StoreError};
use image::GrayImage;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("no face detected")]
    NoFaceDetected,
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("landmark error: {0}")]
    Landmark(#[from] LandmarkError),
    #[error("descriptor error: {0}")]
    Descriptor(#[from] DescriptorError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("retaining upload {path}: {source}")]
    Upload {
        path: String,
        source: std::io::Error,
    },
}

/// Result of a recognition request.
pub struct Recognition {
    pub result: MatchResult,
    pub notification: Option<Notification>,
}

impl Recognition {
    pub fn report(&self) -> MatchReport {
        MatchReport::new(&self.result, self.notification.as_ref())
    }
}

/// Runs enrollment and recognition requests, one at a time, against a
/// landmark provider and a record store.
pub struct Engine<P> {
    provider: P,
    threshold: f64,
    upload_dir: Option<PathBuf>,
}

impl<P: LandmarkProvider> Engine<P> {
    pub fn new(provider: P, threshold: f64) -> Self {
        Self {
            provider,
            threshold,
            upload_dir: None,
        }
    }

    /// Copy every accepted image into `dir` under a random name.
    pub fn with_upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.upload_dir = Some(dir.into());
        self
    }

    /// Landmarks → descriptor for the primary face in `image`.
    pub fn describe(&mut self, image: &GrayImage) -> Result<Descriptor, EngineError> {
        let points = self.provider.detect_primary_face(image)?;
        if points.is_empty() {
            return Err(EngineError::NoFaceDetected);
        }
        tracing::debug!(landmarks = points.len(), "face landmarks located");
        Ok(Descriptor::build(&points)?)
    }

    /// Describe an image file.
    pub fn describe_file(&mut self, path: &Path) -> Result<Descriptor, EngineError> {
        let image = load_gray(path)?;
        self.describe(&image)
    }

    /// Enroll a person from a photograph.
    pub fn enroll(
        &mut self,
        store: &RecordStore,
        identity: &Identity,
        image_path: &Path,
    ) -> Result<EnrollmentRecord, EngineError> {
        let descriptor = self.describe_file(image_path)?;
        let retained = self.retain(image_path)?;

        let record = match store.insert(identity, &retained.to_string_lossy(), &descriptor) {
            Ok(record) => record,
            Err(e) => {
                self.discard(&retained);
                return Err(e.into());
            }
        };
        tracing::info!(
            id = record.id,
            code = %record.identity.code,
            descriptor_len = descriptor.len(),
            "enrolled"
        );
        Ok(record)
    }

    /// Identify the person in a photograph against every enrolled record.
    pub fn recognize(
        &mut self,
        store: &RecordStore,
        image_path: &Path,
    ) -> Result<Recognition, EngineError> {
        let query = self.describe_file(image_path)?;
        if self.upload_dir.is_some() {
            self.retain(image_path)?;
        }

        let candidates = decode_candidates(store.scan()?);
        let result = EuclideanMatcher.compare(&query, &candidates, self.threshold);
        let notification = FlaggedPersonPolicy.evaluate(&result);

        match &result {
            MatchResult::Matched { record, distance } => tracing::info!(
                id = record.id,
                distance,
                flagged = record.identity.flagged,
                candidates = candidates.len(),
                "recognized"
            ),
            MatchResult::NoMatch => tracing::info!(
                candidates = candidates.len(),
                threshold = self.threshold,
                "no match"
            ),
        }

        Ok(Recognition {
            result,
            notification,
        })
    }

    /// Copy `src` into the upload directory as `<uuid>.<ext>`. Without an
    /// upload directory the source path is referenced as is.
    fn retain(&self, src: &Path) -> Result<PathBuf, EngineError> {
        let Some(dir) = &self.upload_dir else {
            return Ok(src.to_path_buf());
        };

        let ext = src.extension().and_then(|e| e.to_str()).unwrap_or("jpg");
        let dest = dir.join(format!("{}.{ext}", uuid::Uuid::new_v4().simple()));
        let upload_err = |source| EngineError::Upload {
            path: dest.display().to_string(),
            source,
        };

        std::fs::create_dir_all(dir).map_err(upload_err)?;
        std::fs::copy(src, &dest).map_err(upload_err)?;
        tracing::debug!(from = %src.display(), to = %dest.display(), "image retained");
        Ok(dest)
    }

    /// Remove a retained copy whose enrollment did not go through. Source
    /// images outside the upload directory are never touched.
    fn discard(&self, retained: &Path) {
        let Some(dir) = &self.upload_dir else {
            return;
        };
        if !retained.starts_with(dir) {
            return;
        }
        if let Err(e) = std::fs::remove_file(retained) {
            tracing::warn!(path = %retained.display(), error = %e, "failed to discard retained image");
        }
    }
}

/// Decode an image file into grayscale.
pub fn load_gray(path: &Path) -> Result<GrayImage, EngineError> {
    Ok(image::open(path)?.to_luma8())
}
