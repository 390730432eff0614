//! Geometric face descriptor built from consecutive landmark distances.
//!
//! For landmarks `p0..pN-1` the descriptor is `[|p1-p0|, |p2-p1|, ...]`,
//! N-1 non-negative values. No scale normalization is applied, so the same
//! face photographed closer to the camera yields proportionally larger
//! values. Known weakness, kept as is.

use crate::types::PointSequence;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DescriptorError {
    #[error("landmark sequence is empty — no face to describe")]
    EmptyInput,
    #[error("descriptor length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("malformed descriptor: {0}")]
    Malformed(String),
}

/// Fixed-length feature vector compared by Euclidean distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Descriptor {
    values: Vec<f64>,
}

impl Descriptor {
    /// Build a descriptor from an ordered landmark sequence.
    ///
    /// Callers must short-circuit "no face" before enrollment or matching;
    /// an empty sequence is rejected with [`DescriptorError::EmptyInput`].
    /// Non-finite landmark coordinates yield [`DescriptorError::Malformed`].
    pub fn build(points: &PointSequence) -> Result<Self, DescriptorError> {
        if points.is_empty() {
            return Err(DescriptorError::EmptyInput);
        }

        let values = points
            .points()
            .windows(2)
            .map(|pair| pair[1].distance(&pair[0]))
            .collect();

        Self::from_values(values)
    }

    /// Wrap raw values. Rejects negative and non-finite components.
    pub fn from_values(values: Vec<f64>) -> Result<Self, DescriptorError> {
        if let Some(bad) = values.iter().find(|v| !v.is_finite() || **v < 0.0) {
            return Err(DescriptorError::Malformed(format!(
                "component {bad} is not a finite non-negative distance"
            )));
        }
        Ok(Self { values })
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Euclidean (L2) distance to another descriptor of the same length.
    pub fn distance(&self, other: &Descriptor) -> Result<f64, DescriptorError> {
        if self.len() != other.len() {
            return Err(DescriptorError::LengthMismatch {
                expected: self.len(),
                actual: other.len(),
            });
        }

        Ok(self
            .values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt())
    }

    /// Serialize as a JSON array of floats for storage.
    pub fn to_json(&self) -> Result<String, DescriptorError> {
        serde_json::to_string(&self.values).map_err(|e| DescriptorError::Malformed(e.to_string()))
    }

    /// Parse a stored JSON array of floats.
    pub fn from_json(raw: &str) -> Result<Self, DescriptorError> {
        let values: Vec<f64> =
            serde_json::from_str(raw).map_err(|e| DescriptorError::Malformed(e.to_string()))?;
        Self::from_values(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LandmarkPoint;

    fn seq(points: &[(f64, f64)]) -> PointSequence {
        points.iter().copied().map(LandmarkPoint::from).collect()
    }

    /// 68 points along a spiral — distinct, irregular spacing.
    fn face_like() -> PointSequence {
        (0..68)
            .map(|i| {
                let t = i as f64 * 0.3;
                LandmarkPoint::new(200.0 + t * 10.0 * t.cos(), 240.0 + t * 10.0 * t.sin())
            })
            .collect()
    }

    #[test]
    fn test_build_consecutive_distances() {
        let d = Descriptor::build(&seq(&[(0.0, 0.0), (3.0, 4.0), (3.0, 4.0)])).unwrap();
        assert_eq!(d.values(), &[5.0, 0.0]);
    }

    #[test]
    fn test_build_length_and_sign() {
        let points = face_like();
        let d = Descriptor::build(&points).unwrap();
        assert_eq!(d.len(), points.len() - 1);
        assert!(d.values().iter().all(|v| *v >= 0.0));
    }

    #[test]
    fn test_build_single_point_is_empty_descriptor() {
        let d = Descriptor::build(&seq(&[(10.0, 10.0)])).unwrap();
        assert!(d.is_empty());
    }

    #[test]
    fn test_build_empty_fails() {
        let err = Descriptor::build(&PointSequence::empty()).unwrap_err();
        assert!(matches!(err, DescriptorError::EmptyInput));
    }

    #[test]
    fn test_build_rejects_non_finite_landmarks() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = Descriptor::build(&seq(&[(bad, 0.0), (0.0, 0.0)])).unwrap_err();
            assert!(matches!(err, DescriptorError::Malformed(_)), "accepted {bad}");
        }
    }

    #[test]
    fn test_build_deterministic() {
        let points = face_like();
        assert_eq!(
            Descriptor::build(&points).unwrap(),
            Descriptor::build(&points).unwrap()
        );
    }

    #[test]
    fn test_build_is_translation_invariant_not_scale_invariant() {
        let base = seq(&[(0.0, 0.0), (3.0, 4.0), (6.0, 8.0)]);
        let shifted = seq(&[(10.0, 10.0), (13.0, 14.0), (16.0, 18.0)]);
        let scaled = seq(&[(0.0, 0.0), (6.0, 8.0), (12.0, 16.0)]);

        let d = Descriptor::build(&base).unwrap();
        assert_eq!(d, Descriptor::build(&shifted).unwrap());
        assert_eq!(Descriptor::build(&scaled).unwrap().values(), &[10.0, 10.0]);
    }

    #[test]
    fn test_distance_symmetric() {
        let a = Descriptor::from_values(vec![1.0, 2.0, 3.0]).unwrap();
        let b = Descriptor::from_values(vec![4.0, 0.5, 9.0]).unwrap();
        assert_eq!(a.distance(&b).unwrap(), b.distance(&a).unwrap());
    }

    #[test]
    fn test_distance_identical_is_zero() {
        let d = Descriptor::build(&face_like()).unwrap();
        assert_eq!(d.distance(&d).unwrap(), 0.0);
    }

    #[test]
    fn test_distance_length_mismatch() {
        let a = Descriptor::from_values(vec![1.0, 2.0]).unwrap();
        let b = Descriptor::from_values(vec![1.0]).unwrap();
        let err = a.distance(&b).unwrap_err();
        assert!(matches!(
            err,
            DescriptorError::LengthMismatch { expected: 2, actual: 1 }
        ));
    }

    #[test]
    fn test_json_roundtrip() {
        let d = Descriptor::from_values(vec![5.0, 0.0, 1.25]).unwrap();
        let json = d.to_json().unwrap();
        assert_eq!(json, "[5.0,0.0,1.25]");
        assert_eq!(Descriptor::from_json(&json).unwrap(), d);
    }

    #[test]
    fn test_from_json_accepts_integers() {
        let d = Descriptor::from_json("[5, 0]").unwrap();
        assert_eq!(d.values(), &[5.0, 0.0]);
    }

    #[test]
    fn test_from_json_malformed() {
        for raw in ["", "not json", "{\"a\": 1}", "[1.0, \"x\"]", "[-1.0]"] {
            assert!(
                matches!(Descriptor::from_json(raw), Err(DescriptorError::Malformed(_))),
                "expected malformed for {raw:?}"
            );
        }
    }
}
