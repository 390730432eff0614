use crate::alert::Notification;
use crate::matcher::round2;
use serde::{Deserialize, Serialize};

/// A facial landmark in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandmarkPoint {
    pub x: f64,
    pub y: f64,
}

impl LandmarkPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &LandmarkPoint) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl From<(f64, f64)> for LandmarkPoint {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for LandmarkPoint {
    fn from((x, y): (i32, i32)) -> Self {
        Self {
            x: f64::from(x),
            y: f64::from(y),
        }
    }
}

/// Ordered landmarks for one face.
///
/// Position `i` always refers to the same anatomical location, so the order
/// produced by the landmark model must be kept. An empty sequence means no
/// face was found.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointSequence(Vec<LandmarkPoint>);

impl PointSequence {
    pub fn new(points: Vec<LandmarkPoint>) -> Self {
        Self(points)
    }

    /// The "no face detected" sequence.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn points(&self) -> &[LandmarkPoint] {
        &self.0
    }
}

impl FromIterator<LandmarkPoint> for PointSequence {
    fn from_iter<I: IntoIterator<Item = LandmarkPoint>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Identity attributes of an enrolled person. These are the only fields
/// that can change after enrollment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub surname: String,
    /// Unique person code (document number, badge id, ...).
    pub code: String,
    pub email: String,
    /// Raise an alert whenever this person is recognized.
    pub flagged: bool,
}

/// An enrolled person as read back from the record store.
///
/// The descriptor is kept apart from the record: it is immutable once
/// enrolled and only the matcher looks at it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentRecord {
    pub id: i64,
    #[serde(flatten)]
    pub identity: Identity,
    /// Path of the retained source image.
    pub image_path: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Outcome of matching a query descriptor against the gallery.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchResult {
    NoMatch,
    Matched {
        record: EnrollmentRecord,
        /// Euclidean distance to the query. Never persisted.
        distance: f64,
    },
}

impl MatchResult {
    pub fn is_match(&self) -> bool {
        matches!(self, MatchResult::Matched { .. })
    }

    pub fn record(&self) -> Option<&EnrollmentRecord> {
        match self {
            MatchResult::Matched { record, .. } => Some(record),
            MatchResult::NoMatch => None,
        }
    }

    pub fn distance(&self) -> Option<f64> {
        match self {
            MatchResult::Matched { distance, .. } => Some(*distance),
            MatchResult::NoMatch => None,
        }
    }

    /// True only for a match against a flagged person.
    pub fn flagged(&self) -> bool {
        self.record().is_some_and(|r| r.identity.flagged)
    }
}

/// Caller-facing view of a [`MatchResult`].
///
/// Serializes to `{"matched": false}` for a miss, or to the matched
/// identity with the distance rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchReport {
    pub matched: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flagged: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    /// Empty for matches against non-flagged people.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_message: Option<String>,
}

impl MatchReport {
    pub fn new(result: &MatchResult, notification: Option<&Notification>) -> Self {
        match result {
            MatchResult::NoMatch => Self {
                matched: false,
                id: None,
                name: None,
                surname: None,
                email: None,
                flagged: None,
                distance: None,
                alert_message: None,
            },
            MatchResult::Matched { record, distance } => Self {
                matched: true,
                id: Some(record.id),
                name: Some(record.identity.name.clone()),
                surname: Some(record.identity.surname.clone()),
                email: Some(record.identity.email.clone()),
                flagged: Some(record.identity.flagged),
                distance: Some(round2(*distance)),
                alert_message: Some(
                    notification
                        .map(|n| n.message.clone())
                        .unwrap_or_default(),
                ),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(flagged: bool) -> EnrollmentRecord {
        EnrollmentRecord {
            id: 7,
            identity: Identity {
                name: "Ana".into(),
                surname: "Quispe".into(),
                code: "A-001".into(),
                email: "ana@example.com".into(),
                flagged,
            },
            image_path: "uploads/a.jpg".into(),
            created_at: "".into(),
            updated_at: "".into(),
        }
    }

    #[test]
    fn test_point_distance() {
        let a = LandmarkPoint::from((0i32, 0i32));
        let b = LandmarkPoint::from((3i32, 4i32));
        assert_eq!(a.distance(&b), 5.0);
        assert_eq!(b.distance(&a), 5.0);
    }

    #[test]
    fn test_point_sequence_serializes_as_array() {
        let seq: PointSequence = [(1.0f64, 2.0f64), (3.0, 4.0)]
            .into_iter()
            .map(LandmarkPoint::from)
            .collect();
        let json = serde_json::to_string(&seq).unwrap();
        assert_eq!(json, r#"[{"x":1.0,"y":2.0},{"x":3.0,"y":4.0}]"#);
    }

    #[test]
    fn test_no_match_report_is_minimal() {
        let report = MatchReport::new(&MatchResult::NoMatch, None);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json, serde_json::json!({ "matched": false }));
    }

    #[test]
    fn test_match_report_rounds_distance() {
        let result = MatchResult::Matched {
            record: record(false),
            distance: 12.34567,
        };
        let report = MatchReport::new(&result, None);
        assert!(report.matched);
        assert_eq!(report.id, Some(7));
        assert_eq!(report.distance, Some(12.35));
        assert_eq!(report.flagged, Some(false));
        assert_eq!(report.alert_message.as_deref(), Some(""));
    }

    #[test]
    fn test_match_report_carries_alert() {
        let result = MatchResult::Matched {
            record: record(true),
            distance: 1.0,
        };
        let notification = Notification {
            record_id: 7,
            message: "alert".into(),
        };
        let report = MatchReport::new(&result, Some(&notification));
        assert_eq!(report.alert_message.as_deref(), Some("alert"));
        assert!(result.flagged());
    }

    #[test]
    fn test_record_serializes_flat() {
        let json = serde_json::to_value(record(true)).unwrap();
        assert_eq!(json["name"], "Ana");
        assert_eq!(json["flagged"], true);
        assert!(json.get("identity").is_none());
    }
}
