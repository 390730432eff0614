//! Thresholded nearest-neighbor matching over an enrolled gallery.

use crate::descriptor::Descriptor;
use crate::types::{EnrollmentRecord, MatchResult};

/// Acceptance ceiling for a Euclidean match on raw landmark distances.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 30.0;

/// Strategy for comparing a query descriptor against enrolled candidates.
pub trait Matcher {
    fn compare(
        &self,
        query: &Descriptor,
        candidates: &[(EnrollmentRecord, Descriptor)],
        threshold: f64,
    ) -> MatchResult;
}

/// Linear-scan Euclidean matcher.
///
/// O(M·N) per query for M candidates of length N. There is no index, so
/// this only scales to small galleries.
///
/// A candidate becomes the best iff its distance is strictly below both the
/// current best and `threshold`; ties therefore keep the earlier candidate.
/// Candidates whose length differs from the query are skipped.
pub struct EuclideanMatcher;

impl Matcher for EuclideanMatcher {
    fn compare(
        &self,
        query: &Descriptor,
        candidates: &[(EnrollmentRecord, Descriptor)],
        threshold: f64,
    ) -> MatchResult {
        let best = candidates.iter().fold(
            None::<(&EnrollmentRecord, f64)>,
            |best, (record, descriptor)| {
                let distance = match query.distance(descriptor) {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::warn!(id = record.id, error = %e, "skipping candidate");
                        return best;
                    }
                };
                tracing::debug!(id = record.id, distance, "candidate scored");

                let improves = distance < threshold
                    && best.map_or(true, |(_, best_distance)| distance < best_distance);
                if improves {
                    Some((record, distance))
                } else {
                    best
                }
            },
        );

        match best {
            Some((record, distance)) => MatchResult::Matched {
                record: record.clone(),
                distance,
            },
            None => MatchResult::NoMatch,
        }
    }
}

/// Round to two decimal places for reporting.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
