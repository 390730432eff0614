//! Flagged-person alerting on confirmed matches.

use crate::types::MatchResult;
use serde::Serialize;

/// Advisory alert raised for a recognized flagged person.
///
/// Logged and returned to the caller only; nothing is dispatched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub record_id: i64,
    pub message: String,
}

/// Decides whether a match result warrants a notification.
pub trait AlertPolicy {
    fn evaluate(&self, result: &MatchResult) -> Option<Notification>;
}

/// Alerts on every match against a record with `flagged = true`.
pub struct FlaggedPersonPolicy;

impl AlertPolicy for FlaggedPersonPolicy {
    fn evaluate(&self, result: &MatchResult) -> Option<Notification> {
        let MatchResult::Matched { record, distance } = result else {
            return None;
        };
        if !record.identity.flagged {
            return None;
        }

        let message = format!(
            "ALERT! Flagged person detected: {} {} (id {}, code {}). Notification sent (simulated).",
            record.identity.name, record.identity.surname, record.id, record.identity.code
        );
        tracing::warn!(
            id = record.id,
            code = %record.identity.code,
            distance,
            "flagged person recognized"
        );

        Some(Notification {
            record_id: record.id,
            message,
        })
    }
}
