//! State derivation for probe outcomes.

use chrono::{DateTime, Utc};

use super::types::ProbeOutcome;
use crate::models::{Check, CheckState};

/// Result of evaluating one probe outcome against a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub state: CheckState,
    pub alert_warranted: bool,
}

/// Derive the new state for a check and decide whether the transition
/// warrants an alert.
///
/// Up iff the outcome carries a response code that is one of the check's
/// success codes. A check with no `lastChecked` baseline never alerts,
/// whatever state it lands in.
///
/// Pure: no clock reads, no side effects.
pub fn evaluate(check: &Check, outcome: &ProbeOutcome) -> Evaluation {
    let state = match outcome.response_code() {
        Some(code) if check.success_codes.contains(&code) => CheckState::Up,
        _ => CheckState::Down,
    };

    let alert_warranted = check.last_checked.is_some() && state != check.state;

    Evaluation {
        state,
        alert_warranted,
    }
}

impl Evaluation {
    /// Stamp this evaluation onto a check, producing the record to persist.
    pub fn apply(&self, check: &Check, now: DateTime<Utc>) -> Check {
        let mut updated = check.clone();
        updated.state = self.state;
        updated.last_checked = Some(now);
        updated
    }
}
