use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// Resolved result of a single probe attempt.
///
/// Exactly one variant is produced per probe: a response's status code is
/// authoritative when one arrives, otherwise the probe failed in transport
/// or ran out its timeout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProbeOutcome {
    Response { code: u16 },
    Transport { detail: String },
    Timeout,
}

impl ProbeOutcome {
    pub fn is_error(&self) -> bool {
        !matches!(self, ProbeOutcome::Response { .. })
    }

    pub fn response_code(&self) -> Option<u16> {
        match self {
            ProbeOutcome::Response { code } => Some(*code),
            _ => None,
        }
    }
}

/// Single-assignment slot for a probe outcome.
///
/// Response, transport-error and timeout events may race; the first
/// completion wins and every later completion is discarded.
#[derive(Debug, Default)]
pub struct OutcomeCell {
    slot: OnceLock<ProbeOutcome>,
}

impl OutcomeCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an outcome. Returns false when one was already recorded, in
    /// which case the given outcome is dropped.
    pub fn complete(&self, outcome: ProbeOutcome) -> bool {
        self.slot.set(outcome).is_ok()
    }

    pub fn get(&self) -> Option<&ProbeOutcome> {
        self.slot.get()
    }

    pub fn into_outcome(self) -> Option<ProbeOutcome> {
        self.slot.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn first_completion_wins() {
        let cell = OutcomeCell::new();
        assert!(cell.complete(ProbeOutcome::Response { code: 200 }));
        assert!(!cell.complete(ProbeOutcome::Timeout));
        assert_eq!(
            cell.into_outcome(),
            Some(ProbeOutcome::Response { code: 200 })
        );
    }

    #[tokio::test]
    async fn racing_completions_resolve_exactly_once() {
        let cell = Arc::new(OutcomeCell::new());
        let outcomes = [
            ProbeOutcome::Response { code: 200 },
            ProbeOutcome::Transport {
                detail: "connection reset".into(),
            },
            ProbeOutcome::Timeout,
        ];

        let mut handles = Vec::new();
        for outcome in outcomes.clone() {
            let cell = cell.clone();
            handles.push(tokio::spawn(async move { cell.complete(outcome) }));
        }

        let mut accepted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                accepted += 1;
            }
        }

        assert_eq!(accepted, 1);
        let winner = cell.get().cloned().unwrap();
        assert!(outcomes.contains(&winner));
    }

    #[test]
    fn outcome_serializes_with_kind_tag() {
        let outcome = ProbeOutcome::Response { code: 200 };
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["kind"], "response");
        assert_eq!(value["code"], 200);

        let timeout = serde_json::to_value(ProbeOutcome::Timeout).unwrap();
        assert_eq!(timeout["kind"], "timeout");
    }
}
