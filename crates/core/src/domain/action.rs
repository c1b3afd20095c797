// Action execution outcomes

use serde::{Deserialize, Serialize};

use super::finding::Finding;

/// Whether a plugin failure halts the remaining plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Criticality {
    FatalOnFailure,
    BestEffort,
}

impl std::fmt::Display for Criticality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Criticality::FatalOnFailure => write!(f, "FATAL_ON_FAILURE"),
            Criticality::BestEffort => write!(f, "BEST_EFFORT"),
        }
    }
}

/// Terminal state of one plan step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionStatus {
    Success,
    Failed,
    Skipped,
}

impl std::fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionStatus::Success => write!(f, "SUCCESS"),
            ActionStatus::Failed => write!(f, "FAILED"),
            ActionStatus::Skipped => write!(f, "SKIPPED"),
        }
    }
}

/// What a plugin hands back from `run`. The executor stamps the
/// duration and wraps this into an [`ActionResult`].
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub status: ActionStatus,
    pub findings: Vec<Finding>,
}

impl StepOutcome {
    pub fn success(findings: Vec<Finding>) -> Self {
        Self {
            status: ActionStatus::Success,
            findings,
        }
    }

    pub fn failed(findings: Vec<Finding>) -> Self {
        Self {
            status: ActionStatus::Failed,
            findings,
        }
    }
}

/// Result of exactly one plugin invocation, owned by the plan executor
/// until it is handed to the report sink
#[derive(Debug, Clone)]
pub struct ActionResult {
    pub status: ActionStatus,
    pub findings: Vec<Finding>,
    pub duration_ms: i64,
}

impl ActionResult {
    pub fn from_outcome(outcome: StepOutcome, duration_ms: i64) -> Self {
        Self {
            status: outcome.status,
            findings: outcome.findings,
            duration_ms,
        }
    }
}
