// Execution plan - the ordered, capability-filtered plugin sequence

use serde::{Deserialize, Serialize};

/// One planned step. `included == false` entries carry a skip reason
/// and are never invoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub plugin_name: String,
    pub included: bool,
    pub skip_reason: Option<String>,
}

impl PlanEntry {
    pub fn included(plugin_name: impl Into<String>) -> Self {
        Self {
            plugin_name: plugin_name.into(),
            included: true,
            skip_reason: None,
        }
    }

    pub fn skipped(plugin_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            plugin_name: plugin_name.into(),
            included: false,
            skip_reason: Some(reason.into()),
        }
    }
}

/// Ordered sequence of plan entries, built once per run and consumed once.
///
/// Invariant: an included entry's plugin requires only capabilities
/// derivable from the facts the plan was built against.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub entries: Vec<PlanEntry>,
}

impl ExecutionPlan {
    pub fn new(entries: Vec<PlanEntry>) -> Self {
        Self { entries }
    }

    pub fn included_count(&self) -> usize {
        self.entries.iter().filter(|e| e.included).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.entries.len() - self.included_count()
    }
}
