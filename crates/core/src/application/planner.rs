//! Plan Builder - capability-filtered, deterministic plan construction
//!
//! For each registered plugin, in registration order, test whether its
//! required capabilities are a subset of the facts' derived
//! capabilities. Unmet-capability plugins are marked skipped, never
//! invoked. Same facts + same registry => same plan, always.

use tracing::{debug, info, warn};

use crate::domain::{ExecutionPlan, PlanEntry, SystemFacts};

use super::constants::SKIP_REQUESTED_REASON;
use super::registry::PluginRegistry;

/// Builds execution plans. Pure: no I/O, no randomness, no
/// environment re-probe.
pub struct PlanBuilder;

impl PlanBuilder {
    pub fn build(
        facts: &SystemFacts,
        registry: &PluginRegistry,
        skip_requests: &[String],
    ) -> ExecutionPlan {
        // A typo'd --skip would otherwise be silently ignored
        for request in skip_requests {
            if registry.find(request).is_none() {
                warn!(plugin = %request, "Skip request matches no registered plugin");
            }
        }

        let derived = facts.derived_capabilities();
        let mut entries = Vec::with_capacity(registry.len());

        for plugin in registry.plugins() {
            let name = plugin.name();

            if skip_requests.iter().any(|s| s == name) {
                debug!(plugin = %name, "Plugin excluded by request");
                entries.push(PlanEntry::skipped(name, SKIP_REQUESTED_REASON));
                continue;
            }

            let missing: Vec<String> = plugin
                .capabilities()
                .iter()
                .filter(|cap| !derived.contains(cap))
                .map(|cap| cap.to_string())
                .collect();

            if missing.is_empty() {
                entries.push(PlanEntry::included(name));
            } else {
                debug!(plugin = %name, missing = ?missing, "Plugin capability unmet");
                entries.push(PlanEntry::skipped(
                    name,
                    format!("missing capability: {}", missing.join(", ")),
                ));
            }
        }

        let plan = ExecutionPlan::new(entries);
        info!(
            included = plan.included_count(),
            skipped = plan.skipped_count(),
            "Execution plan built"
        );
        plan
    }
}
