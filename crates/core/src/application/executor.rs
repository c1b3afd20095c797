//! Plan Executor - runs the ordered plan, one step at a time
//!
//! Step states: pending -> running -> {succeeded, failed, skipped}.
//! Terminal states are final; there are no retries (external tools are
//! not assumed safe to blindly re-run). A fatal-criticality failure
//! halts the plan and marks every remaining step skipped; best-effort
//! failures are recorded and execution continues. Findings reach the
//! report sink in step order regardless of step outcome.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::{
    ActionResult, ActionStatus, Criticality, ExecutionPlan, Finding, PlanEntry, RunMetadata,
    RunReport, Severity, StepOutcome, StepRecord, SystemFacts,
};
use crate::error::{AppError, Result};
use crate::port::{ActionPlugin, ReportSink, TimeProvider};

use super::constants::{ABORT_CANCELLED_REASON, ABORT_FATAL_REASON};
use super::registry::PluginRegistry;
use super::shutdown::AbortToken;

/// Executes one plan sequentially against one facts snapshot.
///
/// Single logical thread of control: several built-in plugins mutate
/// shared host state (package database, firewall table, account
/// database), so steps never run in parallel. The sink needs no
/// locking for the same reason; that simplicity must be revisited if
/// parallel execution is ever introduced.
pub struct PlanExecutor {
    sink: Arc<dyn ReportSink>,
    time_provider: Arc<dyn TimeProvider>,
    step_timeout: Duration,
    abort: AbortToken,
}

impl PlanExecutor {
    pub fn new(
        sink: Arc<dyn ReportSink>,
        time_provider: Arc<dyn TimeProvider>,
        step_timeout: Duration,
        abort: AbortToken,
    ) -> Self {
        Self {
            sink,
            time_provider,
            step_timeout,
            abort,
        }
    }

    /// Run the plan to completion and finalize the report.
    ///
    /// # Errors
    /// Only report persistence failures (and an internally inconsistent
    /// plan/registry pair) propagate; step failures are converted into
    /// `ActionResult`s and report entries.
    pub async fn execute(
        &self,
        plan: &ExecutionPlan,
        registry: &PluginRegistry,
        facts: &SystemFacts,
    ) -> Result<RunReport> {
        let metadata = RunMetadata {
            run_id: Uuid::new_v4().to_string(),
            started_at_ms: self.time_provider.now_millis(),
            facts: facts.clone(),
        };

        info!(run_id = %metadata.run_id, steps = plan.entries.len(), "Starting plan execution");
        self.sink.begin(&metadata)?;

        let mut report = RunReport::new(metadata);
        let mut halted = false;

        for entry in &plan.entries {
            if !entry.included {
                self.record_skip(&mut report, entry, entry.skip_reason.clone())?;
                continue;
            }
            if halted {
                self.record_skip(&mut report, entry, Some(ABORT_FATAL_REASON.to_string()))?;
                continue;
            }
            if self.abort.is_aborted() {
                warn!(plugin = %entry.plugin_name, "Run abort requested, skipping remaining steps");
                self.record_skip(&mut report, entry, Some(ABORT_CANCELLED_REASON.to_string()))?;
                continue;
            }

            let plugin = registry.find(&entry.plugin_name).ok_or_else(|| {
                AppError::Internal(format!(
                    "Plan references unregistered plugin '{}'",
                    entry.plugin_name
                ))
            })?;

            let result = self.run_step(plugin, facts).await;

            self.sink.section(&format!("step: {}", entry.plugin_name))?;
            for finding in &result.findings {
                self.sink.finding(finding)?;
                report.record_finding(finding.severity)?;
            }

            let record = StepRecord {
                plugin_name: entry.plugin_name.clone(),
                status: result.status,
                skip_reason: None,
                duration_ms: result.duration_ms,
                finding_count: result.findings.len(),
            };
            self.sink.step_outcome(&record)?;
            report.record_step(record)?;

            if result.status == ActionStatus::Failed {
                match plugin.criticality() {
                    Criticality::FatalOnFailure => {
                        error!(plugin = %entry.plugin_name, "Fatal step failed, halting plan");
                        report.mark_fatal_failure();
                        halted = true;
                    }
                    Criticality::BestEffort => {
                        warn!(plugin = %entry.plugin_name, "Best-effort step failed, continuing");
                    }
                }
            }
        }

        report.finalize();
        self.sink.finalize(report.summary())?;

        info!(
            succeeded = report.summary().succeeded,
            failed = report.summary().failed,
            skipped = report.summary().skipped,
            fatal = report.summary().fatal_failure,
            "Plan execution finished"
        );
        Ok(report)
    }

    /// Run one included step under the per-step timeout.
    ///
    /// No cancellation mid-step: once dispatched, the step owns the
    /// control flow until it returns or times out.
    async fn run_step(&self, plugin: &Arc<dyn ActionPlugin>, facts: &SystemFacts) -> ActionResult {
        info!(plugin = %plugin.name(), "Step running");
        let started = self.time_provider.now_millis();

        match timeout(self.step_timeout, plugin.run(facts)).await {
            Ok(outcome) => {
                let duration_ms = self.time_provider.now_millis() - started;
                info!(
                    plugin = %plugin.name(),
                    status = %outcome.status,
                    duration_ms,
                    "Step finished"
                );
                ActionResult::from_outcome(outcome, duration_ms)
            }
            Err(_) => {
                let duration_ms = self.time_provider.now_millis() - started;
                warn!(
                    plugin = %plugin.name(),
                    timeout_ms = self.step_timeout.as_millis() as i64,
                    "Step timed out"
                );
                let severity = match plugin.criticality() {
                    Criticality::FatalOnFailure => Severity::Critical,
                    Criticality::BestEffort => Severity::Warning,
                };
                ActionResult::from_outcome(
                    StepOutcome::failed(vec![Finding::new(
                        severity,
                        plugin.name().to_string(),
                        format!("timeout after {}s", self.step_timeout.as_secs()),
                    )]),
                    duration_ms,
                )
            }
        }
    }

    fn record_skip(
        &self,
        report: &mut RunReport,
        entry: &PlanEntry,
        reason: Option<String>,
    ) -> Result<()> {
        let record = StepRecord {
            plugin_name: entry.plugin_name.clone(),
            status: ActionStatus::Skipped,
            skip_reason: reason,
            duration_ms: 0,
            finding_count: 0,
        };
        self.sink.step_outcome(&record)?;
        report.record_step(record)?;
        Ok(())
    }
}
