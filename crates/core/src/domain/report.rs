// Run report - append-only record of a hardening run

use serde::{Deserialize, Serialize};

use super::action::ActionStatus;
use super::error::{DomainError, Result};
use super::facts::SystemFacts;
use super::finding::Severity;

/// Metadata captured at run start
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub run_id: String,
    pub started_at_ms: i64,
    pub facts: SystemFacts,
}

/// Per-step record kept in the report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub plugin_name: String,
    pub status: ActionStatus,
    pub skip_reason: Option<String>,
    pub duration_ms: i64,
    pub finding_count: usize,
}

/// Counts printed in the end-of-run summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub fatal_failure: bool,
    pub info_findings: usize,
    pub warning_findings: usize,
    pub critical_findings: usize,
}

/// In-memory view of a run. Monotonically growing while the run is
/// live; immutable after `finalize`.
#[derive(Debug, Clone)]
pub struct RunReport {
    metadata: RunMetadata,
    steps: Vec<StepRecord>,
    summary: RunSummary,
    finalized: bool,
}

impl RunReport {
    pub fn new(metadata: RunMetadata) -> Self {
        Self {
            metadata,
            steps: Vec::new(),
            summary: RunSummary::default(),
            finalized: false,
        }
    }

    pub fn metadata(&self) -> &RunMetadata {
        &self.metadata
    }

    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Append one step record, in plan order
    pub fn record_step(&mut self, record: StepRecord) -> Result<()> {
        if self.finalized {
            return Err(DomainError::ReportFinalized);
        }
        match record.status {
            ActionStatus::Success => self.summary.succeeded += 1,
            ActionStatus::Failed => self.summary.failed += 1,
            ActionStatus::Skipped => self.summary.skipped += 1,
        }
        self.steps.push(record);
        Ok(())
    }

    pub fn record_finding(&mut self, severity: Severity) -> Result<()> {
        if self.finalized {
            return Err(DomainError::ReportFinalized);
        }
        match severity {
            Severity::Info => self.summary.info_findings += 1,
            Severity::Warning => self.summary.warning_findings += 1,
            Severity::Critical => self.summary.critical_findings += 1,
        }
        Ok(())
    }

    pub fn mark_fatal_failure(&mut self) {
        self.summary.fatal_failure = true;
    }

    pub fn finalize(&mut self) {
        self.finalized = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::facts::{DistroFamily, ScannerSet, SystemFacts};

    fn metadata() -> RunMetadata {
        RunMetadata {
            run_id: "run-1".to_string(),
            started_at_ms: 1000,
            facts: SystemFacts {
                distro_family: DistroFamily::Debian,
                package_manager: None,
                firewall_backend: None,
                invoking_user: "alice".to_string(),
                scanners: ScannerSet::default(),
                account_tools_present: false,
            },
        }
    }

    #[test]
    fn test_step_records_update_summary() {
        let mut report = RunReport::new(metadata());

        report
            .record_step(StepRecord {
                plugin_name: "package_update".to_string(),
                status: ActionStatus::Success,
                skip_reason: None,
                duration_ms: 10,
                finding_count: 1,
            })
            .unwrap();
        report
            .record_step(StepRecord {
                plugin_name: "firewall_baseline".to_string(),
                status: ActionStatus::Skipped,
                skip_reason: Some("missing capability: firewall_backend".to_string()),
                duration_ms: 0,
                finding_count: 0,
            })
            .unwrap();

        assert_eq!(report.summary().succeeded, 1);
        assert_eq!(report.summary().skipped, 1);
        assert_eq!(report.summary().failed, 0);
    }

    #[test]
    fn test_append_after_finalize_is_rejected() {
        let mut report = RunReport::new(metadata());
        report.finalize();

        let err = report
            .record_step(StepRecord {
                plugin_name: "package_update".to_string(),
                status: ActionStatus::Success,
                skip_reason: None,
                duration_ms: 10,
                finding_count: 0,
            })
            .unwrap_err();

        assert!(matches!(err, DomainError::ReportFinalized));
        assert!(matches!(
            report.record_finding(Severity::Info).unwrap_err(),
            DomainError::ReportFinalized
        ));
    }
}
