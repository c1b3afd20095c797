// MalwareScan - signature refresh, recursive antivirus scan, rootkit
// heuristic check, known-rootkit-signature check
//
// Infected-file removal is opt-in (`remove_infected`); the default is
// report-only. Removal is destructive and irreversible - there is no
// quarantine.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::domain::{Capability, Criticality, Finding, StepOutcome, SystemFacts};
use crate::port::{ActionPlugin, CommandRunner, CommandSpec};

pub const NAME: &str = "malware_scan";

// Non-clean line markers, matched per tool
const CLAMSCAN_MARKER: &str = " FOUND";
const RKHUNTER_MARKER: &str = "Warning";
const CHKROOTKIT_MARKER: &str = "INFECTED";

// clamscan exits 1 when infections were found; that is a completed scan
const CLAMSCAN_EXIT_INFECTED: i32 = 1;

pub struct MalwareScan {
    runner: Arc<dyn CommandRunner>,
    command_timeout: Duration,
    remove_infected: bool,
    scan_root: String,
}

impl MalwareScan {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        command_timeout: Duration,
        remove_infected: bool,
    ) -> Self {
        Self {
            runner,
            command_timeout,
            remove_infected,
            scan_root: "/".to_string(),
        }
    }

    /// Override the scan root (tests, targeted scans)
    pub fn with_scan_root(mut self, root: impl Into<String>) -> Self {
        self.scan_root = root.into();
        self
    }

    /// Every matching line becomes one critical finding; the subject
    /// is the path portion before the first ':' when present.
    fn findings_from_lines(output: &str, marker: &str, tool: &str) -> Vec<Finding> {
        output
            .lines()
            .filter(|line| line.contains(marker))
            .map(|line| {
                let subject = line.split(':').next().unwrap_or(tool).trim();
                Finding::critical(subject, format!("[{}] {}", tool, line.trim()))
            })
            .collect()
    }

    async fn refresh_signatures(&self, facts: &SystemFacts, findings: &mut Vec<Finding>) {
        if !facts.scanners.freshclam {
            findings.push(Finding::info(NAME, "freshclam not installed, skipping signature refresh"));
            return;
        }
        let spec = CommandSpec::new("freshclam", &[], self.command_timeout);
        match self.runner.run(&spec).await {
            Ok(output) if output.success() => {
                info!("ClamAV signatures refreshed");
            }
            Ok(output) => {
                warn!(exit_code = ?output.exit_code, "freshclam failed");
                findings.push(Finding::warning(
                    NAME,
                    format!("signature refresh exited with {:?}", output.exit_code),
                ));
            }
            Err(e) => findings.push(Finding::warning(NAME, e.to_string())),
        }
    }

    async fn clamav_scan(&self, findings: &mut Vec<Finding>) -> bool {
        let mut args = vec!["-r", "--infected"];
        if self.remove_infected {
            args.push("--remove=yes");
        }
        args.push(&self.scan_root);

        let spec = CommandSpec::new("clamscan", &args, self.command_timeout);
        match self.runner.run(&spec).await {
            Ok(output)
                if output.success() || output.exit_code == Some(CLAMSCAN_EXIT_INFECTED) =>
            {
                findings.extend(Self::findings_from_lines(
                    &output.stdout,
                    CLAMSCAN_MARKER,
                    "clamscan",
                ));
                true
            }
            Ok(output) => {
                findings.push(Finding::warning(
                    NAME,
                    format!("clamscan exited with {:?}", output.exit_code),
                ));
                false
            }
            Err(e) => {
                findings.push(Finding::warning(NAME, e.to_string()));
                false
            }
        }
    }

    async fn rootkit_checks(&self, facts: &SystemFacts, findings: &mut Vec<Finding>) {
        if facts.scanners.rkhunter {
            let spec = CommandSpec::new(
                "rkhunter",
                &["--check", "--sk", "--rwo"],
                self.command_timeout,
            );
            match self.runner.run(&spec).await {
                // rkhunter exits non-zero whenever warnings exist; the
                // --rwo output is the signal, not the exit code
                Ok(output) => findings.extend(Self::findings_from_lines(
                    &output.stdout,
                    RKHUNTER_MARKER,
                    "rkhunter",
                )),
                Err(e) => findings.push(Finding::warning(NAME, e.to_string())),
            }
        } else {
            findings.push(Finding::info(NAME, "rkhunter not installed, skipping"));
        }

        if facts.scanners.chkrootkit {
            let spec = CommandSpec::new("chkrootkit", &[], self.command_timeout);
            match self.runner.run(&spec).await {
                Ok(output) => findings.extend(Self::findings_from_lines(
                    &output.stdout,
                    CHKROOTKIT_MARKER,
                    "chkrootkit",
                )),
                Err(e) => findings.push(Finding::warning(NAME, e.to_string())),
            }
        } else {
            findings.push(Finding::info(NAME, "chkrootkit not installed, skipping"));
        }
    }
}

#[async_trait]
impl ActionPlugin for MalwareScan {
    fn name(&self) -> &str {
        NAME
    }

    fn capabilities(&self) -> BTreeSet<Capability> {
        BTreeSet::from([Capability::MalwareScanner])
    }

    fn criticality(&self) -> Criticality {
        Criticality::BestEffort
    }

    async fn run(&self, facts: &SystemFacts) -> StepOutcome {
        let mut findings = Vec::new();

        // The plan only requires one scanner; absent tools are skipped
        // in-step so rootkit checks still run on clamscan-less hosts.
        let scan_completed = if facts.scanners.clamscan {
            self.refresh_signatures(facts, &mut findings).await;
            self.clamav_scan(&mut findings).await
        } else {
            findings.push(Finding::info(
                NAME,
                "clamscan not installed, skipping antivirus scan",
            ));
            true
        };
        self.rootkit_checks(facts, &mut findings).await;

        let infected = findings
            .iter()
            .filter(|f| f.severity == crate::domain::Severity::Critical)
            .count();
        if scan_completed && infected == 0 {
            findings.push(Finding::info(NAME, "no infections found"));
        }
        info!(critical_findings = infected, "Malware scan finished");

        if scan_completed {
            StepOutcome::success(findings)
        } else {
            StepOutcome::failed(findings)
        }
    }
}
