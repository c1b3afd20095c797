// PackageUpdate - family-appropriate index refresh plus full upgrade

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::application::constants::STDERR_TAIL_LINES;
use crate::domain::{Capability, Criticality, Finding, StepOutcome, SystemFacts};
use crate::port::{ActionPlugin, CommandRunner, CommandSpec};

pub const NAME: &str = "package_update";

/// Updates the package index and upgrades all packages. Fatal: a host
/// that cannot be patched is not worth hardening further.
pub struct PackageUpdate {
    runner: Arc<dyn CommandRunner>,
    command_timeout: Duration,
}

impl PackageUpdate {
    pub fn new(runner: Arc<dyn CommandRunner>, command_timeout: Duration) -> Self {
        Self {
            runner,
            command_timeout,
        }
    }

    async fn run_stage(&self, args: &[&str]) -> Result<(), Finding> {
        let spec = CommandSpec::new(args[0], &args[1..], self.command_timeout);
        match self.runner.run(&spec).await {
            Ok(output) if output.success() => Ok(()),
            Ok(output) => Err(Finding::critical(
                NAME,
                format!(
                    "{} exited with {:?}: {}",
                    args.join(" "),
                    output.exit_code,
                    output.stderr_tail(STDERR_TAIL_LINES)
                ),
            )),
            Err(e) => Err(Finding::critical(NAME, e.to_string())),
        }
    }
}

#[async_trait]
impl ActionPlugin for PackageUpdate {
    fn name(&self) -> &str {
        NAME
    }

    fn capabilities(&self) -> BTreeSet<Capability> {
        BTreeSet::from([Capability::PackageManager])
    }

    fn criticality(&self) -> Criticality {
        Criticality::FatalOnFailure
    }

    async fn run(&self, facts: &SystemFacts) -> StepOutcome {
        let Some(pm) = facts.package_manager else {
            return StepOutcome::failed(vec![Finding::critical(
                NAME,
                "no package manager in facts snapshot",
            )]);
        };

        if let Some(refresh) = pm.refresh_args() {
            if let Err(finding) = self.run_stage(&refresh).await {
                return StepOutcome::failed(vec![finding]);
            }
        }

        match self.run_stage(&pm.upgrade_args()).await {
            Ok(()) => {
                info!(package_manager = %pm.binary(), "Package update completed");
                StepOutcome::success(vec![Finding::info(
                    NAME,
                    format!("packages refreshed and upgraded via {}", pm.binary()),
                )])
            }
            Err(finding) => StepOutcome::failed(vec![finding]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ActionStatus, DistroFamily, PackageManager, ScannerSet, Severity};
    use crate::port::command_runner::mocks::ScriptedCommandRunner;

    fn facts(pm: PackageManager) -> SystemFacts {
        SystemFacts {
            distro_family: DistroFamily::Debian,
            package_manager: Some(pm),
            firewall_backend: None,
            invoking_user: "alice".to_string(),
            scanners: ScannerSet::default(),
            account_tools_present: true,
        }
    }

    #[tokio::test]
    async fn test_apt_refresh_then_upgrade() {
        let runner = Arc::new(ScriptedCommandRunner::new());
        runner.push_output("apt-get", 0, "Reading package lists...", "");
        runner.push_output("apt-get", 0, "0 upgraded", "");

        let plugin = PackageUpdate::new(runner.clone(), Duration::from_secs(60));
        let outcome = plugin.run(&facts(PackageManager::Apt)).await;

        assert_eq!(outcome.status, ActionStatus::Success);
        assert_eq!(outcome.findings.len(), 1);
        assert_eq!(outcome.findings[0].severity, Severity::Info);

        let calls = runner.calls_for("apt-get");
        assert_eq!(calls[0].args, vec!["update"]);
        assert_eq!(calls[1].args, vec!["-y", "upgrade"]);
    }

    #[tokio::test]
    async fn test_nonzero_exit_yields_critical_finding_with_stderr_tail() {
        let runner = Arc::new(ScriptedCommandRunner::new());
        runner.push_output("apt-get", 0, "", "");
        runner.push_output("apt-get", 100, "", "E: dpkg interrupted\nE: broken state\n");

        let plugin = PackageUpdate::new(runner, Duration::from_secs(60));
        let outcome = plugin.run(&facts(PackageManager::Apt)).await;

        assert_eq!(outcome.status, ActionStatus::Failed);
        assert_eq!(outcome.findings[0].severity, Severity::Critical);
        assert!(outcome.findings[0].detail.contains("E: broken state"));
    }

    #[tokio::test]
    async fn test_pacman_has_no_separate_refresh() {
        let runner = Arc::new(ScriptedCommandRunner::new());
        runner.push_output("pacman", 0, "", "");

        let plugin = PackageUpdate::new(runner.clone(), Duration::from_secs(60));
        let outcome = plugin.run(&facts(PackageManager::Pacman)).await;

        assert_eq!(outcome.status, ActionStatus::Success);
        let calls = runner.calls_for("pacman");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].args, vec!["-Syu", "--noconfirm"]);
    }
}
