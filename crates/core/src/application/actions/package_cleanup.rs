// PackageCleanup - orphan removal, best-effort

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::application::constants::STDERR_TAIL_LINES;
use crate::domain::{Capability, Criticality, Finding, PackageManager, StepOutcome, SystemFacts};
use crate::port::{ActionPlugin, CommandRunner, CommandSpec};

pub const NAME: &str = "package_cleanup";

/// Removes orphaned packages / stale caches. Never aborts the plan:
/// a failed cleanup leaves the host no worse than before.
pub struct PackageCleanup {
    runner: Arc<dyn CommandRunner>,
    command_timeout: Duration,
}

impl PackageCleanup {
    pub fn new(runner: Arc<dyn CommandRunner>, command_timeout: Duration) -> Self {
        Self {
            runner,
            command_timeout,
        }
    }

    /// Pacman separates orphan listing (-Qtdq) from removal (-Rns).
    /// -Qtdq exits 1 with no output when there are no orphans.
    async fn cleanup_pacman(&self) -> StepOutcome {
        let query = CommandSpec::new("pacman", &["-Qtdq"], self.command_timeout);
        let orphans = match self.runner.run(&query).await {
            Ok(output) => output,
            Err(e) => return StepOutcome::failed(vec![Finding::warning(NAME, e.to_string())]),
        };

        let packages: Vec<&str> = orphans
            .stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();

        if packages.is_empty() {
            return StepOutcome::success(vec![Finding::info(NAME, "no orphaned packages")]);
        }

        let mut args = vec!["-Rns", "--noconfirm"];
        args.extend(packages.iter().copied());
        let remove = CommandSpec::new("pacman", &args, self.command_timeout);
        match self.runner.run(&remove).await {
            Ok(output) if output.success() => StepOutcome::success(vec![Finding::info(
                NAME,
                format!("removed {} orphaned packages", packages.len()),
            )]),
            Ok(output) => StepOutcome::failed(vec![Finding::warning(
                NAME,
                format!(
                    "pacman -Rns exited with {:?}: {}",
                    output.exit_code,
                    output.stderr_tail(STDERR_TAIL_LINES)
                ),
            )]),
            Err(e) => StepOutcome::failed(vec![Finding::warning(NAME, e.to_string())]),
        }
    }

    async fn cleanup_single(&self, pm: PackageManager) -> StepOutcome {
        let args = pm.cleanup_args();
        let spec = CommandSpec::new(args[0], &args[1..], self.command_timeout);
        match self.runner.run(&spec).await {
            Ok(output) if output.success() => {
                info!(package_manager = %pm.binary(), "Package cleanup completed");
                StepOutcome::success(vec![Finding::info(
                    NAME,
                    format!("orphan cleanup completed via {}", pm.binary()),
                )])
            }
            Ok(output) => StepOutcome::failed(vec![Finding::warning(
                NAME,
                format!(
                    "{} exited with {:?}: {}",
                    args.join(" "),
                    output.exit_code,
                    output.stderr_tail(STDERR_TAIL_LINES)
                ),
            )]),
            Err(e) => StepOutcome::failed(vec![Finding::warning(NAME, e.to_string())]),
        }
    }
}

#[async_trait]
impl ActionPlugin for PackageCleanup {
    fn name(&self) -> &str {
        NAME
    }

    fn capabilities(&self) -> BTreeSet<Capability> {
        BTreeSet::from([Capability::PackageManager])
    }

    fn criticality(&self) -> Criticality {
        Criticality::BestEffort
    }

    async fn run(&self, facts: &SystemFacts) -> StepOutcome {
        let Some(pm) = facts.package_manager else {
            return StepOutcome::failed(vec![Finding::warning(
                NAME,
                "no package manager in facts snapshot",
            )]);
        };

        match pm {
            PackageManager::Pacman => self.cleanup_pacman().await,
            other => self.cleanup_single(other).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ActionStatus, DistroFamily, ScannerSet};
    use crate::port::command_runner::mocks::ScriptedCommandRunner;

    fn facts(pm: PackageManager) -> SystemFacts {
        SystemFacts {
            distro_family: DistroFamily::Arch,
            package_manager: Some(pm),
            firewall_backend: None,
            invoking_user: "alice".to_string(),
            scanners: ScannerSet::default(),
            account_tools_present: true,
        }
    }

    #[tokio::test]
    async fn test_pacman_no_orphans_is_success() {
        let runner = Arc::new(ScriptedCommandRunner::new());
        runner.push_output("pacman", 1, "", ""); // -Qtdq: exit 1, no orphans

        let plugin = PackageCleanup::new(runner.clone(), Duration::from_secs(60));
        let outcome = plugin.run(&facts(PackageManager::Pacman)).await;

        assert_eq!(outcome.status, ActionStatus::Success);
        assert_eq!(runner.calls_for("pacman").len(), 1);
    }

    #[tokio::test]
    async fn test_pacman_orphans_are_removed() {
        let runner = Arc::new(ScriptedCommandRunner::new());
        runner.push_output("pacman", 0, "liborphan\noldtool\n", "");
        runner.push_output("pacman", 0, "", "");

        let plugin = PackageCleanup::new(runner.clone(), Duration::from_secs(60));
        let outcome = plugin.run(&facts(PackageManager::Pacman)).await;

        assert_eq!(outcome.status, ActionStatus::Success);
        let calls = runner.calls_for("pacman");
        assert_eq!(
            calls[1].args,
            vec!["-Rns", "--noconfirm", "liborphan", "oldtool"]
        );
    }

    #[tokio::test]
    async fn test_apt_autoremove_failure_is_warning_not_critical() {
        let runner = Arc::new(ScriptedCommandRunner::new());
        runner.push_output("apt-get", 1, "", "E: lock held\n");

        let plugin = PackageCleanup::new(runner, Duration::from_secs(60));
        let outcome = plugin.run(&facts(PackageManager::Apt)).await;

        assert_eq!(outcome.status, ActionStatus::Failed);
        assert_eq!(
            outcome.findings[0].severity,
            crate::domain::Severity::Warning
        );
    }
}
