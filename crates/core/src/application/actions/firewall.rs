// FirewallBaseline - default-deny inbound, allow outbound, keep the
// management port reachable, then enable enforcement

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::application::constants::STDERR_TAIL_LINES;
use crate::domain::{Capability, Criticality, Finding, FirewallBackend, StepOutcome, SystemFacts};
use crate::port::{ActionPlugin, CommandRunner, CommandSpec};

pub const NAME: &str = "firewall_baseline";

/// Applies the baseline policy through whichever backend the probe
/// found. Fatal: a host left without its intended firewall posture is
/// a worse outcome than stopping the run.
pub struct FirewallBaseline {
    runner: Arc<dyn CommandRunner>,
    command_timeout: Duration,
    mgmt_port: u16,
}

impl FirewallBaseline {
    pub fn new(runner: Arc<dyn CommandRunner>, command_timeout: Duration, mgmt_port: u16) -> Self {
        Self {
            runner,
            command_timeout,
            mgmt_port,
        }
    }

    /// Backend-specific command sequence, in apply order. For iptables
    /// the allow rules are appended before the INPUT policy flips to
    /// DROP, so an interrupted apply cannot sever the management path.
    fn command_sequence(&self, backend: FirewallBackend) -> Vec<(String, Vec<String>)> {
        let port = self.mgmt_port.to_string();
        let own = |program: &str, args: &[&str]| {
            (
                program.to_string(),
                args.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
            )
        };

        match backend {
            FirewallBackend::Ufw => vec![
                own("ufw", &["default", "deny", "incoming"]),
                own("ufw", &["default", "allow", "outgoing"]),
                own("ufw", &["allow", &format!("{}/tcp", port)]),
                own("ufw", &["--force", "enable"]),
            ],
            FirewallBackend::Firewalld => vec![
                own(
                    "firewall-cmd",
                    &[
                        "--permanent",
                        "--zone=drop",
                        &format!("--add-port={}/tcp", port),
                    ],
                ),
                own("firewall-cmd", &["--set-default-zone=drop"]),
                own("firewall-cmd", &["--reload"]),
            ],
            FirewallBackend::Iptables => vec![
                own("iptables", &["-A", "INPUT", "-i", "lo", "-j", "ACCEPT"]),
                own(
                    "iptables",
                    &[
                        "-A",
                        "INPUT",
                        "-m",
                        "conntrack",
                        "--ctstate",
                        "ESTABLISHED,RELATED",
                        "-j",
                        "ACCEPT",
                    ],
                ),
                own(
                    "iptables",
                    &["-A", "INPUT", "-p", "tcp", "--dport", &port, "-j", "ACCEPT"],
                ),
                own("iptables", &["-P", "OUTPUT", "ACCEPT"]),
                own("iptables", &["-P", "INPUT", "DROP"]),
            ],
        }
    }
}

#[async_trait]
impl ActionPlugin for FirewallBaseline {
    fn name(&self) -> &str {
        NAME
    }

    fn capabilities(&self) -> BTreeSet<Capability> {
        BTreeSet::from([Capability::FirewallBackend])
    }

    fn criticality(&self) -> Criticality {
        Criticality::FatalOnFailure
    }

    async fn run(&self, facts: &SystemFacts) -> StepOutcome {
        let Some(backend) = facts.firewall_backend else {
            return StepOutcome::failed(vec![Finding::critical(
                NAME,
                "no supported firewall backend in facts snapshot",
            )]);
        };

        for (program, args) in self.command_sequence(backend) {
            let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
            let spec = CommandSpec::new(program.as_str(), &arg_refs, self.command_timeout);
            match self.runner.run(&spec).await {
                Ok(output) if output.success() => {}
                Ok(output) => {
                    return StepOutcome::failed(vec![Finding::critical(
                        NAME,
                        format!(
                            "{} {} exited with {:?}: {}",
                            program,
                            args.join(" "),
                            output.exit_code,
                            output.stderr_tail(STDERR_TAIL_LINES)
                        ),
                    )])
                }
                Err(e) => return StepOutcome::failed(vec![Finding::critical(NAME, e.to_string())]),
            }
        }

        info!(backend = %backend.binary(), mgmt_port = self.mgmt_port, "Firewall baseline applied");
        StepOutcome::success(vec![Finding::info(
            NAME,
            format!(
                "default deny inbound / allow outbound via {}, port {}/tcp kept open",
                backend.binary(),
                self.mgmt_port
            ),
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ActionStatus, DistroFamily, ScannerSet, Severity};
    use crate::port::command_runner::mocks::ScriptedCommandRunner;

    fn facts(backend: FirewallBackend) -> SystemFacts {
        SystemFacts {
            distro_family: DistroFamily::Debian,
            package_manager: None,
            firewall_backend: Some(backend),
            invoking_user: "alice".to_string(),
            scanners: ScannerSet::default(),
            account_tools_present: true,
        }
    }

    #[tokio::test]
    async fn test_ufw_sequence_ends_with_enable() {
        let runner = Arc::new(ScriptedCommandRunner::new());
        let plugin = FirewallBaseline::new(runner.clone(), Duration::from_secs(30), 22);

        let outcome = plugin.run(&facts(FirewallBackend::Ufw)).await;
        assert_eq!(outcome.status, ActionStatus::Success);

        let calls = runner.calls_for("ufw");
        assert_eq!(calls.len(), 4);
        assert_eq!(calls[0].args, vec!["default", "deny", "incoming"]);
        assert_eq!(calls[2].args, vec!["allow", "22/tcp"]);
        assert_eq!(calls[3].args, vec!["--force", "enable"]);
    }

    #[tokio::test]
    async fn test_iptables_allows_mgmt_port_before_drop_policy() {
        let runner = Arc::new(ScriptedCommandRunner::new());
        let plugin = FirewallBaseline::new(runner.clone(), Duration::from_secs(30), 2222);

        let outcome = plugin.run(&facts(FirewallBackend::Iptables)).await;
        assert_eq!(outcome.status, ActionStatus::Success);

        let calls = runner.calls_for("iptables");
        let allow_idx = calls
            .iter()
            .position(|c| c.args.contains(&"2222".to_string()))
            .unwrap();
        let drop_idx = calls
            .iter()
            .position(|c| c.args == vec!["-P", "INPUT", "DROP"])
            .unwrap();
        assert!(allow_idx < drop_idx);
    }

    #[tokio::test]
    async fn test_backend_failure_is_critical() {
        let runner = Arc::new(ScriptedCommandRunner::new());
        runner.push_output("ufw", 1, "", "ERROR: problem running ufw\n");

        let plugin = FirewallBaseline::new(runner, Duration::from_secs(30), 22);
        let outcome = plugin.run(&facts(FirewallBackend::Ufw)).await;

        assert_eq!(outcome.status, ActionStatus::Failed);
        assert_eq!(outcome.findings[0].severity, Severity::Critical);
        assert!(outcome.findings[0].detail.contains("problem running ufw"));
    }
}
