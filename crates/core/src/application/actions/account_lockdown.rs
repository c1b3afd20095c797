// AccountLockdown - disable non-essential interactive accounts
//
// Accounts are disabled, not deleted: password scrambled, login
// locked, shell replaced with a non-login shell. Reversible by root
// and auditable. The generated credential is never recorded anywhere,
// including findings and logs.

use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::application::constants::CREDENTIAL_LENGTH;
use crate::domain::{Capability, Criticality, Finding, StepOutcome, SystemFacts};
use crate::port::{ActionPlugin, CommandRunner, CommandSpec};

use super::interactive_accounts;

pub const NAME: &str = "account_lockdown";

const NOLOGIN_SHELL: &str = "/usr/sbin/nologin";

pub struct AccountLockdown {
    runner: Arc<dyn CommandRunner>,
    command_timeout: Duration,
}

impl AccountLockdown {
    pub fn new(runner: Arc<dyn CommandRunner>, command_timeout: Duration) -> Self {
        Self {
            runner,
            command_timeout,
        }
    }

    fn generate_credential() -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(CREDENTIAL_LENGTH)
            .map(char::from)
            .collect()
    }

    /// Scramble password, lock login, set non-login shell
    async fn disable_account(&self, account: &str) -> Result<(), String> {
        let credential = Self::generate_credential();
        let chpasswd = CommandSpec::new("chpasswd", &[], self.command_timeout)
            .with_stdin(format!("{}:{}\n", account, credential));
        drop(credential);

        let steps = [
            chpasswd,
            CommandSpec::new("usermod", &["-L", account], self.command_timeout),
            CommandSpec::new(
                "usermod",
                &["-s", NOLOGIN_SHELL, account],
                self.command_timeout,
            ),
        ];

        for spec in steps {
            match self.runner.run(&spec).await {
                Ok(output) if output.success() => {}
                Ok(output) => {
                    return Err(format!(
                        "{} exited with {:?}",
                        spec.program, output.exit_code
                    ))
                }
                Err(e) => return Err(e.to_string()),
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ActionPlugin for AccountLockdown {
    fn name(&self) -> &str {
        NAME
    }

    fn capabilities(&self) -> BTreeSet<Capability> {
        BTreeSet::from([Capability::AccountDatabase])
    }

    fn criticality(&self) -> Criticality {
        Criticality::BestEffort
    }

    async fn run(&self, facts: &SystemFacts) -> StepOutcome {
        let passwd_spec = CommandSpec::new("getent", &["passwd"], self.command_timeout);
        let passwd = match self.runner.run(&passwd_spec).await {
            Ok(output) if output.success() => output.stdout,
            Ok(output) => {
                return StepOutcome::failed(vec![Finding::warning(
                    NAME,
                    format!("getent passwd exited with {:?}", output.exit_code),
                )])
            }
            Err(e) => return StepOutcome::failed(vec![Finding::warning(NAME, e.to_string())]),
        };

        let targets: Vec<String> = interactive_accounts(&passwd)
            .into_iter()
            .map(|a| a.name)
            .filter(|name| name != "root" && name != &facts.invoking_user)
            .collect();

        if targets.is_empty() {
            return StepOutcome::success(vec![Finding::info(
                NAME,
                "no non-essential interactive accounts present",
            )]);
        }

        let mut findings = Vec::new();
        let mut failures = 0usize;

        for account in &targets {
            match self.disable_account(account).await {
                Ok(()) => {
                    info!(account = %account, "Interactive account disabled");
                    findings.push(Finding::warning(
                        NAME,
                        format!("account '{}' disabled (login locked, shell set to {})",
                            account, NOLOGIN_SHELL),
                    ));
                }
                Err(message) => {
                    warn!(account = %account, error = %message, "Account lockdown failed");
                    failures += 1;
                    findings.push(Finding::warning(
                        NAME,
                        format!("failed to disable account '{}': {}", account, message),
                    ));
                }
            }
        }

        if failures == targets.len() {
            StepOutcome::failed(findings)
        } else {
            StepOutcome::success(findings)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ActionStatus, DistroFamily, ScannerSet, Severity};
    use crate::port::command_runner::mocks::ScriptedCommandRunner;

    const PASSWD: &str = "\
root:x:0:0:root:/root:/bin/bash
daemon:x:1:1:daemon:/usr/sbin:/usr/sbin/nologin
alice:x:1000:1000::/home/alice:/bin/bash
bob:x:1001:1001::/home/bob:/bin/bash
";

    fn facts() -> SystemFacts {
        SystemFacts {
            distro_family: DistroFamily::Debian,
            package_manager: None,
            firewall_backend: None,
            invoking_user: "alice".to_string(),
            scanners: ScannerSet::default(),
            account_tools_present: true,
        }
    }

    #[tokio::test]
    async fn test_only_non_essential_accounts_are_locked() {
        let runner = Arc::new(ScriptedCommandRunner::new());
        runner.push_output("getent", 0, PASSWD, "");

        let plugin = AccountLockdown::new(runner.clone(), Duration::from_secs(30));
        let outcome = plugin.run(&facts()).await;

        assert_eq!(outcome.status, ActionStatus::Success);
        assert_eq!(outcome.findings.len(), 1);
        assert_eq!(outcome.findings[0].severity, Severity::Warning);
        assert!(outcome.findings[0].detail.contains("'bob'"));

        // root and the invoking user are never touched
        let usermod_calls = runner.calls_for("usermod");
        assert_eq!(usermod_calls.len(), 2);
        for call in &usermod_calls {
            assert!(call.args.contains(&"bob".to_string()));
            assert!(!call.args.contains(&"root".to_string()));
            assert!(!call.args.contains(&"alice".to_string()));
        }
    }

    #[tokio::test]
    async fn test_findings_never_contain_credential_material() {
        let runner = Arc::new(ScriptedCommandRunner::new());
        runner.push_output("getent", 0, PASSWD, "");

        let plugin = AccountLockdown::new(runner.clone(), Duration::from_secs(30));
        let outcome = plugin.run(&facts()).await;

        let chpasswd_calls = runner.calls_for("chpasswd");
        assert_eq!(chpasswd_calls.len(), 1);
        let credential_line = chpasswd_calls[0].stdin.as_ref().unwrap();
        let credential = credential_line
            .trim_end()
            .strip_prefix("bob:")
            .expect("chpasswd input is user:credential");
        assert_eq!(credential.len(), CREDENTIAL_LENGTH);

        for finding in &outcome.findings {
            assert!(!finding.detail.contains(credential));
        }
    }

    #[tokio::test]
    async fn test_no_targets_is_success() {
        let runner = Arc::new(ScriptedCommandRunner::new());
        runner.push_output(
            "getent",
            0,
            "root:x:0:0:root:/root:/bin/bash\nalice:x:1000:1000::/home/alice:/bin/bash\n",
            "",
        );

        let plugin = AccountLockdown::new(runner.clone(), Duration::from_secs(30));
        let outcome = plugin.run(&facts()).await;

        assert_eq!(outcome.status, ActionStatus::Success);
        assert!(runner.calls_for("usermod").is_empty());
    }

    #[tokio::test]
    async fn test_all_lockdowns_failing_marks_step_failed() {
        let runner = Arc::new(ScriptedCommandRunner::new());
        runner.push_output("getent", 0, PASSWD, "");
        runner.push_output("chpasswd", 1, "", "permission denied");

        let plugin = AccountLockdown::new(runner, Duration::from_secs(30));
        let outcome = plugin.run(&facts()).await;

        assert_eq!(outcome.status, ActionStatus::Failed);
        assert!(outcome.findings[0].detail.contains("failed to disable"));
    }
}
