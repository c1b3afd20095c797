// SystemEnumeration - read-only snapshot of host state
// One info finding per category; enumeration problems degrade to
// warnings instead of failing the plan.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::{Capability, Criticality, Finding, StepOutcome, SystemFacts};
use crate::port::{ActionPlugin, CommandRunner, CommandSpec};

use super::interactive_accounts;

pub const NAME: &str = "system_enumeration";

/// Finding subjects, one per report category
pub const CATEGORY_HOSTNAME: &str = "hostname";
pub const CATEGORY_OS: &str = "os_identity";
pub const CATEGORY_INTERFACES: &str = "interfaces";
pub const CATEGORY_SOCKETS: &str = "listening_sockets";
pub const CATEGORY_USERS: &str = "interactive_users";
pub const CATEGORY_GROUPS: &str = "groups";

pub struct SystemEnumeration {
    runner: Arc<dyn CommandRunner>,
    command_timeout: Duration,
}

impl SystemEnumeration {
    pub fn new(runner: Arc<dyn CommandRunner>, command_timeout: Duration) -> Self {
        Self {
            runner,
            command_timeout,
        }
    }

    /// Run one enumeration command; stdout becomes the finding detail
    async fn capture(&self, category: &str, program: &str, args: &[&str]) -> Finding {
        let spec = CommandSpec::new(program, args, self.command_timeout);
        match self.runner.run(&spec).await {
            Ok(output) if output.success() => {
                Finding::info(category, output.stdout.trim_end().to_string())
            }
            Ok(output) => Finding::warning(
                category,
                format!("{} exited with {:?}", program, output.exit_code),
            ),
            Err(e) => Finding::warning(category, e.to_string()),
        }
    }
}

#[async_trait]
impl ActionPlugin for SystemEnumeration {
    fn name(&self) -> &str {
        NAME
    }

    // Pure observation, runs on any host
    fn capabilities(&self) -> BTreeSet<Capability> {
        BTreeSet::new()
    }

    fn criticality(&self) -> Criticality {
        Criticality::BestEffort
    }

    async fn run(&self, facts: &SystemFacts) -> StepOutcome {
        let mut findings = Vec::new();

        findings.push(self.capture(CATEGORY_HOSTNAME, "hostname", &[]).await);
        findings.push(Finding::info(
            CATEGORY_OS,
            format!("distro family: {}", facts.distro_family),
        ));
        findings.push(
            self.capture(CATEGORY_INTERFACES, "ip", &["-brief", "addr"])
                .await,
        );
        findings.push(self.capture(CATEGORY_SOCKETS, "ss", &["-tuln"]).await);

        // Interactive users need filtering, not raw getent output
        let passwd_spec = CommandSpec::new("getent", &["passwd"], self.command_timeout);
        match self.runner.run(&passwd_spec).await {
            Ok(output) if output.success() => {
                let users: Vec<String> = interactive_accounts(&output.stdout)
                    .into_iter()
                    .map(|a| format!("{} ({})", a.name, a.shell))
                    .collect();
                findings.push(Finding::info(CATEGORY_USERS, users.join("\n")));
            }
            Ok(output) => findings.push(Finding::warning(
                CATEGORY_USERS,
                format!("getent passwd exited with {:?}", output.exit_code),
            )),
            Err(e) => findings.push(Finding::warning(CATEGORY_USERS, e.to_string())),
        }

        findings.push(self.capture(CATEGORY_GROUPS, "getent", &["group"]).await);

        StepOutcome::success(findings)
    }
}
