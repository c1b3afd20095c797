// Built-in action plugins
// Every plugin drives external tools through the CommandRunner port
// and limits output handling to line-based marker matching.

pub mod account_lockdown;
pub mod enumeration;
pub mod firewall;
pub mod malware_scan;
pub mod package_cleanup;
pub mod package_update;

pub use account_lockdown::AccountLockdown;
pub use enumeration::SystemEnumeration;
pub use firewall::FirewallBaseline;
pub use malware_scan::MalwareScan;
pub use package_cleanup::PackageCleanup;
pub use package_update::PackageUpdate;

/// Shells that mark an account as interactive in passwd entries
pub(crate) const INTERACTIVE_SHELLS: &[&str] = &[
    "/bin/bash",
    "/bin/sh",
    "/bin/zsh",
    "/bin/ksh",
    "/bin/csh",
    "/bin/tcsh",
    "/bin/dash",
    "/bin/fish",
    "/usr/bin/bash",
    "/usr/bin/zsh",
    "/usr/bin/fish",
];

/// One local account parsed from a passwd line
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Account {
    pub name: String,
    pub shell: String,
}

/// Parse `getent passwd` output into the interactive-shell accounts
pub(crate) fn interactive_accounts(passwd: &str) -> Vec<Account> {
    passwd
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split(':').collect();
            if fields.len() < 7 {
                return None;
            }
            let shell = fields[6].trim();
            if INTERACTIVE_SHELLS.contains(&shell) {
                Some(Account {
                    name: fields[0].to_string(),
                    shell: shell.to_string(),
                })
            } else {
                None
            }
        })
        .collect()
}
