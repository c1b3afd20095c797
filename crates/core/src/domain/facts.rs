// System facts - immutable snapshot of the probed environment

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Distribution family, detected from the OS identity file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistroFamily {
    Debian,
    RedHat,
    Arch,
    Suse,
    Alpine,
    Unknown,
}

impl std::fmt::Display for DistroFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DistroFamily::Debian => write!(f, "debian"),
            DistroFamily::RedHat => write!(f, "redhat"),
            DistroFamily::Arch => write!(f, "arch"),
            DistroFamily::Suse => write!(f, "suse"),
            DistroFamily::Alpine => write!(f, "alpine"),
            DistroFamily::Unknown => write!(f, "unknown"),
        }
    }
}

/// Package manager families the action plugins know how to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageManager {
    Apt,
    Dnf,
    Yum,
    Pacman,
    Zypper,
    Apk,
}

impl PackageManager {
    /// Executable probed for on PATH
    pub fn binary(&self) -> &'static str {
        match self {
            PackageManager::Apt => "apt-get",
            PackageManager::Dnf => "dnf",
            PackageManager::Yum => "yum",
            PackageManager::Pacman => "pacman",
            PackageManager::Zypper => "zypper",
            PackageManager::Apk => "apk",
        }
    }

    /// Index refresh command, if the family separates refresh from upgrade
    pub fn refresh_args(&self) -> Option<Vec<&'static str>> {
        match self {
            PackageManager::Apt => Some(vec!["apt-get", "update"]),
            PackageManager::Dnf => None,
            PackageManager::Yum => None,
            PackageManager::Pacman => None, // -Syu refreshes and upgrades in one step
            PackageManager::Zypper => Some(vec!["zypper", "--non-interactive", "refresh"]),
            PackageManager::Apk => Some(vec!["apk", "update"]),
        }
    }

    /// Non-interactive full upgrade command
    pub fn upgrade_args(&self) -> Vec<&'static str> {
        match self {
            PackageManager::Apt => vec!["apt-get", "-y", "upgrade"],
            PackageManager::Dnf => vec!["dnf", "-y", "upgrade"],
            PackageManager::Yum => vec!["yum", "-y", "update"],
            PackageManager::Pacman => vec!["pacman", "-Syu", "--noconfirm"],
            PackageManager::Zypper => vec!["zypper", "--non-interactive", "update"],
            PackageManager::Apk => vec!["apk", "upgrade"],
        }
    }

    /// Orphan/cache cleanup command. Pacman is a two-step sequence
    /// (query orphans, then remove them) handled by the cleanup plugin.
    pub fn cleanup_args(&self) -> Vec<&'static str> {
        match self {
            PackageManager::Apt => vec!["apt-get", "-y", "autoremove", "--purge"],
            PackageManager::Dnf => vec!["dnf", "-y", "autoremove"],
            PackageManager::Yum => vec!["yum", "-y", "autoremove"],
            PackageManager::Pacman => vec!["pacman", "-Qtdq"],
            PackageManager::Zypper => vec!["zypper", "--non-interactive", "clean", "--all"],
            PackageManager::Apk => vec!["apk", "cache", "clean"],
        }
    }
}

/// Firewall control backends the baseline plugin can drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FirewallBackend {
    Ufw,
    Firewalld,
    Iptables,
}

impl FirewallBackend {
    pub fn binary(&self) -> &'static str {
        match self {
            FirewallBackend::Ufw => "ufw",
            FirewallBackend::Firewalld => "firewall-cmd",
            FirewallBackend::Iptables => "iptables",
        }
    }
}

/// Which malware/rootkit scanners were found on PATH
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerSet {
    pub clamscan: bool,
    pub freshclam: bool,
    pub rkhunter: bool,
    pub chkrootkit: bool,
}

impl ScannerSet {
    pub fn has_rootkit_checker(&self) -> bool {
        self.rkhunter || self.chkrootkit
    }

    /// At least one scanner is present. freshclam alone does not
    /// count; it only refreshes signatures for clamscan.
    pub fn any(&self) -> bool {
        self.clamscan || self.has_rootkit_checker()
    }
}

/// Named environmental fact a plugin may require.
///
/// `Display` output is used verbatim in plan skip reasons
/// ("missing capability: firewall_backend").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    PackageManager,
    FirewallBackend,
    AccountDatabase,
    MalwareScanner,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::PackageManager => write!(f, "package_manager"),
            Capability::FirewallBackend => write!(f, "firewall_backend"),
            Capability::AccountDatabase => write!(f, "account_database"),
            Capability::MalwareScanner => write!(f, "malware_scanner"),
        }
    }
}

/// Immutable point-in-time snapshot of the host environment.
///
/// Created once at startup by the fact probe and passed by reference
/// into every plugin invocation; never refreshed mid-run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemFacts {
    pub distro_family: DistroFamily,
    pub package_manager: Option<PackageManager>,
    pub firewall_backend: Option<FirewallBackend>,
    pub invoking_user: String,
    pub scanners: ScannerSet,
    pub account_tools_present: bool,
}

impl SystemFacts {
    /// Capabilities derivable from this snapshot, used by the plan
    /// builder for the capability subset test
    pub fn derived_capabilities(&self) -> BTreeSet<Capability> {
        let mut caps = BTreeSet::new();
        if self.package_manager.is_some() {
            caps.insert(Capability::PackageManager);
        }
        if self.firewall_backend.is_some() {
            caps.insert(Capability::FirewallBackend);
        }
        if self.account_tools_present {
            caps.insert(Capability::AccountDatabase);
        }
        if self.scanners.any() {
            caps.insert(Capability::MalwareScanner);
        }
        caps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn debian_facts() -> SystemFacts {
        SystemFacts {
            distro_family: DistroFamily::Debian,
            package_manager: Some(PackageManager::Apt),
            firewall_backend: None,
            invoking_user: "alice".to_string(),
            scanners: ScannerSet::default(),
            account_tools_present: true,
        }
    }

    #[test]
    fn test_derived_capabilities_reflect_present_tools() {
        let caps = debian_facts().derived_capabilities();

        assert!(caps.contains(&Capability::PackageManager));
        assert!(caps.contains(&Capability::AccountDatabase));
        assert!(!caps.contains(&Capability::FirewallBackend));
        assert!(!caps.contains(&Capability::MalwareScanner));
    }

    #[test]
    fn test_capability_display_is_snake_case() {
        assert_eq!(Capability::FirewallBackend.to_string(), "firewall_backend");
        assert_eq!(Capability::PackageManager.to_string(), "package_manager");
    }

    #[test]
    fn test_any_scanner_derives_malware_scanner() {
        let mut facts = debian_facts();
        assert!(!facts
            .derived_capabilities()
            .contains(&Capability::MalwareScanner));

        // rootkit checkers count even without clamscan
        facts.scanners.chkrootkit = true;
        assert!(facts
            .derived_capabilities()
            .contains(&Capability::MalwareScanner));
    }

    #[test]
    fn test_freshclam_alone_is_not_a_scanner() {
        let mut facts = debian_facts();
        facts.scanners.freshclam = true;
        assert!(!facts
            .derived_capabilities()
            .contains(&Capability::MalwareScanner));
    }
}
