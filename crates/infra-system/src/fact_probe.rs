// Filesystem fact probe
// Read-only inspection: parse the os-release identity file, then look
// for known package-manager, firewall and scanner executables on PATH.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use fortify_core::domain::{
    DistroFamily, FirewallBackend, PackageManager, ScannerSet, SystemFacts,
};
use fortify_core::port::probe::{FactProbe, ProbeError};

const OS_RELEASE_PATHS: &[&str] = &["etc/os-release", "usr/lib/os-release"];

/// Probes the live filesystem. `root` and `search_path` are
/// overridable so tests can point the probe at a fixture tree.
pub struct FileSystemProbe {
    root: PathBuf,
    search_path: Option<String>,
}

impl FileSystemProbe {
    pub fn new() -> Self {
        Self {
            root: PathBuf::from("/"),
            search_path: None,
        }
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn with_search_path(mut self, path: impl Into<String>) -> Self {
        self.search_path = Some(path.into());
        self
    }

    fn read_os_release(&self) -> Result<String, ProbeError> {
        for rel in OS_RELEASE_PATHS {
            let path = self.root.join(rel);
            if path.exists() {
                return fs::read_to_string(&path).map_err(|e| ProbeError::Io {
                    path: path.display().to_string(),
                    message: e.to_string(),
                });
            }
        }
        Err(ProbeError::NoOsIdentity)
    }

    /// Lowercased value of one os-release key, quotes stripped
    fn os_release_value(content: &str, key: &str) -> Option<String> {
        content.lines().find_map(|line| {
            let rest = line.strip_prefix(key)?.strip_prefix('=')?;
            Some(rest.trim().trim_matches('"').to_ascii_lowercase())
        })
    }

    fn family_for_id(id: &str) -> Option<DistroFamily> {
        match id {
            "debian" | "ubuntu" | "linuxmint" | "raspbian" | "kali" => Some(DistroFamily::Debian),
            "fedora" | "rhel" | "centos" | "rocky" | "almalinux" | "amzn" => {
                Some(DistroFamily::RedHat)
            }
            "arch" | "manjaro" | "endeavouros" => Some(DistroFamily::Arch),
            "opensuse" | "opensuse-leap" | "opensuse-tumbleweed" | "sles" | "suse" => {
                Some(DistroFamily::Suse)
            }
            "alpine" => Some(DistroFamily::Alpine),
            _ => None,
        }
    }

    fn detect_family(content: &str) -> DistroFamily {
        if let Some(id) = Self::os_release_value(content, "ID") {
            if let Some(family) = Self::family_for_id(&id) {
                return family;
            }
        }
        // Derivatives usually carry their parent in ID_LIKE
        if let Some(id_like) = Self::os_release_value(content, "ID_LIKE") {
            for token in id_like.split_whitespace() {
                if let Some(family) = Self::family_for_id(token) {
                    return family;
                }
            }
        }
        DistroFamily::Unknown
    }

    fn path_entries(&self) -> Vec<PathBuf> {
        let raw = match &self.search_path {
            Some(p) => p.clone(),
            None => std::env::var("PATH").unwrap_or_default(),
        };
        std::env::split_paths(&raw).collect()
    }

    fn find_executable(&self, name: &str) -> bool {
        self.path_entries().iter().any(|dir| is_executable(&dir.join(name)))
    }

    fn detect_package_manager(&self, family: DistroFamily) -> Option<PackageManager> {
        // Family-preferred order first, then anything recognizable
        let preferred: &[PackageManager] = match family {
            DistroFamily::Debian => &[PackageManager::Apt],
            DistroFamily::RedHat => &[PackageManager::Dnf, PackageManager::Yum],
            DistroFamily::Arch => &[PackageManager::Pacman],
            DistroFamily::Suse => &[PackageManager::Zypper],
            DistroFamily::Alpine => &[PackageManager::Apk],
            DistroFamily::Unknown => &[],
        };
        let all = [
            PackageManager::Apt,
            PackageManager::Dnf,
            PackageManager::Yum,
            PackageManager::Pacman,
            PackageManager::Zypper,
            PackageManager::Apk,
        ];

        preferred
            .iter()
            .chain(all.iter())
            .find(|pm| self.find_executable(pm.binary()))
            .copied()
    }

    fn detect_firewall_backend(&self) -> Option<FirewallBackend> {
        [
            FirewallBackend::Ufw,
            FirewallBackend::Firewalld,
            FirewallBackend::Iptables,
        ]
        .into_iter()
        .find(|backend| self.find_executable(backend.binary()))
    }

    fn invoking_user() -> String {
        if let Ok(sudo_user) = std::env::var("SUDO_USER") {
            if !sudo_user.is_empty() {
                return sudo_user;
            }
        }
        if let Ok(Some(user)) = nix::unistd::User::from_uid(nix::unistd::getuid()) {
            return user.name;
        }
        std::env::var("USER").unwrap_or_else(|_| "root".to_string())
    }
}

impl Default for FileSystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

fn is_executable(path: &Path) -> bool {
    fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

impl FactProbe for FileSystemProbe {
    fn detect(&self) -> Result<SystemFacts, ProbeError> {
        let os_release = self.read_os_release()?;
        let distro_family = Self::detect_family(&os_release);

        let facts = SystemFacts {
            distro_family,
            package_manager: self.detect_package_manager(distro_family),
            firewall_backend: self.detect_firewall_backend(),
            invoking_user: Self::invoking_user(),
            scanners: ScannerSet {
                clamscan: self.find_executable("clamscan"),
                freshclam: self.find_executable("freshclam"),
                rkhunter: self.find_executable("rkhunter"),
                chkrootkit: self.find_executable("chkrootkit"),
            },
            account_tools_present: self.find_executable("usermod")
                && self.find_executable("chpasswd"),
        };

        debug!(facts = ?facts, "Probe snapshot complete");
        info!(
            distro = %facts.distro_family,
            package_manager = ?facts.package_manager,
            firewall = ?facts.firewall_backend,
            "System facts detected"
        );
        Ok(facts)
    }
}
