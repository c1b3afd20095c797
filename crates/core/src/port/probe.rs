// Fact Probe Port
// Read-only environment inspection producing the SystemFacts snapshot

use thiserror::Error;

use crate::domain::SystemFacts;

/// Probe errors. The only fatal case is a missing OS identity file:
/// without it there is no sensible way to select a package manager.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("No OS identity file found (looked for os-release)")]
    NoOsIdentity,

    #[error("IO error reading {path}: {message}")]
    Io { path: String, message: String },
}

/// Fact Probe trait
///
/// Idempotent and side-effect free; the returned facts are a
/// point-in-time snapshot, never refreshed mid-run.
pub trait FactProbe: Send + Sync {
    fn detect(&self) -> Result<SystemFacts, ProbeError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::domain::{DistroFamily, FirewallBackend, PackageManager, ScannerSet};

    /// Fixed-facts probe for tests
    pub struct FixedFactProbe {
        facts: SystemFacts,
    }

    impl FixedFactProbe {
        pub fn new(facts: SystemFacts) -> Self {
            Self { facts }
        }

        /// A fully-tooled debian host, the common test baseline
        pub fn debian_full() -> Self {
            Self::new(SystemFacts {
                distro_family: DistroFamily::Debian,
                package_manager: Some(PackageManager::Apt),
                firewall_backend: Some(FirewallBackend::Ufw),
                invoking_user: "alice".to_string(),
                scanners: ScannerSet {
                    clamscan: true,
                    freshclam: true,
                    rkhunter: true,
                    chkrootkit: true,
                },
                account_tools_present: true,
            })
        }
    }

    impl FactProbe for FixedFactProbe {
        fn detect(&self) -> Result<SystemFacts, ProbeError> {
            Ok(self.facts.clone())
        }
    }

    /// Probe that always fails, for exit-code tests
    pub struct FailingFactProbe;

    impl FactProbe for FailingFactProbe {
        fn detect(&self) -> Result<SystemFacts, ProbeError> {
            Err(ProbeError::NoOsIdentity)
        }
    }
}
