// Shared constants (no magic values)
use std::time::Duration;

/// Default per-step timeout. Generous on purpose: package upgrades and
/// recursive malware scans run for minutes, not seconds.
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(600);

/// Default management access port kept open by the firewall baseline
pub const DEFAULT_MGMT_PORT: u16 = 22;

/// Default report artifact path
pub const DEFAULT_REPORT_PATH: &str = "fh.txt";

/// How many trailing stderr lines a failure finding carries
pub const STDERR_TAIL_LINES: usize = 5;

/// Length of generated replacement credentials (alphanumeric chars)
pub const CREDENTIAL_LENGTH: usize = 32;

/// Skip reason recorded for steps behind a fatal failure
pub const ABORT_FATAL_REASON: &str = "aborted: prior fatal failure";

/// Skip reason recorded when the run is cancelled between steps
pub const ABORT_CANCELLED_REASON: &str = "aborted: cancellation requested";

/// Skip reason recorded for plugins excluded via --skip
pub const SKIP_REQUESTED_REASON: &str = "skipped by request";
