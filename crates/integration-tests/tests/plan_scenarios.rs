//! Full-stack plan scenarios: real built-in plugins, scripted command
//! runner, in-memory report sink.

use std::sync::Arc;
use std::time::Duration;

use fortify_core::application::actions::{
    AccountLockdown, FirewallBaseline, MalwareScan, PackageCleanup, PackageUpdate,
    SystemEnumeration,
};
use fortify_core::application::shutdown::AbortToken;
use fortify_core::application::{PlanBuilder, PlanExecutor, PluginRegistry};
use fortify_core::domain::{
    ActionStatus, DistroFamily, PackageManager, ScannerSet, SystemFacts,
};
use fortify_core::port::command_runner::mocks::ScriptedCommandRunner;
use fortify_core::port::report_sink::mocks::MemoryReportSink;
use fortify_core::port::time_provider::SystemTimeProvider;
use fortify_core::port::{CommandRunner, ReportSink};

const TIMEOUT: Duration = Duration::from_secs(5);

fn full_registry(runner: Arc<dyn CommandRunner>) -> PluginRegistry {
    let mut registry = PluginRegistry::new();
    registry.register(Arc::new(PackageUpdate::new(runner.clone(), TIMEOUT)));
    registry.register(Arc::new(PackageCleanup::new(runner.clone(), TIMEOUT)));
    registry.register(Arc::new(SystemEnumeration::new(runner.clone(), TIMEOUT)));
    registry.register(Arc::new(AccountLockdown::new(runner.clone(), TIMEOUT)));
    registry.register(Arc::new(FirewallBaseline::new(runner.clone(), TIMEOUT, 22)));
    registry.register(Arc::new(MalwareScan::new(runner, TIMEOUT, false)));
    registry
}

fn debian_no_firewall() -> SystemFacts {
    SystemFacts {
        distro_family: DistroFamily::Debian,
        package_manager: Some(PackageManager::Apt),
        firewall_backend: None,
        invoking_user: "alice".to_string(),
        scanners: ScannerSet::default(),
        account_tools_present: true,
    }
}

fn executor(sink: Arc<dyn ReportSink>, token: AbortToken) -> PlanExecutor {
    PlanExecutor::new(sink, Arc::new(SystemTimeProvider), TIMEOUT, token)
}

/// Scenario from the design: debian host with a package manager but no
/// firewall backend. PackageUpdate runs; FirewallBaseline is skipped
/// with the missing-capability reason; the run ends without a fatal
/// failure.
#[tokio::test]
async fn test_debian_without_firewall_backend() {
    let runner = Arc::new(ScriptedCommandRunner::new());
    let registry = full_registry(runner.clone());
    let facts = debian_no_firewall();

    let plan = PlanBuilder::build(&facts, &registry, &[]);

    let firewall_entry = plan
        .entries
        .iter()
        .find(|e| e.plugin_name == "firewall_baseline")
        .unwrap();
    assert!(!firewall_entry.included);
    assert_eq!(
        firewall_entry.skip_reason.as_deref(),
        Some("missing capability: firewall_backend")
    );
    // No scanner either, so malware_scan is also planned out
    assert!(plan
        .entries
        .iter()
        .find(|e| e.plugin_name == "malware_scan")
        .map(|e| !e.included)
        .unwrap());

    let sink = Arc::new(MemoryReportSink::new());
    let report = executor(sink, AbortToken::never())
        .execute(&plan, &registry, &facts)
        .await
        .unwrap();

    assert!(!report.summary().fatal_failure);
    let update = report
        .steps()
        .iter()
        .find(|s| s.plugin_name == "package_update")
        .unwrap();
    assert_eq!(update.status, ActionStatus::Success);
    assert!(runner.calls_for("ufw").is_empty());
    assert!(runner.calls_for("clamscan").is_empty());
}

/// A host with only rootkit checkers still gets malware_scan planned
/// in; the missing antivirus scanner is skipped inside the step.
#[tokio::test]
async fn test_rootkit_only_host_keeps_malware_scan_planned() {
    let runner = Arc::new(ScriptedCommandRunner::new());
    runner.push_output("rkhunter", 1, "Warning: Hidden file found\n", "");
    runner.push_output("chkrootkit", 0, "Checking `lkm'... nothing found\n", "");

    let registry = full_registry(runner.clone());
    let mut facts = debian_no_firewall();
    facts.scanners = ScannerSet {
        clamscan: false,
        freshclam: false,
        rkhunter: true,
        chkrootkit: true,
    };

    let plan = PlanBuilder::build(&facts, &registry, &[]);
    let scan_entry = plan
        .entries
        .iter()
        .find(|e| e.plugin_name == "malware_scan")
        .unwrap();
    assert!(scan_entry.included);

    let sink = Arc::new(MemoryReportSink::new());
    let report = executor(sink, AbortToken::never())
        .execute(&plan, &registry, &facts)
        .await
        .unwrap();

    let scan = report
        .steps()
        .iter()
        .find(|s| s.plugin_name == "malware_scan")
        .unwrap();
    assert_eq!(scan.status, ActionStatus::Success);
    assert!(runner.calls_for("clamscan").is_empty());
    assert_eq!(runner.calls_for("rkhunter").len(), 1);
}

/// Plan construction is deterministic for a fixed (facts, registry) pair
#[tokio::test]
async fn test_full_registry_plan_is_deterministic() {
    let runner = Arc::new(ScriptedCommandRunner::new());
    let registry = full_registry(runner);
    let facts = debian_no_firewall();

    let first = PlanBuilder::build(&facts, &registry, &[]);
    for _ in 0..5 {
        assert_eq!(first.entries, PlanBuilder::build(&facts, &registry, &[]).entries);
    }
}

/// Fatal package-update failure halts everything behind it
#[tokio::test]
async fn test_fatal_update_failure_aborts_plan() {
    let runner = Arc::new(ScriptedCommandRunner::new());
    // apt-get update fails hard
    runner.push_output("apt-get", 100, "", "E: unable to fetch\n");

    let registry = full_registry(runner.clone());
    let facts = debian_no_firewall();
    let plan = PlanBuilder::build(&facts, &registry, &[]);

    let sink = Arc::new(MemoryReportSink::new());
    let report = executor(sink, AbortToken::never())
        .execute(&plan, &registry, &facts)
        .await
        .unwrap();

    assert!(report.summary().fatal_failure);
    // Nothing after package_update was invoked
    assert!(runner.calls_for("getent").is_empty());
    assert!(runner.calls_for("usermod").is_empty());
    for step in report.steps().iter().skip(1) {
        if step.skip_reason.is_some() {
            assert!(
                step.skip_reason.as_deref() == Some("aborted: prior fatal failure")
                    || step.skip_reason.as_deref().unwrap().starts_with("missing capability")
            );
        }
    }
}

/// --skip requests surface in the plan and suppress invocation
#[tokio::test]
async fn test_skip_flag_suppresses_plugin() {
    let runner = Arc::new(ScriptedCommandRunner::new());
    let registry = full_registry(runner.clone());
    let facts = debian_no_firewall();

    let plan = PlanBuilder::build(&facts, &registry, &["account_lockdown".to_string()]);

    let sink = Arc::new(MemoryReportSink::new());
    executor(sink, AbortToken::never())
        .execute(&plan, &registry, &facts)
        .await
        .unwrap();

    assert!(runner.calls_for("usermod").is_empty());
    assert!(runner.calls_for("chpasswd").is_empty());
}

/// Lockdown scenario: root and the invoking user survive, bob does not
#[tokio::test]
async fn test_account_lockdown_spares_root_and_invoker() {
    let runner = Arc::new(ScriptedCommandRunner::new());
    runner.push_output("getent", 0, "", ""); // enumeration: passwd
    runner.push_output("getent", 0, "", ""); // enumeration: group
    runner.push_output(
        "getent",
        0,
        "root:x:0:0:root:/root:/bin/bash\n\
         alice:x:1000:1000::/home/alice:/bin/bash\n\
         bob:x:1001:1001::/home/bob:/bin/bash\n",
        "",
    ); // lockdown: passwd

    let registry = full_registry(runner.clone());
    let facts = debian_no_firewall();
    let plan = PlanBuilder::build(&facts, &registry, &[]);

    let sink = Arc::new(MemoryReportSink::new());
    executor(sink.clone(), AbortToken::never())
        .execute(&plan, &registry, &facts)
        .await
        .unwrap();

    let locked: Vec<String> = runner
        .calls_for("usermod")
        .iter()
        .map(|c| c.args.last().unwrap().clone())
        .collect();
    assert!(locked.iter().all(|account| account == "bob"));

    let lockdown_findings: Vec<_> = sink
        .findings()
        .into_iter()
        .filter(|f| f.subject == "account_lockdown")
        .collect();
    assert_eq!(lockdown_findings.len(), 1);
    assert!(lockdown_findings[0].detail.contains("'bob'"));
}
