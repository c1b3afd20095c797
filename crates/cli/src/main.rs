//! Fortify - Linux host-hardening orchestrator
//!
//! Probes the host once, builds a capability-filtered execution plan
//! over the registered action plugins, runs it sequentially, and
//! persists every finding to the report artifact.

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tabled::{Table, Tabled};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fortify_core::application::actions::{
    AccountLockdown, FirewallBaseline, MalwareScan, PackageCleanup, PackageUpdate,
    SystemEnumeration,
};
use fortify_core::application::constants::{
    DEFAULT_MGMT_PORT, DEFAULT_REPORT_PATH, DEFAULT_STEP_TIMEOUT,
};
use fortify_core::application::{abort_channel, PlanBuilder, PlanExecutor, PluginRegistry};
use fortify_core::domain::{ExecutionPlan, RunReport, SystemFacts};
use fortify_core::port::probe::FactProbe;
use fortify_core::port::time_provider::SystemTimeProvider;
use fortify_core::port::CommandRunner;
use fortify_infra_system::{FileReportSink, FileSystemProbe, SubprocessRunner};

const VERSION: &str = env!("CARGO_PKG_VERSION");

// Exit codes: 0 = completed without fatal failure, 1 = fatal step or
// report write failure, 2 = probe failure
const EXIT_FATAL: u8 = 1;
const EXIT_PROBE: u8 = 2;

#[derive(Parser)]
#[command(name = "fortify")]
#[command(about = "Linux host hardening and enumeration orchestrator", long_about = None)]
#[command(version)]
struct Cli {
    /// Build and print the plan without executing it
    #[arg(long)]
    dry_run: bool,

    /// Exclude a plugin from the plan (repeatable)
    #[arg(long = "skip", value_name = "PLUGIN")]
    skip: Vec<String>,

    /// Report artifact path
    #[arg(long, env = "FORTIFY_REPORT_PATH", default_value = DEFAULT_REPORT_PATH)]
    report_path: String,

    /// Per-step timeout in seconds
    #[arg(long, default_value_t = DEFAULT_STEP_TIMEOUT.as_secs())]
    timeout_seconds: u64,

    /// Management access port kept open by the firewall baseline
    #[arg(long, default_value_t = DEFAULT_MGMT_PORT)]
    mgmt_port: u16,

    /// Delete infected files during the malware scan (irreversible;
    /// default is report-only)
    #[arg(long)]
    remove_infected: bool,
}

#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "step")]
    step: String,
    #[tabled(rename = "included")]
    included: bool,
    #[tabled(rename = "reason")]
    reason: String,
}

#[derive(Tabled)]
struct StepRow {
    #[tabled(rename = "step")]
    step: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "duration_ms")]
    duration_ms: i64,
    #[tabled(rename = "note")]
    note: String,
}

fn init_logging() {
    let log_format = std::env::var("FORTIFY_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("fortify=info"))
        .expect("Failed to create env filter");

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }
}

/// Register the built-in plugins. Registration order is plan order:
/// patch first, observe, then lock down, firewall last before the
/// long-running scans.
fn build_registry(cli: &Cli, runner: Arc<dyn CommandRunner>, timeout: Duration) -> PluginRegistry {
    let mut registry = PluginRegistry::new();
    registry.register(Arc::new(PackageUpdate::new(runner.clone(), timeout)));
    registry.register(Arc::new(PackageCleanup::new(runner.clone(), timeout)));
    registry.register(Arc::new(SystemEnumeration::new(runner.clone(), timeout)));
    registry.register(Arc::new(AccountLockdown::new(runner.clone(), timeout)));
    registry.register(Arc::new(FirewallBaseline::new(
        runner.clone(),
        timeout,
        cli.mgmt_port,
    )));
    registry.register(Arc::new(MalwareScan::new(
        runner,
        timeout,
        cli.remove_infected,
    )));
    registry
}

fn print_plan(plan: &ExecutionPlan) {
    let rows: Vec<PlanRow> = plan
        .entries
        .iter()
        .map(|entry| PlanRow {
            step: entry.plugin_name.clone(),
            included: entry.included,
            reason: entry.skip_reason.clone().unwrap_or_default(),
        })
        .collect();
    println!("{}", Table::new(rows));
}

fn print_summary(report: &RunReport, report_path: &str) {
    let rows: Vec<StepRow> = report
        .steps()
        .iter()
        .map(|record| StepRow {
            step: record.plugin_name.clone(),
            status: record.status.to_string(),
            duration_ms: record.duration_ms,
            note: record.skip_reason.clone().unwrap_or_default(),
        })
        .collect();
    println!("{}", Table::new(rows));

    let summary = report.summary();
    println!(
        "{} succeeded, {} failed, {} skipped",
        summary.succeeded.to_string().green(),
        summary.failed.to_string().red(),
        summary.skipped.to_string().yellow(),
    );
    println!(
        "findings: {} info, {} warning, {} critical",
        summary.info_findings,
        summary.warning_findings.to_string().yellow(),
        summary.critical_findings.to_string().red(),
    );
    if summary.fatal_failure {
        println!("{}", "run aborted after fatal step failure".red().bold());
    }
    println!("report written to {}", report_path.bold());
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let cli = Cli::parse();
    info!("fortify v{} starting", VERSION);

    // Probe once; the snapshot is never refreshed mid-run
    let probe = FileSystemProbe::new();
    let facts = match probe.detect() {
        Ok(facts) => facts,
        Err(e) => {
            error!(error = %e, "Cannot establish system facts");
            eprintln!("{} {}", "probe failed:".red().bold(), e);
            return ExitCode::from(EXIT_PROBE);
        }
    };

    if !nix::unistd::geteuid().is_root() && !cli.dry_run {
        warn!("Not running as root; most hardening steps will fail");
    }

    let timeout = Duration::from_secs(cli.timeout_seconds);
    let time_provider = Arc::new(SystemTimeProvider);
    let runner: Arc<dyn CommandRunner> = Arc::new(SubprocessRunner::new(time_provider.clone()));
    let registry = build_registry(&cli, runner, timeout);

    let plan = PlanBuilder::build(&facts, &registry, &cli.skip);

    if cli.dry_run {
        println!("{}", "execution plan (dry run)".bold());
        print_plan(&plan);
        return ExitCode::SUCCESS;
    }

    let report = match run_plan(&cli, &plan, &registry, &facts, time_provider, timeout).await {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "Run failed");
            eprintln!("{} {:#}", "run failed:".red().bold(), e);
            return ExitCode::from(EXIT_FATAL);
        }
    };

    print_summary(&report, &cli.report_path);

    if report.summary().fatal_failure {
        ExitCode::from(EXIT_FATAL)
    } else {
        ExitCode::SUCCESS
    }
}

async fn run_plan(
    cli: &Cli,
    plan: &ExecutionPlan,
    registry: &PluginRegistry,
    facts: &SystemFacts,
    time_provider: Arc<SystemTimeProvider>,
    timeout: Duration,
) -> anyhow::Result<RunReport> {
    let sink = Arc::new(
        FileReportSink::create(&cli.report_path)
            .with_context(|| format!("cannot open report artifact at {}", cli.report_path))?,
    );

    // Ctrl-C cancels between steps; the running step is never interrupted
    let (abort_tx, abort_token) = abort_channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Cancellation requested, finishing current step");
            abort_tx.abort();
        }
    });

    let executor = PlanExecutor::new(sink, time_provider, timeout, abort_token);
    let report = executor
        .execute(plan, registry, facts)
        .await
        .context("plan execution failed")?;
    Ok(report)
}
