// File report sink
// Append-only UTF-8 artifact, human-readable. Sections are delimited
// by fixed header lines; no machine-parsable schema is promised.

use chrono::{TimeZone, Utc};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;

use fortify_core::domain::{Finding, RunMetadata, RunSummary, StepRecord};
use fortify_core::port::report_sink::{ReportSink, ReportWriteError};

pub struct FileReportSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl FileReportSink {
    /// Open (or create) the report artifact in append mode. Repeated
    /// runs against the same path accumulate, never truncate.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, ReportWriteError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| ReportWriteError::Open {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        info!(path = %path.display(), "Report sink opened");
        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_line(&self, line: &str) -> Result<(), ReportWriteError> {
        let mut writer = self.writer.lock().unwrap();
        writeln!(writer, "{}", line).map_err(|e| ReportWriteError::Write(e.to_string()))
    }

    fn format_timestamp(millis: i64) -> String {
        Utc.timestamp_millis_opt(millis)
            .single()
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| millis.to_string())
    }
}

impl ReportSink for FileReportSink {
    fn begin(&self, metadata: &RunMetadata) -> Result<(), ReportWriteError> {
        self.write_line(&format!("=== fortify run {} ===", metadata.run_id))?;
        self.write_line(&format!(
            "started: {}",
            Self::format_timestamp(metadata.started_at_ms)
        ))?;
        self.write_line(&format!(
            "facts: distro={} package_manager={} firewall={} invoking_user={}",
            metadata.facts.distro_family,
            metadata
                .facts
                .package_manager
                .map(|pm| pm.binary())
                .unwrap_or("absent"),
            metadata
                .facts
                .firewall_backend
                .map(|fw| fw.binary())
                .unwrap_or("absent"),
            metadata.facts.invoking_user,
        ))
    }

    fn section(&self, title: &str) -> Result<(), ReportWriteError> {
        self.write_line(&format!("\n=== {} ===", title))
    }

    fn finding(&self, finding: &Finding) -> Result<(), ReportWriteError> {
        let mut lines = finding.detail.lines();
        let first = lines.next().unwrap_or("");
        self.write_line(&format!(
            "[{}] {}: {}",
            finding.severity, finding.subject, first
        ))?;
        for continuation in lines {
            self.write_line(&format!("       {}", continuation))?;
        }
        Ok(())
    }

    fn step_outcome(&self, record: &StepRecord) -> Result<(), ReportWriteError> {
        match &record.skip_reason {
            Some(reason) => self.write_line(&format!(
                "-- {}: {} ({})",
                record.plugin_name, record.status, reason
            )),
            None => self.write_line(&format!(
                "-- {}: {} in {}ms, {} finding(s)",
                record.plugin_name, record.status, record.duration_ms, record.finding_count
            )),
        }
    }

    fn finalize(&self, summary: &RunSummary) -> Result<(), ReportWriteError> {
        self.write_line("\n=== summary ===")?;
        self.write_line(&format!(
            "steps: {} succeeded, {} failed, {} skipped",
            summary.succeeded, summary.failed, summary.skipped
        ))?;
        self.write_line(&format!(
            "findings: {} info, {} warning, {} critical",
            summary.info_findings, summary.warning_findings, summary.critical_findings
        ))?;
        if summary.fatal_failure {
            self.write_line("result: ABORTED (fatal step failure)")?;
        } else {
            self.write_line("result: completed")?;
        }

        let mut writer = self.writer.lock().unwrap();
        writer
            .flush()
            .map_err(|e| ReportWriteError::Flush(e.to_string()))
    }
}
