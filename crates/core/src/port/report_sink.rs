// Report Sink Port
// Append-only persistence of run findings. The executor is the sink's
// only writer; sequential step execution is what makes the unguarded
// append contract safe.

use thiserror::Error;

use crate::domain::{Finding, RunMetadata, RunSummary, StepRecord};

/// Report persistence errors. Fatal: a hardening run whose findings
/// are lost has no value.
#[derive(Error, Debug)]
pub enum ReportWriteError {
    #[error("Cannot open report at {path}: {message}")]
    Open { path: String, message: String },

    #[error("Write failed: {0}")]
    Write(String),

    #[error("Flush failed: {0}")]
    Flush(String),
}

/// Report Sink trait
///
/// Implementations:
/// - FileReportSink: UTF-8 text artifact (infra-system)
/// - MemoryReportSink: in-memory capture for tests
pub trait ReportSink: Send + Sync {
    /// Write run metadata at the top of the artifact
    fn begin(&self, metadata: &RunMetadata) -> Result<(), ReportWriteError>;

    /// Write a fixed section header line
    fn section(&self, title: &str) -> Result<(), ReportWriteError>;

    /// Append one finding under the current section
    fn finding(&self, finding: &Finding) -> Result<(), ReportWriteError>;

    /// Append one step outcome line
    fn step_outcome(&self, record: &StepRecord) -> Result<(), ReportWriteError>;

    /// Write the summary and flush. The artifact is never written to
    /// again after this returns.
    fn finalize(&self, summary: &RunSummary) -> Result<(), ReportWriteError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// What the sink received, in order
    #[derive(Debug, Clone, PartialEq)]
    pub enum SinkEvent {
        Begin(String),
        Section(String),
        Finding(Finding),
        StepOutcome(String),
        Finalize(RunSummary),
    }

    /// In-memory sink capturing every event for assertions
    #[derive(Default)]
    pub struct MemoryReportSink {
        events: Mutex<Vec<SinkEvent>>,
        fail_writes: bool,
    }

    impl MemoryReportSink {
        pub fn new() -> Self {
            Self::default()
        }

        /// Sink whose writes always fail, for ReportWriteError paths
        pub fn failing() -> Self {
            Self {
                events: Mutex::new(Vec::new()),
                fail_writes: true,
            }
        }

        pub fn events(&self) -> Vec<SinkEvent> {
            self.events.lock().unwrap().clone()
        }

        pub fn findings(&self) -> Vec<Finding> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter_map(|e| match e {
                    SinkEvent::Finding(f) => Some(f.clone()),
                    _ => None,
                })
                .collect()
        }

        fn push(&self, event: SinkEvent) -> Result<(), ReportWriteError> {
            if self.fail_writes {
                return Err(ReportWriteError::Write("sink closed".to_string()));
            }
            self.events.lock().unwrap().push(event);
            Ok(())
        }
    }

    impl ReportSink for MemoryReportSink {
        fn begin(&self, metadata: &RunMetadata) -> Result<(), ReportWriteError> {
            self.push(SinkEvent::Begin(metadata.run_id.clone()))
        }

        fn section(&self, title: &str) -> Result<(), ReportWriteError> {
            self.push(SinkEvent::Section(title.to_string()))
        }

        fn finding(&self, finding: &Finding) -> Result<(), ReportWriteError> {
            self.push(SinkEvent::Finding(finding.clone()))
        }

        fn step_outcome(&self, record: &StepRecord) -> Result<(), ReportWriteError> {
            self.push(SinkEvent::StepOutcome(record.plugin_name.clone()))
        }

        fn finalize(&self, summary: &RunSummary) -> Result<(), ReportWriteError> {
            self.push(SinkEvent::Finalize(*summary))
        }
    }
}
