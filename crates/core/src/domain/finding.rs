// Finding - one reportable observation with a severity level

use serde::{Deserialize, Serialize};

/// Severity of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARN",
            Severity::Critical => "CRIT",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One observation reported by an action plugin. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub subject: String,
    pub detail: String,
}

impl Finding {
    pub fn new(severity: Severity, subject: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity,
            subject: subject.into(),
            detail: detail.into(),
        }
    }

    pub fn info(subject: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(Severity::Info, subject, detail)
    }

    pub fn warning(subject: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(Severity::Warning, subject, detail)
    }

    pub fn critical(subject: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(Severity::Critical, subject, detail)
    }
}
