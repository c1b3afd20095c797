// Domain Layer - Pure entities and invariants

pub mod action;
pub mod error;
pub mod facts;
pub mod finding;
pub mod plan;
pub mod report;

// Re-exports
pub use action::{ActionResult, ActionStatus, Criticality, StepOutcome};
pub use error::DomainError;
pub use facts::{Capability, DistroFamily, FirewallBackend, PackageManager, ScannerSet, SystemFacts};
pub use finding::{Finding, Severity};
pub use plan::{ExecutionPlan, PlanEntry};
pub use report::{RunMetadata, RunReport, RunSummary, StepRecord};
