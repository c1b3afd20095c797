// Action Plugin Port
// Polymorphic unit of hardening/enumeration work with a declared
// required-capability set.

use async_trait::async_trait;
use std::collections::BTreeSet;

use crate::domain::{Capability, Criticality, StepOutcome, SystemFacts};

/// Action Plugin trait
///
/// `capabilities` is static (no I/O). `run` must not assume anything
/// about ordering relative to other plugins beyond what the plan
/// declares; step failures are encoded in the returned outcome, never
/// raised as errors.
#[async_trait]
pub trait ActionPlugin: Send + Sync {
    /// Stable name, used in plans, skip flags and the report
    fn name(&self) -> &str;

    /// Capabilities this plugin requires to be included in a plan
    fn capabilities(&self) -> BTreeSet<Capability>;

    /// Whether a failure of this plugin halts the remaining plan
    fn criticality(&self) -> Criticality;

    /// Perform the work against the facts snapshot
    async fn run(&self, facts: &SystemFacts) -> StepOutcome;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::domain::{ActionStatus, Finding, Severity};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Mock plugin behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Succeed with one info finding
        Success,
        /// Fail with one finding of the given severity
        Fail(Severity),
        /// Sleep longer than any reasonable step timeout
        Hang(Duration),
    }

    /// Configurable mock plugin counting its invocations
    pub struct MockPlugin {
        name: String,
        capabilities: BTreeSet<Capability>,
        criticality: Criticality,
        behavior: MockBehavior,
        invocations: AtomicUsize,
    }

    impl MockPlugin {
        pub fn new(
            name: impl Into<String>,
            capabilities: BTreeSet<Capability>,
            criticality: Criticality,
            behavior: MockBehavior,
        ) -> Self {
            Self {
                name: name.into(),
                capabilities,
                criticality,
                behavior,
                invocations: AtomicUsize::new(0),
            }
        }

        /// Capability-free best-effort plugin that always succeeds
        pub fn succeeding(name: impl Into<String>) -> Self {
            Self::new(
                name,
                BTreeSet::new(),
                Criticality::BestEffort,
                MockBehavior::Success,
            )
        }

        pub fn invocations(&self) -> usize {
            self.invocations.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ActionPlugin for MockPlugin {
        fn name(&self) -> &str {
            &self.name
        }

        fn capabilities(&self) -> BTreeSet<Capability> {
            self.capabilities.clone()
        }

        fn criticality(&self) -> Criticality {
            self.criticality
        }

        async fn run(&self, _facts: &SystemFacts) -> StepOutcome {
            self.invocations.fetch_add(1, Ordering::SeqCst);

            match &self.behavior {
                MockBehavior::Success => StepOutcome {
                    status: ActionStatus::Success,
                    findings: vec![Finding::info(self.name.clone(), "mock success")],
                },
                MockBehavior::Fail(severity) => StepOutcome {
                    status: ActionStatus::Failed,
                    findings: vec![Finding::new(*severity, self.name.clone(), "mock failure")],
                },
                MockBehavior::Hang(duration) => {
                    tokio::time::sleep(*duration).await;
                    StepOutcome {
                        status: ActionStatus::Success,
                        findings: Vec::new(),
                    }
                }
            }
        }
    }
}
