// Application Layer - Plan building and execution

pub mod actions;
pub mod constants;
pub mod executor;
pub mod planner;
pub mod registry;
pub mod shutdown;

// Re-exports
pub use executor::PlanExecutor;
pub use planner::PlanBuilder;
pub use registry::PluginRegistry;
pub use shutdown::{abort_channel, AbortSender, AbortToken};
