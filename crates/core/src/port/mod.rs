// Port Layer - Interfaces for external dependencies

pub mod action_plugin;
pub mod command_runner;
pub mod probe;
pub mod report_sink;
pub mod time_provider;

// Re-exports
pub use action_plugin::ActionPlugin;
pub use command_runner::{CommandError, CommandOutput, CommandRunner, CommandSpec};
pub use probe::{FactProbe, ProbeError};
pub use report_sink::{ReportSink, ReportWriteError};
pub use time_provider::TimeProvider;
