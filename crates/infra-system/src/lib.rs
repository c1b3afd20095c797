// Fortify Infrastructure - System Adapters

pub mod fact_probe;
pub mod report_file;
pub mod subprocess_runner;

pub use fact_probe::FileSystemProbe;
pub use report_file::FileReportSink;
pub use subprocess_runner::SubprocessRunner;
