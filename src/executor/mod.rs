mod assertions;
mod context;
mod models;
mod printer;
mod runner;
mod writer;

pub use context::ExecutionContext;
pub use models::{
    Phase, RunReport, ScenarioFailure, ScenarioResult, SequenceReport, SuiteReport, Summary,
};
pub use printer::{print_run_report, print_suite_report};
pub use runner::{PreparedSuite, Runner};
pub use writer::write_report;
