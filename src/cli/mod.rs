pub mod args;
pub mod report;

pub use args::{Cli, CliCommand, ReportCliArgs};
pub use report::handle_report_command;
