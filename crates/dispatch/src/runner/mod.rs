//! External process execution.
//!
//! [`executor::CommandRunner`] is the narrow "run this command line, report
//! the outcome" capability the dispatcher is written against;
//! [`shell::ShellRunner`] is the production implementation.

pub mod executor;
pub mod shell;
pub mod subprocess;

pub use executor::{CommandOutput, CommandRunner, RunError};
pub use shell::ShellRunner;
