//! Process runner interface and shared types.
//!
//! Defines [`CommandRunner`], the seam between the dispatcher and the
//! operating system, along with [`CommandOutput`] and [`RunError`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Captured output from one command execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandOutput {
    /// Stdout captured from the process (capped).
    pub stdout: String,
    /// Stderr captured from the process (capped).
    pub stderr: String,
    /// Process exit code (`-1` if killed by signal).
    pub exit_code: i32,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl CommandOutput {
    /// Whether the process exited with status zero.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Errors that prevent a command from running at all.
///
/// A command that runs and exits non-zero is not an error at this level;
/// it is reported through [`CommandOutput::exit_code`].
#[derive(Debug)]
pub enum RunError {
    /// The command line was empty or whitespace.
    EmptyCommand,
    /// An I/O error occurred while spawning or waiting on the process.
    IoError(std::io::Error),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyCommand => write!(f, "Command line is empty"),
            Self::IoError(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::IoError(err) => Some(err),
            Self::EmptyCommand => None,
        }
    }
}

/// Runs one command line to completion.
///
/// The dispatcher only depends on this trait, so tests can substitute a
/// runner that never touches the operating system.
pub trait CommandRunner: Send + Sync {
    /// Run `command` and wait for it to exit.
    fn run(
        &self,
        command: &str,
    ) -> impl std::future::Future<Output = Result<CommandOutput, RunError>> + Send;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_empty_command() {
        assert_eq!(RunError::EmptyCommand.to_string(), "Command line is empty");
    }

    #[test]
    fn display_io_error() {
        let inner = std::io::Error::new(std::io::ErrorKind::NotFound, "sh missing");
        let err = RunError::IoError(inner);
        assert!(err.to_string().starts_with("I/O error:"));
        assert!(err.to_string().contains("sh missing"));
    }

    #[test]
    fn error_source_io() {
        let err = RunError::IoError(std::io::Error::other("boom"));
        assert!(
            std::error::Error::source(&err).is_some(),
            "IoError variant should have a source"
        );
    }

    #[test]
    fn error_source_none_for_empty() {
        assert!(std::error::Error::source(&RunError::EmptyCommand).is_none());
    }

    #[test]
    fn success_is_exit_code_zero() {
        let mut output = CommandOutput {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: 0,
            duration_ms: 1,
        };
        assert!(output.success());
        output.exit_code = 1;
        assert!(!output.success());
        output.exit_code = -1;
        assert!(!output.success());
    }
}
