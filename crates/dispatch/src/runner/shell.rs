//! Shell command runner.
//!
//! Hands each command line to the platform shell (`sh -c` on Unix,
//! `cmd /C` on Windows) so quoting, escapes and redirections behave as they
//! would when typed by hand.

use tokio::process::Command;

use super::executor::{CommandOutput, CommandRunner, RunError};
use super::subprocess;

/// Runner that executes command lines through the system shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str) -> Result<CommandOutput, RunError> {
        if command.trim().is_empty() {
            return Err(RunError::EmptyCommand);
        }
        let mut cmd = shell_command(command);
        subprocess::run_command(&mut cmd).await
    }
}

#[cfg(unix)]
fn shell_command(line: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(line);
    cmd
}

#[cfg(windows)]
fn shell_command(line: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").raw_arg(line);
    cmd
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
