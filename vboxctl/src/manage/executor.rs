//! CommandExecutor - the single I/O boundary to the management tool.

use super::VboxCommand;
use crate::errors::{VboxError, VboxResult};

/// Captured result of one tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` if the process was terminated by a signal.
    pub status: Option<i32>,
    /// Interleaved stdout and stderr, in emission order.
    pub text: String,
}

impl CommandOutput {
    pub fn new(status: Option<i32>, text: impl Into<String>) -> Self {
        Self {
            status,
            text: text.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Runs management commands.
///
/// Implementations block until the command has exited and its output has been
/// fully drained. A spawn failure is an `Err`; a command that ran but exited
/// non-zero is an `Ok` with a non-success status, so callers probing for
/// sentinels in the output can still see it.
pub trait CommandExecutor: Send + Sync {
    /// Run the command and capture its combined output.
    fn execute(&self, command: &VboxCommand) -> VboxResult<CommandOutput>;

    /// Full command line as shown in diagnostics.
    fn describe(&self, command: &VboxCommand) -> String {
        command.to_string()
    }
}

/// Run a command and turn a non-zero exit into `VboxError::CommandFailed`.
///
/// `item` names the step in the error log, e.g. "start VM".
pub(crate) fn run_checked(
    executor: &dyn CommandExecutor,
    command: &VboxCommand,
    item: &str,
) -> VboxResult<String> {
    let output = executor.execute(command)?;
    if output.success() {
        return Ok(output.text);
    }
    Err(failure(executor, command, output, item))
}

/// Log a failed command with its full output and wrap it as an error.
pub(crate) fn failure(
    executor: &dyn CommandExecutor,
    command: &VboxCommand,
    output: CommandOutput,
    item: &str,
) -> VboxError {
    let command_line = executor.describe(command);
    tracing::error!(
        item,
        command = %command_line,
        status = ?output.status,
        output = %output.text,
        "VBoxManage command failed"
    );
    VboxError::CommandFailed {
        command: command_line,
        status: output.status,
        output: output.text,
    }
}
