//! Error types for the VirtualBox controller.

/// Result type alias for controller operations.
pub type VboxResult<T> = std::result::Result<T, VboxError>;

/// Errors surfaced by the controller.
///
/// Every variant that originates from a VBoxManage invocation carries the
/// command line, and tool failures also carry the captured output, so the
/// caller can show the operator exactly what the hypervisor said.
#[derive(Debug, thiserror::Error)]
pub enum VboxError {
    // =========================================================================
    // Transport
    // =========================================================================
    /// The management tool could not be launched at all.
    #[error("failed to launch `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Pipe or stream handling failed while talking to the tool.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // =========================================================================
    // Tool-reported
    // =========================================================================
    /// The tool ran but exited non-zero.
    #[error("`{command}` failed (exit status: {}):\n{output}", display_status(.status))]
    CommandFailed {
        command: String,
        status: Option<i32>,
        output: String,
    },

    // =========================================================================
    // Parse
    // =========================================================================
    /// An expected field was absent from otherwise successful output.
    #[error("not found: {0}")]
    NotFound(String),

    // =========================================================================
    // Caller
    // =========================================================================
    /// Operation invoked from a lifecycle state that does not allow it.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Argument outside its accepted range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration could not be loaded or failed validation.
    #[error("configuration error: {0}")]
    Config(String),
}

fn display_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "terminated by signal".to_string(),
    }
}

impl VboxError {
    /// True when the error means "the queried field was absent" rather than
    /// a fault of the tool or the controller.
    pub fn is_not_found(&self) -> bool {
        matches!(self, VboxError::NotFound(_))
    }

    /// Captured tool output attached to this error, if any.
    pub fn output(&self) -> Option<&str> {
        match self {
            VboxError::CommandFailed { output, .. } => Some(output),
            _ => None,
        }
    }
}
