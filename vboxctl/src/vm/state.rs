//! VM lifecycle state.

use crate::parser;
use serde::Serialize;
use std::fmt;

/// Lifecycle status of the controlled VM.
///
/// ```text
///                 run()/register
/// Unregistered ─────────────────► Stopped ◄──────────┐
///      ▲                            │                │ stop()
///      │ cleanup()          start() ▼                │
///      └──────────────────────── Running ◄──► Paused ┘
///                                 pause()/resume()
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VmStatus {
    /// Not known to the hypervisor.
    Unregistered,
    /// Registered and not occupying resources.
    Stopped,
    /// Booting or running, or in any other active state except paused.
    Running,
    /// Execution suspended by `pause()`.
    Paused,
}

impl VmStatus {
    /// Map a live `VMState` token (or its absence) to a status.
    pub fn from_live(token: Option<&str>) -> Self {
        match token {
            Some("paused") => VmStatus::Paused,
            Some(t) if parser::is_active_state(t) => VmStatus::Running,
            _ => VmStatus::Stopped,
        }
    }

    pub fn is_registered(&self) -> bool {
        !matches!(self, VmStatus::Unregistered)
    }

    /// True while the VM occupies hypervisor resources.
    pub fn is_active(&self) -> bool {
        matches!(self, VmStatus::Running | VmStatus::Paused)
    }

    pub fn can_start(&self) -> bool {
        matches!(self, VmStatus::Stopped)
    }

    pub fn can_stop(&self) -> bool {
        self.is_active()
    }

    pub fn can_pause(&self) -> bool {
        matches!(self, VmStatus::Running)
    }

    pub fn can_resume(&self) -> bool {
        matches!(self, VmStatus::Paused)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VmStatus::Unregistered => "unregistered",
            VmStatus::Stopped => "stopped",
            VmStatus::Running => "running",
            VmStatus::Paused => "paused",
        }
    }
}

impl fmt::Display for VmStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
