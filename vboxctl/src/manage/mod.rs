//! Management tool boundary.
//!
//! - **VboxCommand**: argument builders for every VBoxManage command used
//! - **CommandExecutor**: runs a command, captures interleaved output
//! - **VBoxManage**: the subprocess-backed executor

mod command;
mod executor;
mod vboxmanage;

pub use command::{ControlAction, STORAGE_CONTROLLER, SHARED_FOLDER, VboxCommand};
pub use executor::{CommandExecutor, CommandOutput};
pub(crate) use executor::{failure, run_checked};
pub use vboxmanage::{VBOX_USER_HOME_ENV, VBoxManage};
