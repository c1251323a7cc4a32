//! vboxctl - lifecycle controller for VirtualBox task VMs.
//!
//! Drives one VM per task through the `VBoxManage` command-line tool:
//! registration (with recovery of registrations left behind by a crashed
//! run), start/stop/pause/resume, CPU and network throttles, and telemetry
//! read back from the tool's text output.
//!
//! ```no_run
//! use std::path::Path;
//! use vboxctl::{ControllerOptions, RunOutcome, VboxVm};
//!
//! # fn main() -> vboxctl::VboxResult<()> {
//! let options = ControllerOptions::from_file(Path::new("slot0.json"))?;
//! let mut vm = VboxVm::new(options)?;
//! if vm.run()? == RunOutcome::Started {
//!     vm.set_cpu_cap(0.5)?;
//! }
//! vm.cleanup()?;
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod logging;
pub mod manage;
pub mod parser;
pub mod pipeline;
pub mod registration;
pub mod runtime;
pub mod vm;

#[cfg(test)]
mod testing;

pub use errors::{VboxError, VboxResult};
pub use manage::{CommandExecutor, CommandOutput, VBoxManage, VboxCommand};
pub use registration::{RegistrationFacts, RegistrationReport, Registrar};
pub use runtime::{ControllerOptions, ManageOptions, SettleOptions, VmOptions};
pub use vm::{RunOutcome, VboxVm, VmStatus, VmTelemetry};
