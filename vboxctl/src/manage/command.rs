//! VBoxManage argument builders.
//!
//! One constructor per command the controller issues. Arguments are passed to
//! the tool as a vector, never through a shell, so paths and names need no
//! quoting. `Display` renders a quoted line for diagnostics only.

use std::fmt;
use std::path::Path;

/// Storage controller every registered VM gets.
pub const STORAGE_CONTROLLER: &str = "IDE Controller";

/// Name of the shared folder exposed to the guest.
pub const SHARED_FOLDER: &str = "shared";

/// Subcommands that only read hypervisor state.
const QUERY_SUBCOMMANDS: &[&str] = &["showvminfo", "showhdinfo", "debugvm", "list"];

/// A single VBoxManage invocation (without the program name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VboxCommand {
    args: Vec<String>,
}

impl VboxCommand {
    pub fn new(subcommand: impl Into<String>) -> Self {
        Self {
            args: vec![subcommand.into()],
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy().into_owned())
    }

    pub fn subcommand(&self) -> &str {
        &self.args[0]
    }

    pub fn argv(&self) -> &[String] {
        &self.args
    }

    /// True for commands that change hypervisor state.
    pub fn is_mutation(&self) -> bool {
        !QUERY_SUBCOMMANDS.contains(&self.subcommand())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn show_vm_info(vm: &str) -> Self {
        Self::new("showvminfo").arg(vm).arg("--machinereadable")
    }

    pub fn show_vm_log(vm: &str) -> Self {
        Self::new("showvminfo").arg(vm).args(["--log", "0"])
    }

    pub fn show_hd_info(disk: &Path) -> Self {
        Self::new("showhdinfo").path_arg(disk)
    }

    pub fn statistics(vm: &str, pattern: &str) -> Self {
        Self::new("debugvm")
            .arg(vm)
            .arg("statistics")
            .args(["--pattern", pattern])
    }

    // ========================================================================
    // Registration
    // ========================================================================

    pub fn create_vm(vm: &str, base_folder: &Path, os_type: &str) -> Self {
        Self::new("createvm")
            .args(["--name", vm])
            .arg("--basefolder")
            .path_arg(base_folder)
            .args(["--ostype", os_type])
            .arg("--register")
    }

    /// Baseline hardware: ACPI, IO-APIC, disk-only boot, NAT with DNS proxy.
    pub fn configure_vm(vm: &str, memory_mb: u32, cable_connected: bool) -> Self {
        Self::new("modifyvm")
            .arg(vm)
            .args(["--memory".to_string(), memory_mb.to_string()])
            .args(["--acpi", "on"])
            .args(["--ioapic", "on"])
            .args(["--boot1", "disk"])
            .args(["--boot2", "none"])
            .args(["--boot3", "none"])
            .args(["--boot4", "none"])
            .args(["--nic1", "nat"])
            .args(["--natdnsproxy1", "on"])
            .args(["--cableconnected1", on_off(cable_connected)])
    }

    pub fn add_storage_controller(vm: &str) -> Self {
        Self::new("storagectl")
            .arg(vm)
            .args(["--name", STORAGE_CONTROLLER])
            .args(["--add", "ide"])
            .args(["--controller", "PIIX4"])
    }

    pub fn remove_storage_controller(vm: &str) -> Self {
        Self::new("storagectl")
            .arg(vm)
            .args(["--name", STORAGE_CONTROLLER])
            .arg("--remove")
    }

    pub fn attach_disk(vm: &str, disk: &Path) -> Self {
        Self::new("storageattach")
            .arg(vm)
            .args(["--storagectl", STORAGE_CONTROLLER])
            .args(["--port", "0"])
            .args(["--device", "0"])
            .args(["--type", "hdd"])
            .arg("--medium")
            .path_arg(disk)
    }

    pub fn add_shared_folder(vm: &str, host_path: &Path) -> Self {
        Self::new("sharedfolder")
            .arg("add")
            .arg(vm)
            .args(["--name", SHARED_FOLDER])
            .arg("--hostpath")
            .path_arg(host_path)
    }

    pub fn unregister_vm(vm: &str) -> Self {
        Self::new("unregistervm").arg(vm).arg("--delete")
    }

    pub fn close_medium(disk: &Path) -> Self {
        Self::new("closemedium").arg("disk").path_arg(disk)
    }

    // ========================================================================
    // Control
    // ========================================================================

    pub fn start_vm(vm: &str) -> Self {
        Self::new("startvm").arg(vm).args(["--type", "headless"])
    }

    pub fn control_vm(vm: &str, action: ControlAction) -> Self {
        Self::new("controlvm").arg(vm).arg(action.as_str())
    }

    // ========================================================================
    // Resources
    // ========================================================================

    pub fn set_cable_connected(vm: &str, connected: bool) -> Self {
        Self::new("modifyvm")
            .arg(vm)
            .args(["--cableconnected1", on_off(connected)])
    }

    pub fn set_cpu_execution_cap(vm: &str, percent: u32) -> Self {
        Self::new("modifyvm")
            .arg(vm)
            .args(["--cpuexecutioncap".to_string(), percent.to_string()])
    }

    pub fn set_nic_speed(vm: &str, kbps: u64) -> Self {
        Self::new("modifyvm")
            .arg(vm)
            .args(["--nicspeed1".to_string(), kbps.to_string()])
    }
}

/// `controlvm` actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    SaveState,
    Pause,
    Resume,
}

impl ControlAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlAction::SaveState => "savestate",
            ControlAction::Pause => "pause",
            ControlAction::Resume => "resume",
        }
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}

impl fmt::Display for VboxCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, "\"{}\"", arg)?;
            } else {
                f.write_str(arg)?;
            }
        }
        Ok(())
    }
}
