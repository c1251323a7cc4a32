//! Controller configuration.
//!
//! Static per-task configuration, set once when the controller is created and
//! never changed afterwards. The surrounding harness usually builds these from
//! its own task description; the CLI loads them from a JSON file.

use crate::errors::{VboxError, VboxResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default management executable, resolved through `PATH`.
pub const DEFAULT_PROGRAM: &str = "VBoxManage";

/// Static description of the VM a task runs in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmOptions {
    /// Name the VM is registered under.
    pub name: String,
    /// Guest OS type tag, passed verbatim to `--ostype`.
    pub os_type: String,
    /// RAM allocation in megabytes.
    pub memory_mb: u32,
    /// Disk image path, relative to `work_dir`.
    pub disk_image: PathBuf,
    /// Slot directory holding the disk image and the VM's base folder.
    pub work_dir: PathBuf,
    /// Connect the NAT adapter's cable right after registration.
    #[serde(default)]
    pub enable_network: bool,
    /// Expose `<work_dir>/shared` to the guest as shared folder `shared`.
    #[serde(default)]
    pub enable_shared_directory: bool,
    /// Stop after registration instead of booting the VM.
    #[serde(default)]
    pub register_only: bool,
}

impl VmOptions {
    /// Absolute-or-slot-relative location of the backing disk.
    pub fn disk_path(&self) -> PathBuf {
        self.work_dir.join(&self.disk_image)
    }

    /// Host side of the shared folder.
    pub fn shared_dir(&self) -> PathBuf {
        self.work_dir.join("shared")
    }

    fn validate(&self) -> VboxResult<()> {
        if self.name.trim().is_empty() {
            return Err(VboxError::Config("vm name must not be empty".into()));
        }
        if self.os_type.trim().is_empty() {
            return Err(VboxError::Config("os_type must not be empty".into()));
        }
        if self.memory_mb == 0 {
            return Err(VboxError::Config("memory_mb must be greater than 0".into()));
        }
        if self.disk_image.as_os_str().is_empty() {
            return Err(VboxError::Config("disk_image must not be empty".into()));
        }
        Ok(())
    }
}

/// Environment of the management tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManageOptions {
    /// Executable name or path.
    pub program: PathBuf,
    /// VirtualBox install directory, prepended to the child's `PATH`.
    pub install_dir: Option<PathBuf>,
    /// Per-run configuration home, exported as `VBOX_USER_HOME`.
    pub user_home: Option<PathBuf>,
    /// Pass `-q` to suppress the tool's banner.
    pub quiet: bool,
}

impl Default for ManageOptions {
    fn default() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_PROGRAM),
            install_dir: None,
            user_home: None,
            quiet: true,
        }
    }
}

/// Bounded pauses that let asynchronous hypervisor work settle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SettleOptions {
    /// After `startvm`, before the caller queries the VM.
    #[serde(with = "millis")]
    pub boot: Duration,
    /// After deregistration during cleanup.
    #[serde(with = "millis")]
    pub teardown: Duration,
}

impl SettleOptions {
    /// No settle time at all.
    pub fn none() -> Self {
        Self {
            boot: Duration::ZERO,
            teardown: Duration::ZERO,
        }
    }
}

impl Default for SettleOptions {
    fn default() -> Self {
        Self {
            boot: Duration::from_secs(1),
            teardown: Duration::from_secs(5),
        }
    }
}

/// Complete controller configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerOptions {
    pub vm: VmOptions,
    #[serde(default)]
    pub manage: ManageOptions,
    #[serde(default)]
    pub settle: SettleOptions,
}

impl ControllerOptions {
    pub fn new(vm: VmOptions) -> Self {
        Self {
            vm,
            manage: ManageOptions::default(),
            settle: SettleOptions::default(),
        }
    }

    /// Load and validate options from a JSON file.
    pub fn from_file(path: &Path) -> VboxResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            VboxError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let options: Self = serde_json::from_str(&raw).map_err(|e| {
            VboxError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> VboxResult<()> {
        self.vm.validate()?;
        if self.manage.program.as_os_str().is_empty() {
            return Err(VboxError::Config("manage.program must not be empty".into()));
        }
        Ok(())
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_vm() -> VmOptions {
        VmOptions {
            name: "boinc_slot_0".into(),
            os_type: "Linux26".into(),
            memory_mb: 256,
            disk_image: PathBuf::from("vm_image.vdi"),
            work_dir: PathBuf::from("/var/lib/boinc/slots/0"),
            enable_network: false,
            enable_shared_directory: true,
            register_only: false,
        }
    }

    #[test]
    fn test_disk_and_shared_paths() {
        let vm = sample_vm();
        assert_eq!(
            vm.disk_path(),
            PathBuf::from("/var/lib/boinc/slots/0/vm_image.vdi")
        );
        assert_eq!(vm.shared_dir(), PathBuf::from("/var/lib/boinc/slots/0/shared"));
    }

    #[test]
    fn test_from_file_applies_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "vm": {{
                    "name": "slot0",
                    "os_type": "Linux26",
                    "memory_mb": 512,
                    "disk_image": "disk.vdi",
                    "work_dir": "/tmp/slot0"
                }},
                "settle": {{ "boot": 250 }}
            }}"#
        )
        .unwrap();

        let options = ControllerOptions::from_file(file.path()).unwrap();
        assert_eq!(options.vm.memory_mb, 512);
        assert!(!options.vm.enable_network);
        assert!(!options.vm.register_only);
        assert_eq!(options.manage.program, PathBuf::from(DEFAULT_PROGRAM));
        assert!(options.manage.quiet);
        assert_eq!(options.settle.boot, Duration::from_millis(250));
        assert_eq!(options.settle.teardown, Duration::from_secs(5));
    }

    #[test]
    fn test_from_file_rejects_empty_name() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"vm": {{"name": " ", "os_type": "Linux26", "memory_mb": 1,
                "disk_image": "d.vdi", "work_dir": "/tmp"}}}}"#
        )
        .unwrap();

        let err = ControllerOptions::from_file(file.path()).unwrap_err();
        assert!(matches!(err, VboxError::Config(_)));
    }

    #[test]
    fn test_from_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = ControllerOptions::from_file(&dir.path().join("absent.json")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }

    #[test]
    fn test_zero_memory_rejected() {
        let mut vm = sample_vm();
        vm.memory_mb = 0;
        assert!(ControllerOptions::new(vm).validate().is_err());
    }
}
