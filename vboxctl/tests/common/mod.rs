//! In-memory VirtualBox that understands the commands the controller issues.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use vboxctl::{
    CommandExecutor, CommandOutput, SettleOptions, VboxCommand, VboxResult, VboxVm, VmOptions,
};

pub const NOT_FOUND: &str = "VBoxManage: error: Could not find a registered machine\n\
                             VBoxManage: error: Details: code VBOX_E_OBJECT_NOT_FOUND (0x80bb0001)";
pub const FILE_ERROR: &str = "VBoxManage: error: Could not find file for the medium\n\
                              VBoxManage: error: Details: code VBOX_E_FILE_ERROR (0x80bb0004)";

#[derive(Debug, Clone)]
pub struct FakeMachine {
    pub uuid: String,
    pub name: String,
    pub state: &'static str,
    pub cable_connected: bool,
    pub has_controller: bool,
}

#[derive(Default)]
struct Hypervisor {
    machines: Vec<FakeMachine>,
    /// Registered media and the UUID of the VM they are attached to.
    media: HashMap<String, Option<String>>,
    issued: Vec<VboxCommand>,
    next_uuid: u32,
}

impl Hypervisor {
    fn find(&mut self, identity: &str) -> Option<&mut FakeMachine> {
        self.machines
            .iter_mut()
            .find(|m| m.name == identity || m.uuid == identity)
    }

    fn apply(&mut self, argv: &[String]) -> CommandOutput {
        let args: Vec<&str> = argv.iter().map(String::as_str).collect();
        match args.as_slice() {
            ["showvminfo", id, "--machinereadable"] => match self.find(id) {
                Some(m) => ok(format!(
                    "name=\"{}\"\nUUID=\"{}\"\nVMState=\"{}\"\ncableconnected1=\"{}\"\n",
                    m.name,
                    m.uuid,
                    m.state,
                    if m.cable_connected { "on" } else { "off" }
                )),
                None => fail(NOT_FOUND),
            },
            ["showvminfo", id, "--log", "0"] => match self.find(id) {
                Some(m) if m.state == "running" || m.state == "paused" => {
                    ok("00:00:00.000 Log opened\n00:00:01.100 Process ID: 4242\n")
                }
                Some(_) => ok("00:00:00.000 Log opened\n"),
                None => fail(NOT_FOUND),
            },
            ["showhdinfo", path] => match self.media.get(*path) {
                Some(Some(owner)) => {
                    let name = self
                        .machines
                        .iter()
                        .find(|m| &m.uuid == owner)
                        .map(|m| m.name.clone())
                        .unwrap_or_default();
                    ok(format!(
                        "UUID:           d0f1\nAccessible:     yes\n\
                         In use by VMs:  {name} (UUID: {owner})\nLocation:       {path}\n"
                    ))
                }
                Some(None) => ok(format!("UUID:           d0f1\nLocation:       {path}\n")),
                None => fail(FILE_ERROR),
            },
            ["createvm", "--name", name, ..] => {
                if self.find(name).is_some() {
                    return fail("VBoxManage: error: Machine settings file already exists");
                }
                self.next_uuid += 1;
                self.machines.push(FakeMachine {
                    uuid: format!("00000000-0000-4000-8000-{:012}", self.next_uuid),
                    name: name.to_string(),
                    state: "poweroff",
                    cable_connected: true,
                    has_controller: false,
                });
                ok("Virtual machine 'x' is created and registered.")
            }
            ["modifyvm", id, rest @ ..] => {
                let Some(m) = self.find(id) else {
                    return fail(NOT_FOUND);
                };
                if let Some(pos) = rest.iter().position(|a| *a == "--cableconnected1") {
                    m.cable_connected = rest.get(pos + 1) == Some(&"on");
                }
                ok("")
            }
            ["storagectl", id, .., "--remove"] => match self.find(id) {
                Some(m) if m.has_controller => {
                    m.has_controller = false;
                    let uuid = m.uuid.clone();
                    for owner in self.media.values_mut() {
                        if owner.as_deref() == Some(uuid.as_str()) {
                            *owner = None;
                        }
                    }
                    ok("")
                }
                Some(_) => fail("VBoxManage: error: Could not find a storage controller"),
                None => fail(NOT_FOUND),
            },
            ["storagectl", id, ..] => match self.find(id) {
                Some(m) => {
                    m.has_controller = true;
                    ok("")
                }
                None => fail(NOT_FOUND),
            },
            ["storageattach", id, .., "--medium", path] => {
                let path = path.to_string();
                match self.find(id) {
                    Some(m) => {
                        let uuid = m.uuid.clone();
                        self.media.insert(path, Some(uuid));
                        ok("")
                    }
                    None => fail(NOT_FOUND),
                }
            }
            ["sharedfolder", "add", id, ..] => match self.find(id) {
                Some(_) => ok(""),
                None => fail(NOT_FOUND),
            },
            ["unregistervm", id, "--delete"] => {
                let before = self.machines.len();
                self.machines.retain(|m| m.name != *id && m.uuid != *id);
                if self.machines.len() == before {
                    fail(NOT_FOUND)
                } else {
                    ok("")
                }
            }
            ["closemedium", "disk", path] => match self.media.remove(*path) {
                Some(_) => ok(""),
                None => fail(FILE_ERROR),
            },
            ["startvm", id, "--type", "headless"] => match self.find(id) {
                Some(m) if m.state == "poweroff" || m.state == "saved" => {
                    m.state = "running";
                    ok("VM has been successfully started.")
                }
                Some(_) => fail("VBoxManage: error: The machine is already locked"),
                None => fail(NOT_FOUND),
            },
            ["controlvm", id, action] => {
                let Some(m) = self.find(id) else {
                    return fail(NOT_FOUND);
                };
                let next = match (*action, m.state) {
                    ("savestate", "running" | "paused") => "saved",
                    ("pause", "running") => "paused",
                    ("resume", "paused") => "running",
                    _ => return fail("VBoxManage: error: Machine in invalid state"),
                };
                m.state = next;
                ok("")
            }
            ["debugvm", id, "statistics", "--pattern", pattern] => match self.find(id) {
                Some(_) if pattern.ends_with("ReceiveBytes") => ok(
                    "<Statistics>\n\
                     <Counter c=\"9423150\" unit=\"bytes\" name=\"/Devices/PCNet0/ReceiveBytes\"/>\n\
                     <Counter c=\"256\" unit=\"bytes\" name=\"/Devices/PCNet1/ReceiveBytes\"/>\n\
                     </Statistics>\n",
                ),
                Some(_) => ok("<Statistics>\n</Statistics>\n"),
                None => fail(NOT_FOUND),
            },
            _ => fail("VBoxManage: error: Unknown command"),
        }
    }
}

fn ok(text: impl Into<String>) -> CommandOutput {
    CommandOutput::new(Some(0), text)
}

fn fail(text: impl Into<String>) -> CommandOutput {
    CommandOutput::new(Some(1), text)
}

/// Shared handle to one fake hypervisor; clones see the same state.
#[derive(Clone, Default)]
pub struct FakeVirtualBox {
    inner: Arc<Mutex<Hypervisor>>,
}

impl FakeVirtualBox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a VM directly, as a previous run would have left it.
    pub fn seed_machine(&self, name: &str, uuid: &str, state: &'static str, disk: &str) {
        let mut hv = self.inner.lock().unwrap();
        hv.machines.push(FakeMachine {
            uuid: uuid.to_string(),
            name: name.to_string(),
            state,
            cable_connected: false,
            has_controller: true,
        });
        hv.media.insert(disk.to_string(), Some(uuid.to_string()));
    }

    /// Register a medium attached to no VM.
    pub fn seed_orphaned_disk(&self, disk: &str) {
        self.inner.lock().unwrap().media.insert(disk.to_string(), None);
    }

    /// Change a VM's state behind the controller's back.
    pub fn set_state(&self, identity: &str, state: &'static str) {
        if let Some(m) = self.inner.lock().unwrap().find(identity) {
            m.state = state;
        }
    }

    pub fn machines(&self) -> Vec<FakeMachine> {
        self.inner.lock().unwrap().machines.clone()
    }

    pub fn machine(&self, identity: &str) -> Option<FakeMachine> {
        self.inner.lock().unwrap().find(identity).cloned()
    }

    pub fn disk_owner(&self, disk: &str) -> Option<Option<String>> {
        self.inner.lock().unwrap().media.get(disk).cloned()
    }

    /// Rendered command lines that changed hypervisor state.
    pub fn mutations(&self) -> Vec<String> {
        let hv = self.inner.lock().unwrap();
        hv.issued
            .iter()
            .filter(|c| c.is_mutation())
            .map(ToString::to_string)
            .collect()
    }

    pub fn forget_issued(&self) {
        self.inner.lock().unwrap().issued.clear();
    }
}

impl CommandExecutor for FakeVirtualBox {
    fn execute(&self, command: &VboxCommand) -> VboxResult<CommandOutput> {
        let mut hv = self.inner.lock().unwrap();
        hv.issued.push(command.clone());
        Ok(hv.apply(command.argv()))
    }
}

pub fn vm_options(name: &str) -> VmOptions {
    VmOptions {
        name: name.to_string(),
        os_type: "Linux26".to_string(),
        memory_mb: 256,
        disk_image: PathBuf::from("vm_image.vdi"),
        work_dir: PathBuf::from(format!("/slots/{name}")),
        enable_network: false,
        enable_shared_directory: false,
        register_only: false,
    }
}

pub fn controller(options: VmOptions, vbox: &FakeVirtualBox) -> VboxVm {
    VboxVm::with_executor(options, SettleOptions::none(), Box::new(vbox.clone()))
}
