//! Registration tasks and the plan table.
//!
//! ```text
//! AlreadyRegistered:  (nothing)
//! StaleOwner(uuid):   remove_stale_vm → create
//! OrphanedDisk:       release_orphaned_disk → create
//! Clean:              create
//!
//! create = create_vm → configure_vm → add_storage_controller → attach_disk
//!          [→ connect_network] [→ add_shared_folder]
//! ```

use super::{RegistrationFacts, Registrar};
use crate::errors::VboxResult;
use crate::manage::{VboxCommand, run_checked};
use crate::pipeline::{BoxedTask, ExecutionPlan, PipelineTask};
use crate::runtime::VmOptions;

/// Pick the registration plan for the observed facts.
pub(super) fn registration_plan<'a>(
    facts: &RegistrationFacts,
    vm: &VmOptions,
) -> ExecutionPlan<Registrar<'a>> {
    let mut tasks: Vec<BoxedTask<Registrar<'a>>> = match facts {
        RegistrationFacts::AlreadyRegistered => return ExecutionPlan::new(Vec::new()),
        RegistrationFacts::StaleOwner(owner) => vec![Box::new(RemoveStaleVm {
            owner: owner.clone(),
        })],
        RegistrationFacts::OrphanedDisk => vec![Box::new(ReleaseOrphanedDisk)],
        RegistrationFacts::Clean => Vec::new(),
    };
    tasks.extend(create_tasks(vm));
    ExecutionPlan::new(tasks)
}

/// Steps that build a fresh VM record around the existing disk.
pub(super) fn create_tasks<'a>(vm: &VmOptions) -> Vec<BoxedTask<Registrar<'a>>> {
    let name = vm.name.as_str();
    let mut tasks = vec![
        CommandTask::boxed(
            "create_vm",
            "register",
            "Registering virtual machine with VirtualBox",
            VboxCommand::create_vm(name, &vm.work_dir, &vm.os_type),
        ),
        CommandTask::boxed(
            "configure_vm",
            "modify",
            "Modifying virtual machine",
            VboxCommand::configure_vm(name, vm.memory_mb, false),
        ),
        CommandTask::boxed(
            "add_storage_controller",
            "add storage controller",
            "Adding storage controller to virtual machine",
            VboxCommand::add_storage_controller(name),
        ),
        CommandTask::boxed(
            "attach_disk",
            "storage attach",
            "Adding virtual disk drive to virtual machine",
            VboxCommand::attach_disk(name, &vm.disk_path()),
        ),
    ];

    if vm.enable_network {
        tasks.push(CommandTask::boxed(
            "connect_network",
            "enable network",
            "Enabling network access for virtual machine",
            VboxCommand::set_cable_connected(name, true),
        ));
    }

    if vm.enable_shared_directory {
        tasks.push(CommandTask::boxed(
            "add_shared_folder",
            "enable shared dir",
            "Enabling shared directory for virtual machine",
            VboxCommand::add_shared_folder(name, &vm.shared_dir()),
        ));
    }

    tasks
}

/// A step that is exactly one management command.
struct CommandTask {
    name: &'static str,
    item: &'static str,
    message: &'static str,
    command: VboxCommand,
}

impl CommandTask {
    fn boxed<'a>(
        name: &'static str,
        item: &'static str,
        message: &'static str,
        command: VboxCommand,
    ) -> BoxedTask<Registrar<'a>> {
        Box::new(Self {
            name,
            item,
            message,
            command,
        })
    }
}

impl<'a> PipelineTask<Registrar<'a>> for CommandTask {
    fn run(&self, ctx: &Registrar<'a>) -> VboxResult<()> {
        tracing::info!(vm = %ctx.vm().name, "{}", self.message);
        run_checked(ctx.executor(), &self.command, self.item).map(drop)
    }

    fn name(&self) -> &str {
        self.name
    }
}

/// Deregister the VM that still owns our disk from an earlier run.
struct RemoveStaleVm {
    owner: String,
}

impl<'a> PipelineTask<Registrar<'a>> for RemoveStaleVm {
    fn run(&self, ctx: &Registrar<'a>) -> VboxResult<()> {
        tracing::info!(
            vm = %ctx.vm().name,
            owner = %self.owner,
            "Disk is owned by a stale VM, deregistering it"
        );
        ctx.deregister(&self.owner)
    }

    fn name(&self) -> &str {
        "remove_stale_vm"
    }
}

/// Close a medium that is registered but attached to no VM.
struct ReleaseOrphanedDisk;

impl<'a> PipelineTask<Registrar<'a>> for ReleaseOrphanedDisk {
    fn run(&self, ctx: &Registrar<'a>) -> VboxResult<()> {
        tracing::info!(vm = %ctx.vm().name, "Disk is registered without a VM, releasing it");
        ctx.release_disk_lenient();
        Ok(())
    }

    fn name(&self) -> &str {
        "release_orphaned_disk"
    }
}
