//! VM identity and registration management.
//!
//! Decides, from what VirtualBox currently reports, whether the task's VM
//! needs to be (re)created, and tears registrations down again.
//!
//! Three facts are observed before anything is changed:
//! - the VM is known under its configured name
//! - the backing disk is in the media registry
//! - the disk is owned by some other VM identity
//!
//! They collapse into [`RegistrationFacts`], which selects an execution plan
//! (see `tasks`). A disk owned by a VM we do not know about is the normal
//! leftover of a run that was killed mid-task, not an error.

mod tasks;

use crate::errors::VboxResult;
use crate::manage::{CommandExecutor, CommandOutput, VboxCommand, run_checked};
use crate::parser;
use crate::pipeline::{PipelineExecutor, PipelineMetrics};
use crate::runtime::VmOptions;

/// What the media registry says about the backing disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiskStatus {
    /// Not in the media registry.
    Unknown,
    /// Registered but attached to no VM.
    Orphaned,
    /// Attached to the VM with this identity.
    OwnedBy(String),
}

impl DiskStatus {
    pub fn from_output(output: &CommandOutput) -> Self {
        if !parser::medium_known(output) {
            return DiskStatus::Unknown;
        }
        match parser::owner_uuid(&output.text) {
            Some(owner) => DiskStatus::OwnedBy(owner.to_string()),
            None => DiskStatus::Orphaned,
        }
    }
}

/// Observed registration state, one variant per plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationFacts {
    /// The VM is known under its configured name.
    AlreadyRegistered,
    /// Our disk belongs to a VM identity left over from an earlier run.
    StaleOwner(String),
    /// Our disk is registered but owned by no VM.
    OrphanedDisk,
    /// Nothing is registered.
    Clean,
}

/// Outcome of [`Registrar::ensure_registered`].
#[derive(Debug, Clone)]
pub struct RegistrationReport {
    pub facts: RegistrationFacts,
    pub metrics: PipelineMetrics,
}

impl RegistrationReport {
    /// True if any hypervisor state was changed.
    pub fn changed(&self) -> bool {
        !self.metrics.tasks.is_empty()
    }
}

/// Registration operations for one VM descriptor.
pub struct Registrar<'a> {
    executor: &'a dyn CommandExecutor,
    vm: &'a VmOptions,
}

impl<'a> Registrar<'a> {
    pub fn new(executor: &'a dyn CommandExecutor, vm: &'a VmOptions) -> Self {
        Self { executor, vm }
    }

    pub fn vm(&self) -> &VmOptions {
        self.vm
    }

    pub(crate) fn executor(&self) -> &dyn CommandExecutor {
        self.executor
    }

    /// Whether VirtualBox knows a VM by this name or UUID.
    pub fn is_registered(&self, identity: &str) -> VboxResult<bool> {
        let output = self.executor.execute(&VboxCommand::show_vm_info(identity))?;
        let known = parser::vm_exists(&output);
        tracing::debug!(vm = identity, known, "Checked VM registration");
        Ok(known)
    }

    /// Query the media registry for the backing disk.
    pub fn disk_status(&self) -> VboxResult<DiskStatus> {
        let output = self
            .executor
            .execute(&VboxCommand::show_hd_info(&self.vm.disk_path()))?;
        let status = DiskStatus::from_output(&output);
        tracing::debug!(vm = %self.vm.name, disk = ?status, "Checked disk registration");
        Ok(status)
    }

    /// Observe the facts that select a registration plan.
    pub fn observe(&self) -> VboxResult<RegistrationFacts> {
        if self.is_registered(&self.vm.name)? {
            return Ok(RegistrationFacts::AlreadyRegistered);
        }
        Ok(match self.disk_status()? {
            DiskStatus::Unknown => RegistrationFacts::Clean,
            DiskStatus::Orphaned => RegistrationFacts::OrphanedDisk,
            DiskStatus::OwnedBy(owner) => RegistrationFacts::StaleOwner(owner),
        })
    }

    /// Make sure the VM is registered, repairing stale state first.
    ///
    /// Idempotent: when the VM is already known nothing is changed. Any
    /// failing step aborts registration; nothing is retried.
    pub fn ensure_registered(&self) -> VboxResult<RegistrationReport> {
        let facts = self.observe()?;
        let plan = tasks::registration_plan(&facts, self.vm);

        if plan.is_empty() {
            tracing::debug!(vm = %self.vm.name, "Virtual machine already registered");
        } else {
            tracing::info!(
                vm = %self.vm.name,
                facts = ?facts,
                steps = ?plan.task_names(),
                "Registering virtual machine"
            );
        }

        let metrics = PipelineExecutor::execute(plan, self)?;
        tracing::debug!(
            vm = %self.vm.name,
            total_ms = metrics.total_duration_ms,
            "Registration finished"
        );
        Ok(RegistrationReport { facts, metrics })
    }

    /// Remove a VM and release our disk.
    ///
    /// Always attempts all three steps in order (storage controller, VM
    /// record, medium), and returns the first failure.
    pub fn deregister(&self, identity: &str) -> VboxResult<()> {
        tracing::info!(vm = identity, "Deregistering virtual machine");

        let steps = [
            (
                VboxCommand::remove_storage_controller(identity),
                "deregister",
                "Removing storage controller from virtual machine",
            ),
            (
                VboxCommand::unregister_vm(identity),
                "delete VM",
                "Removing virtual machine from VirtualBox",
            ),
            (
                VboxCommand::close_medium(&self.vm.disk_path()),
                "remove virtual disk",
                "Removing virtual disk drive from VirtualBox",
            ),
        ];

        let mut first_error = None;
        for (command, item, message) in steps {
            tracing::info!(vm = identity, "{}", message);
            if let Err(e) = run_checked(self.executor, &command, item) {
                tracing::warn!(vm = identity, item, error = %e, "Deregistration step failed");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Standalone stale recovery: find whoever owns our disk and remove it.
    ///
    /// If no owning VM can be identified (the query failed, or the disk is
    /// known to no VM), the medium is closed directly and a failure to do so
    /// is only logged.
    pub fn deregister_stale(&self) -> VboxResult<()> {
        let output = self
            .executor
            .execute(&VboxCommand::show_hd_info(&self.vm.disk_path()))?;

        match parser::owner_uuid(&output.text) {
            Some(owner) => {
                tracing::info!(vm = %self.vm.name, owner, "Found stale VM owning disk");
                self.deregister(owner)
            }
            None => {
                self.release_disk_lenient();
                Ok(())
            }
        }
    }

    /// Close our medium, logging instead of failing.
    pub(crate) fn release_disk_lenient(&self) {
        let command = VboxCommand::close_medium(&self.vm.disk_path());
        match self.executor.execute(&command) {
            Ok(output) if output.success() => {
                tracing::debug!(vm = %self.vm.name, "Released disk");
            }
            Ok(output) => tracing::warn!(
                vm = %self.vm.name,
                command = %self.executor.describe(&command),
                status = ?output.status,
                output = %output.text,
                "Failed to release disk, continuing"
            ),
            Err(e) => tracing::warn!(
                vm = %self.vm.name,
                error = %e,
                "Failed to release disk, continuing"
            ),
        }
    }
}
