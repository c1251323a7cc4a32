//! VM lifecycle management
//!
//! Handles registration on run, state transitions, live-state refresh and
//! teardown.

use super::{VboxVm, VmStatus};
use crate::errors::{VboxError, VboxResult};
use crate::manage::{ControlAction, VboxCommand, failure, run_checked};
use crate::parser;
use crate::registration::{RegistrationFacts, RegistrationReport};
use std::time::Duration;

/// How `run()` ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The VM was booted by this call.
    Started,
    /// The VM was already active (e.g. the controller was relaunched) and is
    /// reused as is.
    Adopted(VmStatus),
    /// Registration finished and the VM was left stopped, as configured.
    RegisterOnly,
}

pub(super) fn run(vm: &mut VboxVm) -> VboxResult<RunOutcome> {
    let report = register(vm)?;

    if vm.options.register_only {
        tracing::info!(vm = %vm.identity(), "Registration complete, not starting VM by request");
        return Ok(RunOutcome::RegisterOnly);
    }

    if report.facts == RegistrationFacts::AlreadyRegistered && vm.status.is_active() {
        tracing::info!(vm = %vm.identity(), status = %vm.status, "Adopting already active VM");
        return Ok(RunOutcome::Adopted(vm.status));
    }

    start(vm)?;
    Ok(RunOutcome::Started)
}

pub(super) fn register(vm: &mut VboxVm) -> VboxResult<RegistrationReport> {
    let report = vm.registrar().ensure_registered()?;

    if report.facts == RegistrationFacts::AlreadyRegistered {
        // A relaunched controller may find its VM running or paused.
        refresh(vm)?;
    } else {
        vm.status = VmStatus::Stopped;
    }
    if report.changed() {
        vm.network_suspended = !vm.options.enable_network;
    }
    Ok(report)
}

pub(super) fn start(vm: &mut VboxVm) -> VboxResult<()> {
    if !vm.status.can_start() {
        return Err(VboxError::InvalidState(format!(
            "cannot start VM '{}' while {}",
            vm.identity(),
            vm.status
        )));
    }

    tracing::info!(vm = %vm.identity(), "Starting virtual machine");
    run_checked(vm.executor(), &VboxCommand::start_vm(vm.identity()), "start VM")?;
    vm.status = VmStatus::Running;

    settle(vm.settle.boot, "boot");
    Ok(())
}

pub(super) fn stop(vm: &mut VboxVm) -> VboxResult<()> {
    // The cached status may be stale: the guest can power itself off.
    let status = refresh(vm)?;
    if !status.can_stop() {
        tracing::debug!(vm = %vm.identity(), %status, "VM not active, nothing to stop");
        return Ok(());
    }

    tracing::info!(vm = %vm.identity(), "Stopping virtual machine");
    let command = VboxCommand::control_vm(vm.identity(), ControlAction::SaveState);
    run_checked(vm.executor(), &command, "stop VM")?;
    vm.status = VmStatus::Stopped;
    Ok(())
}

pub(super) fn pause(vm: &mut VboxVm) -> VboxResult<()> {
    if !vm.status.can_pause() {
        return Err(VboxError::InvalidState(format!(
            "cannot pause VM '{}' while {}",
            vm.identity(),
            vm.status
        )));
    }

    tracing::info!(vm = %vm.identity(), "Pausing virtual machine");
    let command = VboxCommand::control_vm(vm.identity(), ControlAction::Pause);
    run_checked(vm.executor(), &command, "pause VM")?;
    vm.status = VmStatus::Paused;
    Ok(())
}

pub(super) fn resume(vm: &mut VboxVm) -> VboxResult<()> {
    if !vm.status.can_resume() {
        return Err(VboxError::InvalidState(format!(
            "cannot resume VM '{}' while {}",
            vm.identity(),
            vm.status
        )));
    }

    tracing::info!(vm = %vm.identity(), "Resuming virtual machine");
    let command = VboxCommand::control_vm(vm.identity(), ControlAction::Resume);
    run_checked(vm.executor(), &command, "resume VM")?;
    vm.status = VmStatus::Running;
    Ok(())
}

/// Stop, then deregister. Every step runs; the first error is returned.
///
/// If deregistration fails the status is re-read rather than assumed gone.
pub(super) fn cleanup(vm: &mut VboxVm) -> VboxResult<()> {
    tracing::info!(vm = %vm.identity(), "Cleaning up virtual machine");
    let mut first_error = None;

    if let Err(e) = stop(vm) {
        tracing::warn!(vm = %vm.identity(), error = %e, "Stop failed during cleanup");
        first_error.get_or_insert(e);
    }

    let deregistered = {
        let registrar = vm.registrar();
        match registrar.is_registered(vm.identity()) {
            Ok(true) => registrar.deregister(vm.identity()),
            Ok(false) => registrar.deregister_stale(),
            Err(e) => Err(e),
        }
    };
    match deregistered {
        Ok(()) => vm.status = VmStatus::Unregistered,
        Err(e) => {
            first_error.get_or_insert(e);
            if let Err(e) = refresh(vm) {
                tracing::warn!(vm = %vm.identity(), error = %e, "Failed to refresh state after cleanup");
            }
        }
    }
    settle(vm.settle.teardown, "teardown");

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Rebuild the cached status from what the hypervisor reports now.
pub(super) fn refresh(vm: &mut VboxVm) -> VboxResult<VmStatus> {
    let command = VboxCommand::show_vm_info(vm.identity());
    let output = vm.executor().execute(&command)?;

    if output.text.contains(parser::OBJECT_NOT_FOUND) {
        vm.status = VmStatus::Unregistered;
    } else if !output.success() {
        return Err(failure(vm.executor(), &command, output, "query VM state"));
    } else {
        vm.status = VmStatus::from_live(parser::vm_state(&output.text));
        if let Some(connected) = parser::cable_connected(&output.text) {
            vm.network_suspended = !connected;
        }
    }

    tracing::debug!(
        vm = %vm.identity(),
        status = %vm.status,
        network_suspended = vm.network_suspended,
        "Refreshed VM state"
    );
    Ok(vm.status)
}

fn settle(duration: Duration, phase: &str) {
    if duration.is_zero() {
        return;
    }
    tracing::debug!(phase, duration_ms = duration.as_millis() as u64, "Waiting for VM to settle");
    std::thread::sleep(duration);
}
