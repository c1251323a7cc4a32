//! Resource throttles and runtime telemetry.

use super::VboxVm;
use crate::errors::{VboxError, VboxResult};
use crate::manage::{VboxCommand, run_checked};
use crate::parser;
use serde::Serialize;

const RECEIVE_BYTES_PATTERN: &str = "/Devices/*/ReceiveBytes";
const TRANSMIT_BYTES_PATTERN: &str = "/Devices/*/TransmitBytes";

/// Point-in-time runtime figures of a VM.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VmTelemetry {
    /// Host process id, `None` if the VM log does not show one yet.
    pub pid: Option<u32>,
    pub bytes_sent: f64,
    pub bytes_received: f64,
}

/// CPU fraction to the integer percentage VirtualBox expects. Truncates.
pub fn cpu_cap_percent(fraction: f64) -> u32 {
    (fraction * 100.0) as u32
}

/// Bytes per second to kilobits per second. Truncates.
pub fn nic_speed_kbps(bytes_per_second: f64) -> u64 {
    (bytes_per_second * 8.0 / 1000.0) as u64
}

pub(super) fn set_cpu_cap(vm: &mut VboxVm, fraction: f64) -> VboxResult<()> {
    if !(0.0..=1.0).contains(&fraction) {
        return Err(VboxError::InvalidArgument(format!(
            "cpu fraction must be between 0.0 and 1.0, got {fraction}"
        )));
    }
    require_registered(vm, "set CPU cap")?;

    let percent = cpu_cap_percent(fraction);
    tracing::info!(vm = %vm.identity(), percent, "Setting CPU execution cap");
    let command = VboxCommand::set_cpu_execution_cap(vm.identity(), percent);
    run_checked(vm.executor(), &command, "CPU throttle").map(drop)
}

pub(super) fn set_network_cap(vm: &mut VboxVm, bytes_per_second: f64) -> VboxResult<()> {
    if !bytes_per_second.is_finite() || bytes_per_second < 0.0 {
        return Err(VboxError::InvalidArgument(format!(
            "network bandwidth must be a non-negative number, got {bytes_per_second}"
        )));
    }
    require_registered(vm, "set network cap")?;

    let kbps = nic_speed_kbps(bytes_per_second);
    tracing::info!(vm = %vm.identity(), kbps, "Setting network bandwidth cap");
    let command = VboxCommand::set_nic_speed(vm.identity(), kbps);
    run_checked(vm.executor(), &command, "network throttle").map(drop)
}

pub(super) fn set_network_enabled(vm: &mut VboxVm, enabled: bool) -> VboxResult<()> {
    require_registered(vm, "toggle network")?;

    tracing::info!(vm = %vm.identity(), enabled, "Setting network cable state");
    let command = VboxCommand::set_cable_connected(vm.identity(), enabled);
    run_checked(vm.executor(), &command, "network access")?;
    vm.network_suspended = !enabled;
    Ok(())
}

pub(super) fn process_id(vm: &VboxVm) -> VboxResult<u32> {
    require_registered(vm, "read process id")?;

    let log = run_checked(vm.executor(), &VboxCommand::show_vm_log(vm.identity()), "VM log")?;
    parser::process_id(&log)
        .ok_or_else(|| VboxError::NotFound(format!("process id in log of VM '{}'", vm.identity())))
}

pub(super) fn network_bytes_received(vm: &VboxVm) -> VboxResult<f64> {
    network_counter(vm, RECEIVE_BYTES_PATTERN)
}

pub(super) fn network_bytes_sent(vm: &VboxVm) -> VboxResult<f64> {
    network_counter(vm, TRANSMIT_BYTES_PATTERN)
}

pub(super) fn telemetry(vm: &VboxVm) -> VboxResult<VmTelemetry> {
    let pid = match process_id(vm) {
        Ok(pid) => Some(pid),
        Err(e) if e.is_not_found() => None,
        Err(e) => return Err(e),
    };
    Ok(VmTelemetry {
        pid,
        bytes_sent: network_bytes_sent(vm)?,
        bytes_received: network_bytes_received(vm)?,
    })
}

fn network_counter(vm: &VboxVm, pattern: &str) -> VboxResult<f64> {
    require_registered(vm, "read network counters")?;

    let command = VboxCommand::statistics(vm.identity(), pattern);
    let dump = run_checked(vm.executor(), &command, "network statistics")?;
    let total = parser::sum_counters(&dump);
    tracing::debug!(vm = %vm.identity(), pattern, total, "Read network counters");
    Ok(total)
}

fn require_registered(vm: &VboxVm, operation: &str) -> VboxResult<()> {
    if vm.status.is_registered() {
        return Ok(());
    }
    Err(VboxError::InvalidState(format!(
        "cannot {operation}: VM '{}' is not registered",
        vm.identity()
    )))
}
