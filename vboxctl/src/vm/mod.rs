//! The controlled virtual machine.
//!
//! `VboxVm` owns the descriptor of one task's VM and every operation on it.
//! Lifecycle transitions live in `lifecycle`, throttles and telemetry in
//! `resources`; this module holds the state they share.
//!
//! All operations block until the management tool has exited. Calls on one
//! `VboxVm` must be serialized by the caller (`&mut self` enforces it);
//! separate instances share nothing and may run concurrently.

mod lifecycle;
mod resources;
mod state;

pub use lifecycle::RunOutcome;
pub use resources::{VmTelemetry, cpu_cap_percent, nic_speed_kbps};
pub use state::VmStatus;

use crate::errors::VboxResult;
use crate::manage::{CommandExecutor, VBoxManage};
use crate::registration::{Registrar, RegistrationReport};
use crate::runtime::{ControllerOptions, SettleOptions, VmOptions};

/// A VirtualBox VM driven through the management tool.
pub struct VboxVm {
    options: VmOptions,
    settle: SettleOptions,
    executor: Box<dyn CommandExecutor>,
    status: VmStatus,
    network_suspended: bool,
}

impl VboxVm {
    /// Build a controller that spawns the configured management tool.
    ///
    /// Nothing is queried yet; the status starts as `Unregistered` until
    /// `run()`, `register()` or `refresh()` observes the hypervisor.
    pub fn new(options: ControllerOptions) -> VboxResult<Self> {
        options.validate()?;
        let executor = VBoxManage::new(options.manage)?;
        Ok(Self::with_executor(
            options.vm,
            options.settle,
            Box::new(executor),
        ))
    }

    /// Build a controller around any executor.
    pub fn with_executor(
        options: VmOptions,
        settle: SettleOptions,
        executor: Box<dyn CommandExecutor>,
    ) -> Self {
        let network_suspended = !options.enable_network;
        Self {
            options,
            settle,
            executor,
            status: VmStatus::Unregistered,
            network_suspended,
        }
    }

    /// Name the hypervisor addresses this VM by.
    pub fn identity(&self) -> &str {
        &self.options.name
    }

    pub fn options(&self) -> &VmOptions {
        &self.options
    }

    /// Last known status. Only `refresh()` and `stop()` consult the hypervisor.
    pub fn status(&self) -> VmStatus {
        self.status
    }

    /// True only between a successful `pause()` and the next `resume()` or `stop()`.
    pub fn is_suspended(&self) -> bool {
        self.status == VmStatus::Paused
    }

    pub fn is_network_suspended(&self) -> bool {
        self.network_suspended
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Register (repairing stale state) and boot the VM.
    pub fn run(&mut self) -> VboxResult<RunOutcome> {
        lifecycle::run(self)
    }

    /// Ensure the VM is registered without booting it.
    pub fn register(&mut self) -> VboxResult<RegistrationReport> {
        lifecycle::register(self)
    }

    pub fn start(&mut self) -> VboxResult<()> {
        lifecycle::start(self)
    }

    /// Save the VM's state if the hypervisor reports it active.
    pub fn stop(&mut self) -> VboxResult<()> {
        lifecycle::stop(self)
    }

    pub fn pause(&mut self) -> VboxResult<()> {
        lifecycle::pause(self)
    }

    pub fn resume(&mut self) -> VboxResult<()> {
        lifecycle::resume(self)
    }

    /// Stop and deregister the VM, releasing its disk. Safe from any state.
    pub fn cleanup(&mut self) -> VboxResult<()> {
        lifecycle::cleanup(self)
    }

    /// Reserved for periodic live-state checks; does nothing.
    pub fn poll(&mut self) -> VboxResult<()> {
        Ok(())
    }

    /// Re-read the live state from the hypervisor.
    pub fn refresh(&mut self) -> VboxResult<VmStatus> {
        lifecycle::refresh(self)
    }

    // ========================================================================
    // Resources & telemetry
    // ========================================================================

    /// Limit guest CPU time to `fraction` (0.0 to 1.0) of one host core.
    pub fn set_cpu_cap(&mut self, fraction: f64) -> VboxResult<()> {
        resources::set_cpu_cap(self, fraction)
    }

    /// Limit NIC throughput to `bytes_per_second`.
    pub fn set_network_cap(&mut self, bytes_per_second: f64) -> VboxResult<()> {
        resources::set_network_cap(self, bytes_per_second)
    }

    /// Connect or disconnect the NIC cable.
    ///
    /// The caller decides whether the workload may have network access; this
    /// only performs the toggle.
    pub fn set_network_enabled(&mut self, enabled: bool) -> VboxResult<()> {
        resources::set_network_enabled(self, enabled)
    }

    /// Host process id of the running VM.
    ///
    /// `VboxError::NotFound` if the VM log has no process id yet.
    pub fn process_id(&self) -> VboxResult<u32> {
        resources::process_id(self)
    }

    pub fn network_bytes_received(&self) -> VboxResult<f64> {
        resources::network_bytes_received(self)
    }

    pub fn network_bytes_sent(&self) -> VboxResult<f64> {
        resources::network_bytes_sent(self)
    }

    pub fn telemetry(&self) -> VboxResult<VmTelemetry> {
        resources::telemetry(self)
    }

    fn registrar(&self) -> Registrar<'_> {
        Registrar::new(self.executor.as_ref(), &self.options)
    }

    fn executor(&self) -> &dyn CommandExecutor {
        self.executor.as_ref()
    }
}

impl std::fmt::Debug for VboxVm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VboxVm")
            .field("name", &self.options.name)
            .field("status", &self.status)
            .field("network_suspended", &self.network_suspended)
            .finish()
    }
}
