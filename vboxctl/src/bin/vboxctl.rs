//! vboxctl - drive a task VM from the command line.
//!
//! Every invocation loads the controller configuration, observes the VM's live
//! state and performs one operation. Exit status is 0 on success, 1 on
//! failure and 2 when `run` stopped after registration as configured.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use vboxctl::logging::{LogOptions, init_logging};
use vboxctl::{ControllerOptions, RunOutcome, VboxVm};

const EXIT_REGISTER_ONLY: u8 = 2;

#[derive(Parser)]
#[command(name = "vboxctl", version, about)]
struct Cli {
    /// Controller configuration (JSON).
    #[arg(long, short)]
    config: PathBuf,

    /// Also write logs to this directory.
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Also write logs to the per-user data directory.
    #[arg(long, conflicts_with = "log_dir")]
    log: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register the VM, repairing stale registrations, and boot it.
    Run,
    /// Boot a registered, stopped VM.
    Start,
    /// Save the VM's state if it is active.
    Stop,
    Pause,
    Resume,
    /// Stop the VM, deregister it and release its disk.
    Cleanup,
    /// Print the live VM status.
    Status,
    /// Limit guest CPU time to a fraction (0.0 to 1.0) of one host core.
    CpuCap { fraction: f64 },
    /// Limit NIC throughput, in bytes per second.
    NetCap { bytes_per_second: f64 },
    /// Connect or disconnect the NIC cable.
    Network { state: NetworkState },
    /// Print the host process id of the VM.
    Pid,
    /// Print process id and network counters as JSON.
    Stats,
}

#[derive(Clone, Copy, ValueEnum)]
enum NetworkState {
    On,
    Off,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_options = LogOptions {
        log_dir: log_dir(&cli),
        ..LogOptions::default()
    };
    let _guard = match init_logging(&log_options) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("vboxctl: {e}");
            return ExitCode::FAILURE;
        }
    };

    match execute(cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn log_dir(cli: &Cli) -> Option<PathBuf> {
    if cli.log_dir.is_some() {
        return cli.log_dir.clone();
    }
    if cli.log {
        return dirs::data_local_dir().map(|dir| dir.join("vboxctl").join("logs"));
    }
    None
}

fn execute(cli: Cli) -> anyhow::Result<ExitCode> {
    let options = ControllerOptions::from_file(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let mut vm = VboxVm::new(options).context("creating controller")?;

    // run, stop and cleanup observe the hypervisor themselves.
    if !matches!(cli.command, Command::Run | Command::Stop | Command::Cleanup) {
        vm.refresh().context("querying VM state")?;
    }

    match cli.command {
        Command::Run => match vm.run()? {
            RunOutcome::RegisterOnly => return Ok(ExitCode::from(EXIT_REGISTER_ONLY)),
            outcome => tracing::info!(vm = %vm.identity(), ?outcome, "VM is up"),
        },
        Command::Start => vm.start()?,
        Command::Stop => vm.stop()?,
        Command::Pause => vm.pause()?,
        Command::Resume => vm.resume()?,
        Command::Cleanup => vm.cleanup()?,
        Command::Status => println!("{}", vm.status()),
        Command::CpuCap { fraction } => vm.set_cpu_cap(fraction)?,
        Command::NetCap { bytes_per_second } => vm.set_network_cap(bytes_per_second)?,
        Command::Network { state } => vm.set_network_enabled(matches!(state, NetworkState::On))?,
        Command::Pid => println!("{}", vm.process_id()?),
        Command::Stats => println!("{}", serde_json::to_string_pretty(&vm.telemetry()?)?),
    }

    Ok(ExitCode::SUCCESS)
}
