//! Subprocess executor for the VBoxManage binary.

use super::{CommandExecutor, CommandOutput, VboxCommand};
use crate::errors::{VboxError, VboxResult};
use crate::runtime::ManageOptions;
use std::ffi::OsString;
use std::io::{ErrorKind, PipeReader, Read};
use std::process::{Command, Stdio};

/// Environment variable VirtualBox reads its per-user configuration from.
pub const VBOX_USER_HOME_ENV: &str = "VBOX_USER_HOME";

const READ_CHUNK: usize = 8 * 1024;

/// Executes commands by spawning the management tool.
///
/// stdout and stderr share one pipe so the captured text keeps the order in
/// which the tool wrote it. The pipe is drained while the child runs; the
/// child never stalls on a full pipe buffer.
#[derive(Debug, Clone)]
pub struct VBoxManage {
    options: ManageOptions,
}

impl VBoxManage {
    /// Create an executor, preparing the configuration home if one is set.
    pub fn new(options: ManageOptions) -> VboxResult<Self> {
        if let Some(home) = &options.user_home {
            if !home.exists() {
                std::fs::create_dir_all(home)?;
                tracing::debug!(path = %home.display(), "Created VirtualBox user home");
            }
        }
        Ok(Self { options })
    }

    pub fn options(&self) -> &ManageOptions {
        &self.options
    }

    fn command(&self, command: &VboxCommand) -> Command {
        let mut cmd = Command::new(&self.options.program);
        if self.options.quiet {
            cmd.arg("-q");
        }
        cmd.args(command.argv());

        if let Some(path) = self.search_path() {
            cmd.env("PATH", path);
        }
        if let Some(home) = &self.options.user_home {
            cmd.env(VBOX_USER_HOME_ENV, home);
        }
        cmd.stdin(Stdio::null());
        cmd
    }

    /// `PATH` with the install directory in front, if one is configured.
    fn search_path(&self) -> Option<OsString> {
        let install_dir = self.options.install_dir.as_ref()?;
        let mut dirs = vec![install_dir.clone()];
        if let Some(current) = std::env::var_os("PATH") {
            dirs.extend(std::env::split_paths(&current));
        }
        match std::env::join_paths(dirs) {
            Ok(joined) => Some(joined),
            Err(e) => {
                tracing::warn!(
                    install_dir = %install_dir.display(),
                    error = %e,
                    "Failed to extend search path, using inherited PATH"
                );
                None
            }
        }
    }
}

impl CommandExecutor for VBoxManage {
    fn execute(&self, command: &VboxCommand) -> VboxResult<CommandOutput> {
        tracing::trace!(command = %self.describe(command), "Executing VBoxManage");

        let (mut reader, writer) = std::io::pipe()?;

        // The Command holds our copies of the write end; it must be dropped
        // before draining or the reader never sees EOF.
        let mut child = {
            let mut cmd = self.command(command);
            cmd.stdout(writer.try_clone()?);
            cmd.stderr(writer);
            cmd.spawn().map_err(|source| {
                let command = self.describe(command);
                tracing::error!(command = %command, error = %source, "Failed to spawn VBoxManage");
                VboxError::Spawn { command, source }
            })?
        };

        let drained = drain(&mut reader);
        let status = child.wait()?;
        let text = drained?;

        tracing::trace!(status = ?status.code(), bytes = text.len(), "VBoxManage exited");
        Ok(CommandOutput::new(status.code(), text))
    }

    fn describe(&self, command: &VboxCommand) -> String {
        let program = self.options.program.to_string_lossy();
        if self.options.quiet {
            format!("{} -q {}", program, command)
        } else {
            format!("{} {}", program, command)
        }
    }
}

/// Read until every writer has closed the pipe.
fn drain(reader: &mut PipeReader) -> VboxResult<String> {
    let mut captured = Vec::new();
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => captured.extend_from_slice(&chunk[..n]),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(String::from_utf8_lossy(&captured).into_owned())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn shell() -> VBoxManage {
        VBoxManage::new(ManageOptions {
            program: PathBuf::from("sh"),
            quiet: false,
            ..Default::default()
        })
        .unwrap()
    }

    fn script(body: &str) -> VboxCommand {
        VboxCommand::new("-c").arg(body)
    }

    #[test]
    fn test_interleaves_stdout_and_stderr() {
        let output = shell()
            .execute(&script("echo one; echo two 1>&2; echo three"))
            .unwrap();
        assert!(output.success());
        assert_eq!(output.text, "one\ntwo\nthree\n");
    }

    #[test]
    fn test_non_zero_exit_keeps_output() {
        let output = shell()
            .execute(&script("echo VBOX_E_OBJECT_NOT_FOUND; exit 1"))
            .unwrap();
        assert!(!output.success());
        assert_eq!(output.status, Some(1));
        assert!(output.text.contains("VBOX_E_OBJECT_NOT_FOUND"));
    }

    #[test]
    fn test_output_larger_than_pipe_buffer() {
        let output = shell()
            .execute(&script("i=0; while [ $i -lt 4000 ]; do echo 0123456789012345678901234567890123456789; i=$((i+1)); done"))
            .unwrap();
        assert!(output.success());
        assert_eq!(output.text.len(), 4000 * 41);
    }

    #[test]
    fn test_spawn_failure() {
        let executor = VBoxManage::new(ManageOptions {
            program: PathBuf::from("/nonexistent/VBoxManage"),
            ..Default::default()
        })
        .unwrap();

        let err = executor.execute(&VboxCommand::show_vm_info("vm")).unwrap_err();
        match err {
            VboxError::Spawn { command, .. } => {
                assert_eq!(
                    command,
                    "/nonexistent/VBoxManage -q showvminfo vm --machinereadable"
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_user_home_created_and_exported() {
        let dir = tempfile::tempdir().unwrap();
        let home = dir.path().join("virtualbox");
        let executor = VBoxManage::new(ManageOptions {
            program: PathBuf::from("sh"),
            user_home: Some(home.clone()),
            quiet: false,
            ..Default::default()
        })
        .unwrap();
        assert!(home.is_dir());

        let output = executor.execute(&script("printf %s \"$VBOX_USER_HOME\"")).unwrap();
        assert_eq!(output.text, home.to_string_lossy());
    }

    #[test]
    fn test_install_dir_prepended_to_path() {
        let executor = VBoxManage::new(ManageOptions {
            program: PathBuf::from("sh"),
            install_dir: Some(PathBuf::from("/opt/VirtualBox")),
            quiet: false,
            ..Default::default()
        })
        .unwrap();

        let output = executor.execute(&script("printf %s \"$PATH\"")).unwrap();
        assert!(output.text.starts_with("/opt/VirtualBox:"));
    }
}
