//! Build process plumbing: shell selection, process groups, exit codes.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use tokio::process::{Child, Command};

use crate::config::ShellConfig;

/// Shell that runs build command lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shell {
    pub binary: PathBuf,
    /// Arguments placed before the command line (e.g. `["-c"]` or `["/C"]`).
    pub args: Vec<String>,
}

impl Shell {
    /// Config override if set, otherwise the platform shell.
    #[must_use]
    pub fn from_config(config: Option<&ShellConfig>) -> Self {
        if let Some(cfg) = config
            && let Some(binary) = &cfg.binary
        {
            let args = cfg.args.clone().unwrap_or_else(|| default_args_for(binary));
            return Self {
                binary: PathBuf::from(binary),
                args,
            };
        }
        Self::platform()
    }

    #[cfg(windows)]
    #[must_use]
    pub fn platform() -> Self {
        let comspec = std::env::var("ComSpec")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(r"C:\Windows\System32\cmd.exe"));
        Self {
            binary: comspec,
            args: vec!["/C".to_string()],
        }
    }

    #[cfg(not(windows))]
    #[must_use]
    pub fn platform() -> Self {
        Self {
            binary: PathBuf::from("/bin/sh"),
            args: vec!["-c".to_string()],
        }
    }
}

/// Infer default args for a shell binary name.
fn default_args_for(binary: &str) -> Vec<String> {
    let name = Path::new(binary)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(binary)
        .to_lowercase();

    match name.as_str() {
        "cmd" => vec!["/C".to_string()],
        "pwsh" | "powershell" => vec!["-NoProfile".to_string(), "-Command".to_string()],
        _ => vec!["-c".to_string()],
    }
}

/// Everything needed to start one build run.
#[derive(Debug, Clone)]
pub struct BuildCommand {
    /// Command line as echoed to the transcript.
    pub line: String,
    pub shell: Shell,
    pub cwd: PathBuf,
    pub env: Vec<(String, String)>,
}

impl BuildCommand {
    pub(crate) fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.shell.binary);
        cmd.args(&self.shell.args)
            .arg(&self.line)
            .current_dir(&self.cwd)
            .envs(self.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        cmd
    }
}

/// Kill a build and everything it started.
///
/// On Unix the child leads its own process group, so the whole group gets
/// `SIGKILL`. Elsewhere only the direct child is killed. A child that has
/// already been reaped is not an error.
pub fn kill_process_tree(child: &mut Child) -> std::io::Result<()> {
    let Some(pid) = child.id() else {
        return Ok(());
    };

    #[cfg(unix)]
    {
        if let Ok(pgid) = libc::pid_t::try_from(pid) {
            // SAFETY: killpg has no memory-safety preconditions.
            if unsafe { libc::killpg(pgid, libc::SIGKILL) } == 0 {
                return Ok(());
            }
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::ESRCH) {
                tracing::debug!(pid, "killpg failed, killing child only: {err}");
            }
        }
    }

    #[cfg(not(unix))]
    let _ = pid;

    match child.start_kill() {
        Err(err) if err.kind() != std::io::ErrorKind::InvalidInput => Err(err),
        _ => Ok(()),
    }
}

/// Exit code for a finished process; `128 + signal` for signal deaths on Unix.
#[must_use]
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}
