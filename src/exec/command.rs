// src/exec/command.rs

//! Shell command runner shared by `kind = "command"` tasks and the
//! command-line site generator.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::exec::action::{BoxFuture, TaskAction};

/// Run `cmd` through the platform shell in `cwd` and wait for it.
///
/// Output is forwarded line by line to the log. A non-zero exit status is an
/// error. The child is killed if the returned future is dropped (e.g. when a
/// task timeout fires).
pub async fn run_shell(label: &str, cmd: &str, cwd: &Path) -> Result<()> {
    info!(task = %label, cmd = %cmd, "starting process");

    let mut command = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    };

    command
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command
        .spawn()
        .with_context(|| format!("spawning process for task '{label}'"))?;

    if let Some(stdout) = child.stdout.take() {
        let label = label.to_string();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                info!(task = %label, "stdout: {}", line);
            }
        });
    }

    // Always consume stderr so buffers don't fill.
    if let Some(stderr) = child.stderr.take() {
        let label = label.to_string();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(task = %label, "stderr: {}", line);
            }
        });
    }

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for process of task '{label}'"))?;

    let code = status.code().unwrap_or(-1);
    info!(task = %label, exit_code = code, success = status.success(), "process exited");

    if !status.success() {
        bail!("command `{cmd}` exited with code {code}");
    }
    Ok(())
}

/// `kind = "command"`: run an arbitrary shell command.
#[derive(Debug, Clone)]
pub struct ShellCommand {
    label: String,
    cmd: String,
    cwd: PathBuf,
}

impl ShellCommand {
    pub fn new(label: impl Into<String>, cmd: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            cmd: cmd.into(),
            cwd: cwd.into(),
        }
    }
}

impl TaskAction for ShellCommand {
    fn run(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(run_shell(&self.label, &self.cmd, &self.cwd))
    }

    fn describe(&self) -> String {
        format!("sh: {}", self.cmd)
    }
}

/// Quote a single shell argument if it contains anything unusual.
pub fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./,:=@%+".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
