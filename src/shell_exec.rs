//! Single chokepoint for subprocess execution.
//!
//! Every external command (git, the issue tracker CLI, the database
//! provider's CLI, validation scripts, the AI agent) should be run through
//! [`Cmd`] so that it gets consistent debug logging and a single place to
//! extend with audit-trail recording ([`crate::command_log`]).

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::time::Instant;

use log::debug;

/// A builder around [`std::process::Command`] that logs what it runs.
pub struct Cmd {
    program: String,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    context: Option<String>,
    envs: Vec<(String, String)>,
}

impl Cmd {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_string_lossy().into_owned(),
            args: Vec::new(),
            current_dir: None,
            context: None,
            envs: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for a in args {
            self.args.push(a.as_ref().to_string_lossy().into_owned());
        }
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn env(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.envs
            .push((key.as_ref().to_string(), value.as_ref().to_string()));
        self
    }

    /// A short label identifying why this command is being run, shown in
    /// logs and the JSONL audit trail (e.g. a workspace branch name).
    pub fn context(mut self, context: impl AsRef<str>) -> Self {
        self.context = Some(context.as_ref().to_string());
        self
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        for (k, v) in &self.envs {
            cmd.env(k, v);
        }
        cmd
    }

    fn command_line(&self) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }

    /// Run the command to completion, capturing stdout/stderr, and return
    /// the raw [`Output`]. Does not interpret the exit code.
    pub fn run(&self) -> io::Result<Output> {
        let mut cmd = self.to_command();
        run(&mut cmd, self.context.as_deref())
    }

    /// Run the command and fail if it did not exit successfully, returning
    /// stdout as a UTF-8 string with trailing whitespace trimmed.
    pub fn run_checked(&self) -> io::Result<String> {
        let output = self.run()?;
        if !output.status.success() {
            return Err(io::Error::other(format!(
                "CHILD_EXIT_CODE:{} command failed: {}\n{}",
                output.status.code().unwrap_or(1),
                self.command_line(),
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
    }

    /// Spawn the command without waiting for completion (fire-and-forget),
    /// for long-running children such as a dev server, editor, or AI agent.
    pub fn spawn_detached(&self) -> io::Result<std::process::Child> {
        debug!("$ {} (spawn, detached)", self.command_line());
        let mut cmd = self.to_command();
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::null());
        cmd.spawn()
    }
}

/// Run a fully-built [`Command`], logging the command line, context, and
/// timing at `debug` level. The single chokepoint through which every
/// external process this crate spawns (except detached launches) passes.
pub fn run(cmd: &mut Command, context: Option<&str>) -> io::Result<Output> {
    let program = cmd.get_program().to_string_lossy().into_owned();
    let args: Vec<String> = cmd
        .get_args()
        .map(|a| a.to_string_lossy().into_owned())
        .collect();
    let line = std::iter::once(program.clone())
        .chain(args.iter().cloned())
        .collect::<Vec<_>>()
        .join(" ");
    let context_suffix = context.map(|c| format!(" [{c}]")).unwrap_or_default();
    debug!("$ {line}{context_suffix}");

    let start = Instant::now();
    let output = cmd.output();
    let duration = start.elapsed();

    match &output {
        Ok(out) => {
            debug!(
                "[wsc-trace] context={} cmd=\"{line}\" dur={}ms ok={}",
                context.unwrap_or(""),
                duration.as_millis(),
                out.status.success()
            );
            if !out.status.success() {
                debug!("  ! {}", String::from_utf8_lossy(&out.stderr).trim_end());
            }
        }
        Err(e) => {
            debug!(
                "[wsc-trace] context={} cmd=\"{line}\" dur={}ms ok=false err={e}",
                context.unwrap_or(""),
                duration.as_millis()
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_checked_captures_stdout() {
        let out = Cmd::new("echo").arg("hello").run_checked().unwrap();
        assert_eq!(out, "hello");
    }

    #[test]
    fn run_checked_fails_on_nonzero_exit() {
        let result = Cmd::new("sh").arg("-c").arg("exit 3").run_checked();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("CHILD_EXIT_CODE:3"));
    }
}
