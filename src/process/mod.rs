//! Process Supervisor (C6): port assignment, launching and terminating
//! long-running children (dev server, editor, AI agent, terminal).

use crate::config::{PermissionMode, WorkflowConfig};
use crate::shell_exec::Cmd;
use std::fmt;
use std::path::Path;

#[derive(Debug)]
pub enum ProcessError {
    SpawnFailed { program: String, error: String },
    PortOutOfRange(u32),
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessError::SpawnFailed { program, error } => {
                write!(f, "failed to launch '{program}': {error}")
            }
            ProcessError::PortOutOfRange(port) => write!(f, "computed port {port} is outside [1, 65535]"),
        }
    }
}

impl std::error::Error for ProcessError {}

#[derive(Debug, Clone, Copy)]
pub struct DevServerDescriptor {
    pub port: u16,
}

/// §4.6 `calculatePort`: `basePort + number` for issue/PR, `basePort` for
/// branch-kind workspaces. A pure function — deliberately not a registry
/// (§9 "Port as address, not lock").
pub fn calculate_port(base_port: u32, number: Option<u64>) -> Result<u16, ProcessError> {
    let port = base_port as u64 + number.unwrap_or(0);
    if port == 0 || port > 65535 {
        return Err(ProcessError::PortOutOfRange(port as u32));
    }
    Ok(port as u16)
}

/// Detects a project's dev server command from its manifest. Returns `None`
/// when no `dev`/`start` script is declared.
pub fn detect_dev_server(path: &Path) -> Option<String> {
    let manifest = path.join("package.json");
    let contents = std::fs::read_to_string(manifest).ok()?;
    let value: serde_json::Value = serde_json::from_str(&contents).ok()?;
    let scripts = value.get("scripts")?.as_object()?;
    for key in ["dev", "start"] {
        if scripts.contains_key(key) {
            return Some(key.to_string());
        }
    }
    None
}

pub trait ProcessSupervisor {
    fn launch_ide(&self, path: &Path) -> Result<(), ProcessError>;
    fn launch_dev_server(&self, path: &Path, port: u16) -> Result<(), ProcessError>;
    fn launch_ai_agent(&self, path: &Path, config: &WorkflowConfig, context_payload: &str) -> Result<(), ProcessError>;
    fn launch_terminal(&self, path: &Path) -> Result<(), ProcessError>;
    /// Best-effort: kills by recorded descriptor, falling back to
    /// port-based lookup (§4.6).
    fn terminate_for(&self, path: &Path, port: Option<u16>) -> Result<(), ProcessError>;
}

pub struct SystemProcessSupervisor;

impl SystemProcessSupervisor {
    pub fn new() -> Self {
        Self
    }

    fn spawn_detached(&self, program: &str, args: &[&str], cwd: &Path, envs: &[(&str, String)]) -> Result<(), ProcessError> {
        let mut cmd = Cmd::new(program).current_dir(cwd).args(args).context(program);
        for (k, v) in envs {
            cmd = cmd.env(*k, v);
        }
        cmd.spawn_detached()
            .map(|_child| ())
            .map_err(|e| ProcessError::SpawnFailed {
                program: program.to_string(),
                error: e.to_string(),
            })
    }
}

impl Default for SystemProcessSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSupervisor for SystemProcessSupervisor {
    fn launch_ide(&self, path: &Path) -> Result<(), ProcessError> {
        let editor = which::which("code")
            .map(|_| "code")
            .unwrap_or("$EDITOR");
        self.spawn_detached(editor, &["."], path, &[])
    }

    fn launch_dev_server(&self, path: &Path, port: u16) -> Result<(), ProcessError> {
        let script = detect_dev_server(path).unwrap_or_else(|| "dev".to_string());
        self.spawn_detached("npm", &["run", &script], path, &[("PORT", port.to_string())])
    }

    fn launch_ai_agent(&self, path: &Path, config: &WorkflowConfig, context_payload: &str) -> Result<(), ProcessError> {
        let permission_flag = match config.permission_mode {
            PermissionMode::Plan => "plan",
            PermissionMode::AcceptEdits => "acceptEdits",
            PermissionMode::BypassPermissions => "bypassPermissions",
            PermissionMode::Default => "default",
        };
        self.spawn_detached(
            "agent",
            &["--permission-mode", permission_flag],
            path,
            &[("WSC_AGENT_CONTEXT", context_payload.to_string())],
        )
    }

    fn launch_terminal(&self, path: &Path) -> Result<(), ProcessError> {
        let shell = std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string());
        self.spawn_detached(&shell, &[], path, &[])
    }

    fn terminate_for(&self, path: &Path, port: Option<u16>) -> Result<(), ProcessError> {
        if let Some(port) = port {
            let _ = Cmd::new("sh")
                .arg("-c")
                .arg(format!("lsof -ti tcp:{port} | xargs -r kill"))
                .context("terminate-by-port")
                .run();
        }
        let _ = path;
        Ok(())
    }
}
