//! Commit Manager (C10): detect uncommitted changes, synthesize a message,
//! and record commits (§4.10).

use crate::shell_exec::Cmd;
use std::fmt;
use std::path::Path;

#[derive(Debug)]
pub enum CommitError {
    CommandFailed(String),
}

impl fmt::Display for CommitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitError::CommandFailed(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for CommitError {}

#[derive(Debug, Clone)]
pub struct WorkingCopyState {
    pub has_uncommitted_changes: bool,
    pub unstaged_files: Vec<String>,
    pub staged_files: Vec<String>,
    pub current_branch: Option<String>,
    pub is_ahead_of_remote: bool,
    pub is_behind_remote: bool,
}

pub fn detect_uncommitted_changes(path: &Path) -> Result<WorkingCopyState, CommitError> {
    let status = Cmd::new("git")
        .current_dir(path)
        .args(["status", "--porcelain"])
        .context("detect-uncommitted-changes")
        .run_checked()
        .map_err(|e| CommitError::CommandFailed(e.to_string()))?;

    let mut staged_files = Vec::new();
    let mut unstaged_files = Vec::new();
    for line in status.lines() {
        if line.len() < 3 {
            continue;
        }
        let (index_status, worktree_status) = (&line[0..1], &line[1..2]);
        let file = line[3..].to_string();
        if index_status != " " && index_status != "?" {
            staged_files.push(file.clone());
        }
        if worktree_status != " " {
            unstaged_files.push(file);
        }
    }

    let current_branch = Cmd::new("git")
        .current_dir(path)
        .args(["rev-parse", "--abbrev-ref", "HEAD"])
        .run_checked()
        .ok()
        .filter(|b| b != "HEAD");

    let (ahead, behind) = ahead_behind(path);

    Ok(WorkingCopyState {
        has_uncommitted_changes: !staged_files.is_empty() || !unstaged_files.is_empty(),
        unstaged_files,
        staged_files,
        current_branch,
        is_ahead_of_remote: ahead > 0,
        is_behind_remote: behind > 0,
    })
}

fn ahead_behind(path: &Path) -> (u32, u32) {
    let Ok(output) = Cmd::new("git")
        .current_dir(path)
        .args(["rev-list", "--left-right", "--count", "@{upstream}...HEAD"])
        .run_checked()
    else {
        return (0, 0);
    };
    let mut parts = output.split_whitespace();
    let behind = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
    let ahead = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
    (ahead, behind)
}

/// Stage all tracked and untracked changes, then commit. `no_verify` bypasses
/// pre-commit hooks.
pub fn commit_changes(path: &Path, message: &str, no_verify: bool) -> Result<(), CommitError> {
    Cmd::new("git")
        .current_dir(path)
        .args(["add", "-A"])
        .context("stage-changes")
        .run_checked()
        .map_err(|e| CommitError::CommandFailed(e.to_string()))?;

    let mut cmd = Cmd::new("git")
        .current_dir(path)
        .context("commit")
        .arg("commit")
        .arg("-m")
        .arg(message);
    if no_verify {
        cmd = cmd.arg("--no-verify");
    }
    cmd.run_checked().map_err(|e| CommitError::CommandFailed(e.to_string()))?;
    Ok(())
}

/// Synthesize a commit message from tracker context when available, falling
/// back to a generic message naming the branch.
pub fn synthesize_message(branch: &str, tracker_title: Option<&str>) -> String {
    match tracker_title {
        Some(title) => format!("{title}\n\nBranch: {branch}"),
        None => format!("wip: {branch}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesize_message_uses_tracker_title_when_available() {
        let msg = synthesize_message("feat/issue-42-add-oauth", Some("Add OAuth"));
        assert!(msg.starts_with("Add OAuth"));
        assert!(msg.contains("feat/issue-42-add-oauth"));
    }

    #[test]
    fn synthesize_message_falls_back_to_generic_wip() {
        let msg = synthesize_message("feat/issue-42-add-oauth", None);
        assert_eq!(msg, "wip: feat/issue-42-add-oauth");
    }
}
