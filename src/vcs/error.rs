//! VCS Adapter error types and formatting (§7 "VCS" error kinds).

use crate::styling::{error_message, hint_message};
use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum VcsError {
    BranchExists { branch: String },
    BranchMissing { branch: String },
    WorktreeMissing { path: PathBuf },
    RebaseConflict { onto: String, files: Vec<String> },
    NotFastForward { branch: String },
    CommandFailed(String),
}

impl fmt::Display for VcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VcsError::BranchExists { branch } => write!(
                f,
                "{}\n\n{}",
                error_message(format!("Branch '{branch}' already exists")),
                hint_message("Use --force to reuse it, or choose a different identifier")
            ),
            VcsError::BranchMissing { branch } => {
                write!(f, "{}", error_message(format!("Branch '{branch}' does not exist")))
            }
            VcsError::WorktreeMissing { path } => write!(
                f,
                "{}\n\n{}",
                error_message(format!("No worktree found at {}", path.display())),
                hint_message("Use 'wsc list' to see available workspaces")
            ),
            VcsError::RebaseConflict { onto, files } => {
                write!(f, "{}", error_message(format!("Rebase onto '{onto}' hit conflicts")))?;
                if !files.is_empty() {
                    write!(f, "\n{}", crate::styling::format_with_gutter(&files.join("\n"), "", None))?;
                }
                write!(
                    f,
                    "\n\n{}",
                    hint_message("Fix conflicts and re-run finish, or 'git rebase --abort'")
                )
            }
            VcsError::NotFastForward { branch } => write!(
                f,
                "{}\n\n{}",
                error_message(format!("Cannot fast-forward '{branch}': it has diverged")),
                hint_message("Rebase the workspace branch onto the mainline first")
            ),
            VcsError::CommandFailed(msg) => write!(f, "{}", error_message(msg)),
        }
    }
}

impl std::error::Error for VcsError {}

impl From<std::io::Error> for VcsError {
    fn from(e: std::io::Error) -> Self {
        VcsError::CommandFailed(e.to_string())
    }
}
