//! VCS Adapter (C3): worktree lifecycle, branch ops, rebase, fast-forward.

mod error;
mod worktrees;

pub use error::VcsError;
pub use worktrees::{Worktree, find_all_branches_for_issue, parse_porcelain};

use crate::identifier::{TargetKind, WorkspaceTarget};
use crate::shell_exec::Cmd;
use std::path::{Path, PathBuf};

/// Abstracts over the version-control backend so C13 can be constructed
/// with test doubles (§9 "Dependency injection").
pub trait VcsAdapter {
    fn list_worktrees(&self) -> Result<Vec<Worktree>, VcsError>;
    fn generate_worktree_path(&self, target: &WorkspaceTarget, worktree_prefix: &str) -> PathBuf;
    fn create_worktree(&self, path: &Path, branch: &str, create_branch: bool) -> Result<(), VcsError>;
    fn remove_worktree(&self, path: &Path, force: bool) -> Result<(), VcsError>;
    fn find_worktree_for_issue(&self, n: u64) -> Result<Option<Worktree>, VcsError>;
    fn find_worktree_for_pr(&self, n: u64, branch_hint: Option<&str>) -> Result<Option<Worktree>, VcsError>;
    fn find_worktree_for_branch(&self, name: &str) -> Result<Option<Worktree>, VcsError>;
    fn find_all_branches_for_issue(&self, n: u64, protected: &[String]) -> Result<Vec<String>, VcsError>;
    fn rebase(&self, path: &Path, onto_branch: &str) -> Result<(), VcsError>;
    fn fast_forward(&self, branch: &str, path: &Path) -> Result<(), VcsError>;
    fn branch_exists(&self, name: &str) -> Result<bool, VcsError>;
    fn delete_branch(&self, name: &str, force: bool) -> Result<(), VcsError>;
    fn is_branch_merged(&self, branch: &str, into: &str) -> Result<bool, VcsError>;
    fn ensure_repository_has_commits(&self, root: &Path) -> Result<(), VcsError>;
    fn current_branch(&self, path: &Path) -> Result<Option<String>, VcsError>;
}

/// `git`-backed implementation. All subprocess calls route through
/// [`crate::shell_exec::Cmd`] so they are logged uniformly.
pub struct GitAdapter {
    pub repo_root: PathBuf,
}

impl GitAdapter {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
        }
    }

    fn git(&self, context: &str) -> Cmd {
        Cmd::new("git").current_dir(&self.repo_root).context(context)
    }
}

impl VcsAdapter for GitAdapter {
    fn list_worktrees(&self) -> Result<Vec<Worktree>, VcsError> {
        let output = self
            .git("list-worktrees")
            .args(["worktree", "list", "--porcelain"])
            .run_checked()?;
        Ok(parse_porcelain(&output))
    }

    fn generate_worktree_path(&self, target: &WorkspaceTarget, worktree_prefix: &str) -> PathBuf {
        let repo_name = self
            .repo_root
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "repo".to_string());
        let slug = match target.kind {
            TargetKind::Issue => format!("issue-{}", target.number.unwrap_or(0)),
            TargetKind::PullRequest => format!("pr-{}", target.number.unwrap_or(0)),
            TargetKind::Branch => sanitize_path_segment(target.branch_name.as_deref().unwrap_or("branch")),
        };
        self.repo_root
            .parent()
            .unwrap_or(&self.repo_root)
            .join(worktree_prefix.replace("<repo-dir-name>", &repo_name))
            .join(slug)
    }

    fn create_worktree(&self, path: &Path, branch: &str, create_branch: bool) -> Result<(), VcsError> {
        if path.exists() {
            return Err(VcsError::CommandFailed(format!(
                "directory already exists: {}",
                path.display()
            )));
        }
        let mut cmd = self.git("create-worktree").arg("worktree").arg("add");
        if create_branch {
            cmd = cmd.arg("-b").arg(branch);
            cmd = cmd.arg(path);
        } else {
            cmd = cmd.arg(path).arg(branch);
        }
        cmd.run_checked()?;
        Ok(())
    }

    fn remove_worktree(&self, path: &Path, force: bool) -> Result<(), VcsError> {
        if !path.exists() {
            return Ok(());
        }
        let mut cmd = self.git("remove-worktree").arg("worktree").arg("remove");
        if force {
            cmd = cmd.arg("--force");
        }
        cmd = cmd.arg(path);
        match cmd.run_checked() {
            Ok(_) => Ok(()),
            Err(e) if !path.exists() => {
                let _ = e;
                Ok(())
            }
            Err(e) => Err(VcsError::from(e)),
        }
    }

    fn find_worktree_for_issue(&self, n: u64) -> Result<Option<Worktree>, VcsError> {
        let protected = Vec::new();
        let branches = self.find_all_branches_for_issue(n, &protected)?;
        find_first_matching(&self.list_worktrees()?, &branches)
    }

    fn find_worktree_for_pr(&self, n: u64, branch_hint: Option<&str>) -> Result<Option<Worktree>, VcsError> {
        if let Some(hint) = branch_hint {
            return self.find_worktree_for_branch(hint);
        }
        let worktrees = self.list_worktrees()?;
        let matches: Vec<String> = worktrees
            .iter()
            .filter_map(|w| w.branch.as_deref())
            .filter(|b| b.contains(&format!("pr-{n}")) || b.contains(&format!("pr/{n}")))
            .map(str::to_string)
            .collect();
        find_first_matching(&worktrees, &matches)
    }

    fn find_worktree_for_branch(&self, name: &str) -> Result<Option<Worktree>, VcsError> {
        Ok(self
            .list_worktrees()?
            .into_iter()
            .find(|w| w.branch.as_deref() == Some(name)))
    }

    fn find_all_branches_for_issue(&self, n: u64, protected: &[String]) -> Result<Vec<String>, VcsError> {
        let output = self
            .git("list-branches")
            .args(["for-each-ref", "--format=%(refname:short)", "refs/heads", "refs/remotes"])
            .run_checked()?;
        let branches: Vec<&str> = output.lines().collect();
        Ok(find_all_branches_for_issue(n, branches, protected))
    }

    fn rebase(&self, path: &Path, onto_branch: &str) -> Result<(), VcsError> {
        let cmd = Cmd::new("git")
            .current_dir(path)
            .context("rebase")
            .arg("rebase")
            .arg(onto_branch);
        match cmd.run_checked() {
            Ok(_) => Ok(()),
            Err(_) => {
                let status_output = Cmd::new("git")
                    .current_dir(path)
                    .arg("diff")
                    .arg("--name-only")
                    .arg("--diff-filter=U")
                    .run_checked()
                    .unwrap_or_default();
                let _ = Cmd::new("git").current_dir(path).arg("rebase").arg("--abort").run();
                Err(VcsError::RebaseConflict {
                    onto: onto_branch.to_string(),
                    files: status_output.lines().map(str::to_string).collect(),
                })
            }
        }
    }

    fn fast_forward(&self, branch: &str, path: &Path) -> Result<(), VcsError> {
        let cmd = Cmd::new("git")
            .current_dir(path)
            .context("fast-forward")
            .arg("merge")
            .arg("--ff-only")
            .arg(branch);
        cmd.run_checked()
            .map(|_| ())
            .map_err(|_| VcsError::NotFastForward {
                branch: branch.to_string(),
            })
    }

    fn branch_exists(&self, name: &str) -> Result<bool, VcsError> {
        let cmd = self
            .git("branch-exists")
            .arg("show-ref")
            .arg("--verify")
            .arg("--quiet")
            .arg(format!("refs/heads/{name}"));
        Ok(cmd.run().map(|o| o.status.success()).unwrap_or(false))
    }

    fn delete_branch(&self, name: &str, force: bool) -> Result<(), VcsError> {
        let flag = if force { "-D" } else { "-d" };
        self.git("delete-branch").arg("branch").arg(flag).arg(name).run_checked()?;
        Ok(())
    }

    fn is_branch_merged(&self, branch: &str, into: &str) -> Result<bool, VcsError> {
        let output = self
            .git("branch-merged")
            .args(["branch", "--merged", into])
            .run_checked()?;
        Ok(output.lines().any(|l| l.trim_start_matches("* ").trim() == branch))
    }

    fn ensure_repository_has_commits(&self, root: &Path) -> Result<(), VcsError> {
        let has_head = Cmd::new("git")
            .current_dir(root)
            .arg("rev-parse")
            .arg("HEAD")
            .run()
            .map(|o| o.status.success())
            .unwrap_or(false);
        if has_head {
            return Ok(());
        }
        Cmd::new("git")
            .current_dir(root)
            .context("seed-empty-commit")
            .args(["commit", "--allow-empty", "-m", "chore: initial commit"])
            .run_checked()?;
        Ok(())
    }

    fn current_branch(&self, path: &Path) -> Result<Option<String>, VcsError> {
        let output = Cmd::new("git")
            .current_dir(path)
            .args(["rev-parse", "--abbrev-ref", "HEAD"])
            .run_checked()?;
        if output == "HEAD" {
            Ok(None)
        } else {
            Ok(Some(output))
        }
    }
}

fn find_first_matching(worktrees: &[Worktree], branch_names: &[String]) -> Result<Option<Worktree>, VcsError> {
    for worktree in worktrees {
        if let Some(branch) = &worktree.branch
            && branch_names.iter().any(|b| b == branch)
        {
            return Ok(Some(worktree.clone()));
        }
    }
    Ok(None)
}

fn sanitize_path_segment(input: &str) -> String {
    input
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_path_segment_replaces_slashes() {
        assert_eq!(sanitize_path_segment("feat/foo"), "feat-foo");
    }

    #[test]
    fn generate_worktree_path_uses_issue_number() {
        let adapter = GitAdapter::new("/tmp/myrepo");
        let target = WorkspaceTarget::issue(42, "42");
        let path = adapter.generate_worktree_path(&target, "worktrees");
        assert_eq!(path, PathBuf::from("/tmp/worktrees/issue-42"));
    }

    #[test]
    fn generate_worktree_path_substitutes_repo_dir_name_token() {
        let adapter = GitAdapter::new("/tmp/myrepo");
        let target = WorkspaceTarget::issue(1, "1");
        let path = adapter.generate_worktree_path(&target, "<repo-dir-name>-worktrees");
        assert_eq!(path, PathBuf::from("/tmp/myrepo-worktrees/issue-1"));
    }
}
