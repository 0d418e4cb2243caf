//! Merge Manager (C11): rebase a workspace branch onto the mainline, then
//! fast-forward the mainline (§4.11).

use crate::vcs::{VcsAdapter, VcsError};
use std::path::Path;

#[derive(Debug, Clone, Copy)]
pub struct MergeOptions {
    pub dry_run: bool,
    pub force: bool,
}

/// Rebase the branch checked out at `path` onto `main_branch`. Conflicts
/// surface as [`VcsError::RebaseConflict`], which already carries a
/// formatted remediation hint via its `Display` impl.
pub fn rebase_on_main(vcs: &dyn VcsAdapter, path: &Path, main_branch: &str, options: MergeOptions) -> Result<(), VcsError> {
    if options.dry_run {
        return Ok(());
    }
    vcs.rebase(path, main_branch)
}

/// Fast-forward `main_branch` to the workspace branch's head, in the
/// mainline worktree at `mainline_path`.
pub fn perform_fast_forward_merge(
    vcs: &dyn VcsAdapter,
    branch: &str,
    mainline_path: &Path,
    options: MergeOptions,
) -> Result<(), VcsError> {
    if options.dry_run {
        return Ok(());
    }
    vcs.fast_forward(branch, mainline_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcs::Worktree;
    use std::cell::RefCell;
    use std::path::PathBuf;

    struct RecordingVcs {
        calls: RefCell<Vec<String>>,
    }

    impl VcsAdapter for RecordingVcs {
        fn list_worktrees(&self) -> Result<Vec<Worktree>, VcsError> {
            Ok(Vec::new())
        }
        fn generate_worktree_path(&self, _t: &crate::identifier::WorkspaceTarget, _p: &str) -> PathBuf {
            PathBuf::new()
        }
        fn create_worktree(&self, _p: &Path, _b: &str, _c: bool) -> Result<(), VcsError> {
            Ok(())
        }
        fn remove_worktree(&self, _p: &Path, _f: bool) -> Result<(), VcsError> {
            Ok(())
        }
        fn find_worktree_for_issue(&self, _n: u64) -> Result<Option<Worktree>, VcsError> {
            Ok(None)
        }
        fn find_worktree_for_pr(&self, _n: u64, _h: Option<&str>) -> Result<Option<Worktree>, VcsError> {
            Ok(None)
        }
        fn find_worktree_for_branch(&self, _n: &str) -> Result<Option<Worktree>, VcsError> {
            Ok(None)
        }
        fn find_all_branches_for_issue(&self, _n: u64, _p: &[String]) -> Result<Vec<String>, VcsError> {
            Ok(Vec::new())
        }
        fn rebase(&self, _path: &Path, onto: &str) -> Result<(), VcsError> {
            self.calls.borrow_mut().push(format!("rebase:{onto}"));
            Ok(())
        }
        fn fast_forward(&self, branch: &str, _path: &Path) -> Result<(), VcsError> {
            self.calls.borrow_mut().push(format!("ff:{branch}"));
            Ok(())
        }
        fn branch_exists(&self, _n: &str) -> Result<bool, VcsError> {
            Ok(true)
        }
        fn delete_branch(&self, _n: &str, _f: bool) -> Result<(), VcsError> {
            Ok(())
        }
        fn is_branch_merged(&self, _b: &str, _i: &str) -> Result<bool, VcsError> {
            Ok(true)
        }
        fn ensure_repository_has_commits(&self, _r: &Path) -> Result<(), VcsError> {
            Ok(())
        }
        fn current_branch(&self, _p: &Path) -> Result<Option<String>, VcsError> {
            Ok(None)
        }
    }

    #[test]
    fn dry_run_skips_rebase_and_merge() {
        let vcs = RecordingVcs { calls: RefCell::new(Vec::new()) };
        let options = MergeOptions { dry_run: true, force: false };
        rebase_on_main(&vcs, Path::new("/tmp/x"), "main", options).unwrap();
        perform_fast_forward_merge(&vcs, "feat", Path::new("/tmp/x"), options).unwrap();
        assert!(vcs.calls.borrow().is_empty());
    }

    #[test]
    fn non_dry_run_delegates_to_vcs_adapter_in_order() {
        let vcs = RecordingVcs { calls: RefCell::new(Vec::new()) };
        let options = MergeOptions { dry_run: false, force: false };
        rebase_on_main(&vcs, Path::new("/tmp/x"), "main", options).unwrap();
        perform_fast_forward_merge(&vcs, "feat", Path::new("/tmp/x"), options).unwrap();
        assert_eq!(*vcs.calls.borrow(), vec!["rebase:main".to_string(), "ff:feat".to_string()]);
    }
}
