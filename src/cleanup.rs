//! Resource Cleanup (C12): coordinated, partial-failure-tolerant teardown
//! of a workspace across C3/C5/C6/C8 (§4.12, §9 "Partial-failure
//! orchestration" — this module must never short-circuit on first error).

use crate::capabilities;
use crate::config::Settings;
use crate::database::DatabaseAdapter;
use crate::env_file;
use crate::identifier::WorkspaceTarget;
use crate::process::ProcessSupervisor;
use crate::vcs::VcsAdapter;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    DevServer,
    Worktree,
    Database,
    Branch,
    Symlinks,
    EnvFile,
}

#[derive(Debug, Clone)]
pub struct Operation {
    pub kind: OperationKind,
    pub success: bool,
    pub message: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CleanupResult {
    pub target: WorkspaceTarget,
    pub success: bool,
    pub operations: Vec<Operation>,
    pub errors: Vec<String>,
    pub rollback_required: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct CleanupOptions {
    pub dry_run: bool,
    pub force: bool,
    pub delete_branch: bool,
    pub keep_database: bool,
}

pub struct CleanupContext<'a> {
    pub vcs: &'a dyn VcsAdapter,
    pub database: &'a dyn DatabaseAdapter,
    pub process: &'a dyn ProcessSupervisor,
    pub settings: &'a Settings,
    pub repo_root: &'a Path,
}

/// §4.12: six independently-reported steps, continuing past failure.
pub fn cleanup_worktree(
    ctx: &CleanupContext,
    target: WorkspaceTarget,
    worktree_path: Option<&Path>,
    branch: Option<&str>,
    options: CleanupOptions,
) -> CleanupResult {
    let mut operations = Vec::new();
    let mut errors = Vec::new();
    let prefix = |msg: &str| {
        if options.dry_run {
            format!("[DRY RUN] {msg}")
        } else {
            msg.to_string()
        }
    };

    // 1. Pre-read env file to capture DB connection details before removal.
    let db_url_key = ctx.settings.database_url_env_var_name();
    let captured_db_url = worktree_path.and_then(|p| env_file::read_env_var(&p.join(".env"), db_url_key));

    // Pre-read cli capabilities before the worktree disappears, so step 6
    // can re-derive the same `<binName>-<suffix>` basenames it was created
    // under (C7's `binEntries`).
    let bin_entries = worktree_path.map(|p| capabilities::detect(p).bin_entries).unwrap_or_default();
    operations.push(Operation {
        kind: OperationKind::EnvFile,
        success: true,
        message: match &captured_db_url {
            Some(_) => "env file read (database URL captured)".to_string(),
            None => "env file read (nothing to capture)".to_string(),
        },
        error: None,
    });

    // 2. Terminate dev server.
    let port: Option<u16> = worktree_path
        .and_then(|p| env_file::read_env_var(&p.join(".env"), "PORT"))
        .and_then(|p| p.parse().ok());
    if options.dry_run {
        operations.push(Operation {
            kind: OperationKind::DevServer,
            success: true,
            message: prefix("terminate dev server"),
            error: None,
        });
    } else {
        let path = worktree_path.unwrap_or_else(|| Path::new("."));
        match ctx.process.terminate_for(path, port) {
            Ok(()) => operations.push(Operation {
                kind: OperationKind::DevServer,
                success: true,
                message: "dev server terminated".to_string(),
                error: None,
            }),
            Err(e) => operations.push(Operation {
                kind: OperationKind::DevServer,
                success: false,
                message: "failed to terminate dev server".to_string(),
                error: Some(e.to_string()),
            }),
        }
    }

    // 3. Delete database branch unless keepDatabase.
    if options.keep_database {
        operations.push(Operation {
            kind: OperationKind::Database,
            success: true,
            message: "skipped (keepDatabase)".to_string(),
            error: None,
        });
    } else if let Some(branch_name) = branch {
        if options.dry_run {
            operations.push(Operation {
                kind: OperationKind::Database,
                success: true,
                message: prefix(&format!("delete database branch '{branch_name}'")),
                error: None,
            });
        } else {
            match ctx.database.delete_branch_if_configured(branch_name) {
                Ok(_) => operations.push(Operation {
                    kind: OperationKind::Database,
                    success: true,
                    message: "database branch deleted".to_string(),
                    error: None,
                }),
                Err(e) => {
                    errors.push(e.to_string());
                    operations.push(Operation {
                        kind: OperationKind::Database,
                        success: false,
                        message: "failed to delete database branch".to_string(),
                        error: Some(e.to_string()),
                    });
                }
            }
        }
    } else {
        operations.push(Operation {
            kind: OperationKind::Database,
            success: true,
            message: "skipped (no branch)".to_string(),
            error: None,
        });
    }
    let _ = captured_db_url;

    // 4. Remove worktree.
    let worktree_removed = match worktree_path {
        None => {
            operations.push(Operation {
                kind: OperationKind::Worktree,
                success: true,
                message: "skipped (no worktree found)".to_string(),
                error: None,
            });
            true
        }
        Some(path) if options.dry_run => {
            operations.push(Operation {
                kind: OperationKind::Worktree,
                success: true,
                message: prefix(&format!("remove worktree at {}", path.display())),
                error: None,
            });
            true
        }
        Some(path) => match ctx.vcs.remove_worktree(path, options.force) {
            Ok(()) => {
                operations.push(Operation {
                    kind: OperationKind::Worktree,
                    success: true,
                    message: format!("worktree removed at {}", path.display()),
                    error: None,
                });
                true
            }
            Err(e) => {
                errors.push(e.to_string());
                operations.push(Operation {
                    kind: OperationKind::Worktree,
                    success: false,
                    message: "failed to remove worktree".to_string(),
                    error: Some(e.to_string()),
                });
                false
            }
        },
    };

    // 5. Delete local branch iff requested, not protected, and mergeable.
    let protected = ctx.settings.protected_branches();
    match branch {
        Some(branch_name) if options.delete_branch && !protected.iter().any(|p| p == branch_name) => {
            let mergeable = options.force
                || ctx
                    .vcs
                    .is_branch_merged(branch_name, &ctx.settings.main_branch)
                    .unwrap_or(false);
            if options.dry_run {
                operations.push(Operation {
                    kind: OperationKind::Branch,
                    success: true,
                    message: prefix(&format!("delete branch '{branch_name}'")),
                    error: None,
                });
            } else if mergeable {
                match ctx.vcs.delete_branch(branch_name, options.force) {
                    Ok(()) => operations.push(Operation {
                        kind: OperationKind::Branch,
                        success: true,
                        message: format!("branch '{branch_name}' deleted"),
                        error: None,
                    }),
                    Err(e) => {
                        errors.push(e.to_string());
                        operations.push(Operation {
                            kind: OperationKind::Branch,
                            success: false,
                            message: "failed to delete branch".to_string(),
                            error: Some(e.to_string()),
                        });
                    }
                }
            } else {
                operations.push(Operation {
                    kind: OperationKind::Branch,
                    success: false,
                    message: format!("branch '{branch_name}' not fully merged; use --force"),
                    error: None,
                });
            }
        }
        _ => operations.push(Operation {
            kind: OperationKind::Branch,
            success: true,
            message: "skipped".to_string(),
            error: None,
        }),
    }

    // 6. Remove per-workspace symlinks (C7's `binEntries`).
    if options.dry_run {
        operations.push(Operation {
            kind: OperationKind::Symlinks,
            success: true,
            message: prefix("remove cli symlinks"),
            error: None,
        });
    } else if bin_entries.is_empty() {
        operations.push(Operation {
            kind: OperationKind::Symlinks,
            success: true,
            message: "skipped (no cli capability)".to_string(),
            error: None,
        });
    } else {
        let suffix = capabilities::symlink_suffix(target.number, branch.unwrap_or_default());
        let removed = capabilities::remove_symlinks(&capabilities::bin_dir(ctx.repo_root), &bin_entries, &suffix);
        operations.push(Operation {
            kind: OperationKind::Symlinks,
            success: true,
            message: format!("{removed} symlink(s) removed"),
            error: None,
        });
    }

    CleanupResult {
        target,
        success: worktree_removed,
        operations,
        errors,
        rollback_required: false,
    }
}

/// §4.12 `cleanupMultiple`: sequential, one target's failure does not halt
/// others.
pub fn cleanup_multiple(
    ctx: &CleanupContext,
    targets: Vec<(WorkspaceTarget, Option<std::path::PathBuf>, Option<String>)>,
    options: CleanupOptions,
) -> Vec<CleanupResult> {
    targets
        .into_iter()
        .map(|(target, path, branch)| {
            cleanup_worktree(ctx, target, path.as_deref(), branch.as_deref(), options)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::NullDatabaseAdapter;
    use crate::process::ProcessError;
    use crate::vcs::Worktree;
    use std::path::PathBuf;

    struct FakeVcs;
    impl VcsAdapter for FakeVcs {
        fn list_worktrees(&self) -> Result<Vec<Worktree>, crate::vcs::VcsError> {
            Ok(Vec::new())
        }
        fn generate_worktree_path(&self, _t: &WorkspaceTarget, _p: &str) -> PathBuf {
            PathBuf::new()
        }
        fn create_worktree(&self, _p: &Path, _b: &str, _c: bool) -> Result<(), crate::vcs::VcsError> {
            Ok(())
        }
        fn remove_worktree(&self, _p: &Path, _f: bool) -> Result<(), crate::vcs::VcsError> {
            Ok(())
        }
        fn find_worktree_for_issue(&self, _n: u64) -> Result<Option<Worktree>, crate::vcs::VcsError> {
            Ok(None)
        }
        fn find_worktree_for_pr(&self, _n: u64, _h: Option<&str>) -> Result<Option<Worktree>, crate::vcs::VcsError> {
            Ok(None)
        }
        fn find_worktree_for_branch(&self, _n: &str) -> Result<Option<Worktree>, crate::vcs::VcsError> {
            Ok(None)
        }
        fn find_all_branches_for_issue(&self, _n: u64, _p: &[String]) -> Result<Vec<String>, crate::vcs::VcsError> {
            Ok(Vec::new())
        }
        fn rebase(&self, _p: &Path, _o: &str) -> Result<(), crate::vcs::VcsError> {
            Ok(())
        }
        fn fast_forward(&self, _b: &str, _p: &Path) -> Result<(), crate::vcs::VcsError> {
            Ok(())
        }
        fn branch_exists(&self, _n: &str) -> Result<bool, crate::vcs::VcsError> {
            Ok(true)
        }
        fn delete_branch(&self, _n: &str, _f: bool) -> Result<(), crate::vcs::VcsError> {
            Ok(())
        }
        fn is_branch_merged(&self, _b: &str, _i: &str) -> Result<bool, crate::vcs::VcsError> {
            Ok(true)
        }
        fn ensure_repository_has_commits(&self, _r: &Path) -> Result<(), crate::vcs::VcsError> {
            Ok(())
        }
        fn current_branch(&self, _p: &Path) -> Result<Option<String>, crate::vcs::VcsError> {
            Ok(None)
        }
    }

    struct FakeProcess;
    impl ProcessSupervisor for FakeProcess {
        fn launch_ide(&self, _p: &Path) -> Result<(), ProcessError> {
            Ok(())
        }
        fn launch_dev_server(&self, _p: &Path, _port: u16) -> Result<(), ProcessError> {
            Ok(())
        }
        fn launch_ai_agent(&self, _p: &Path, _c: &crate::config::WorkflowConfig, _ctx: &str) -> Result<(), ProcessError> {
            Ok(())
        }
        fn launch_terminal(&self, _p: &Path) -> Result<(), ProcessError> {
            Ok(())
        }
        fn terminate_for(&self, _p: &Path, _port: Option<u16>) -> Result<(), ProcessError> {
            Ok(())
        }
    }

    fn context<'a>(settings: &'a Settings, vcs: &'a FakeVcs, db: &'a NullDatabaseAdapter, proc: &'a FakeProcess) -> CleanupContext<'a> {
        CleanupContext {
            vcs,
            database: db,
            process: proc,
            settings,
            repo_root: Path::new("."),
        }
    }

    #[test]
    fn every_step_contributes_exactly_one_operation() {
        let settings = Settings::default();
        let (vcs, db, proc) = (FakeVcs, NullDatabaseAdapter, FakeProcess);
        let ctx = context(&settings, &vcs, &db, &proc);
        let options = CleanupOptions { dry_run: false, force: false, delete_branch: false, keep_database: false };
        let result = cleanup_worktree(&ctx, WorkspaceTarget::issue(42, "42"), None, None, options);
        assert_eq!(result.operations.len(), 6);
    }

    #[test]
    fn success_is_true_when_worktree_not_found() {
        let settings = Settings::default();
        let (vcs, db, proc) = (FakeVcs, NullDatabaseAdapter, FakeProcess);
        let ctx = context(&settings, &vcs, &db, &proc);
        let options = CleanupOptions { dry_run: false, force: false, delete_branch: false, keep_database: false };
        let result = cleanup_worktree(&ctx, WorkspaceTarget::issue(42, "42"), None, None, options);
        assert!(result.success);
    }

    #[test]
    fn dry_run_prefixes_every_message() {
        let settings = Settings::default();
        let (vcs, db, proc) = (FakeVcs, NullDatabaseAdapter, FakeProcess);
        let ctx = context(&settings, &vcs, &db, &proc);
        let options = CleanupOptions { dry_run: true, force: false, delete_branch: false, keep_database: false };
        let result = cleanup_worktree(&ctx, WorkspaceTarget::issue(42, "42"), None, Some("feat/issue-42"), options);
        assert!(
            result
                .operations
                .iter()
                .filter(|o| o.kind != OperationKind::Branch && o.kind != OperationKind::Database)
                .all(|o| o.message.starts_with("[DRY RUN]") || o.message.starts_with("skipped"))
        );
    }

    #[test]
    fn cleanup_multiple_continues_past_individual_failures() {
        let settings = Settings::default();
        let (vcs, db, proc) = (FakeVcs, NullDatabaseAdapter, FakeProcess);
        let ctx = context(&settings, &vcs, &db, &proc);
        let options = CleanupOptions { dry_run: false, force: false, delete_branch: false, keep_database: false };
        let targets = vec![
            (WorkspaceTarget::issue(1, "1"), None, None),
            (WorkspaceTarget::issue(2, "2"), None, None),
        ];
        let results = cleanup_multiple(&ctx, targets, options);
        assert_eq!(results.len(), 2);
    }
}
