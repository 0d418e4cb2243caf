//! Workspace Lifecycle Coordinator (C13): orchestrates C1–C12 through the
//! state machine in §4.2. This is the only component allowed to convert a
//! component-boundary error into a final, logged, exit-coded failure.

use crate::cleanup::{self, CleanupContext, CleanupOptions, CleanupResult};
use crate::commit;
use crate::config::{Settings, WorkflowKind};
use crate::database::DatabaseAdapter;
use crate::env_file;
use crate::identifier::{self, NumberClassifier, ResolveError, TargetKind, WorkspaceTarget};
use crate::merge::{self, MergeOptions};
use crate::process::{self, ProcessSupervisor};
use crate::tracker::{DetectedKind, IssueState, IssueTracker, PrState};
use crate::validation;
use crate::vcs::{VcsAdapter, VcsError, Worktree};
use std::fmt;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone)]
pub struct Workspace {
    pub target: WorkspaceTarget,
    pub path: PathBuf,
    pub branch: String,
    pub port: u16,
    pub capabilities: crate::capabilities::Capabilities,
    /// Basenames of the per-workspace `cli` symlinks created during seeding
    /// (possibly empty; §3 Workspace data model).
    pub cli_symlinks: Vec<String>,
    pub created_at: u64,
}

/// C13-native failures: states the Coordinator itself refuses to proceed
/// from, as opposed to a C1-C12 adapter error (those propagate as
/// `anyhow::Error` directly, keeping their own `Display`, per SPEC_FULL.md
/// §2.2 — this enum is not a universal wrapper for every component error).
#[derive(Debug)]
pub enum LifecycleError {
    ClosedIssueWithoutForce { number: u64 },
    NoWorktreeFound,
    ValidationFailed,
    OptionConflict(String),
    InstallFailed { message: String },
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleError::ClosedIssueWithoutForce { number } => write!(
                f,
                "issue #{number} is closed; use --force to override closed state"
            ),
            LifecycleError::NoWorktreeFound => write!(f, "no worktree found; use 'wsc list' to see available workspaces"),
            LifecycleError::ValidationFailed => write!(f, "validation gates failed"),
            LifecycleError::OptionConflict(msg) => write!(f, "{msg}"),
            LifecycleError::InstallFailed { message } => write!(f, "dependency install failed: {message}"),
        }
    }
}

impl std::error::Error for LifecycleError {}

#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    pub force: bool,
    pub dry_run: bool,
    pub explicit_pr: Option<u64>,
    pub skip_agent: bool,
    pub code_only: bool,
    pub terminal_only: bool,
}

#[derive(Debug, Clone, Default)]
pub struct FinishOptions {
    pub force: bool,
    pub dry_run: bool,
    pub explicit_pr: Option<u64>,
    pub no_verify: bool,
}

/// Constructor-injected dependency bundle (§9 "Dependency injection") so
/// tests can substitute doubles for every external collaborator.
pub struct Coordinator<'a> {
    pub vcs: &'a dyn VcsAdapter,
    pub tracker: &'a dyn IssueTracker,
    pub database: &'a dyn DatabaseAdapter,
    pub process: &'a dyn ProcessSupervisor,
    pub settings: &'a Settings,
    pub repo_root: PathBuf,
}

struct TrackerClassifier<'a>(&'a dyn IssueTracker);

impl NumberClassifier for TrackerClassifier<'_> {
    fn classify(&self, number: u64) -> Result<TargetKind, ResolveError> {
        match self.0.detect_input_type(number) {
            Ok(DetectedKind::Pr) => Ok(TargetKind::PullRequest),
            Ok(_) => Ok(TargetKind::Issue),
            Err(_) => Ok(TargetKind::Issue),
        }
    }
}

impl<'a> Coordinator<'a> {
    pub(crate) fn resolve(&self, input: Option<&str>, explicit_pr: Option<u64>, cwd: &std::path::Path) -> anyhow::Result<WorkspaceTarget> {
        let classifier = TrackerClassifier(self.tracker);
        let basename = identifier::cwd_basename(cwd);
        let current_branch = self.vcs.current_branch(cwd).unwrap_or(None);
        Ok(identifier::resolve(input, explicit_pr, &basename, current_branch.as_deref(), &classifier)?)
    }

    fn branch_name_for_target(&self, target: &WorkspaceTarget) -> anyhow::Result<String> {
        match target.kind {
            TargetKind::Issue => {
                let issue = self.tracker.fetch_issue(target.number.expect("Issue/PullRequest targets always carry a number"))?;
                Ok(self.tracker.generate_branch_name(issue.number, &issue.title))
            }
            TargetKind::PullRequest => {
                let pr = self.tracker.fetch_pr(target.number.expect("Issue/PullRequest targets always carry a number"))?;
                Ok(pr.branch)
            }
            TargetKind::Branch => Ok(target.branch_name.clone().unwrap()),
        }
    }

    fn existing_worktree(&self, target: &WorkspaceTarget) -> anyhow::Result<Option<Worktree>> {
        let found = match target.kind {
            TargetKind::Issue => self.vcs.find_worktree_for_issue(target.number.expect("Issue/PullRequest targets always carry a number"))?,
            TargetKind::PullRequest => self.vcs.find_worktree_for_pr(target.number.expect("Issue/PullRequest targets always carry a number"), None)?,
            TargetKind::Branch => self.vcs.find_worktree_for_branch(target.branch_name.as_deref().unwrap())?,
        };
        Ok(found)
    }

    /// §4.2 `start`.
    pub fn start(&self, input: Option<&str>, cwd: &std::path::Path, options: StartOptions) -> anyhow::Result<Workspace> {
        if options.code_only && options.terminal_only {
            return Err(LifecycleError::OptionConflict(
                "--code-only and --terminal-only are mutually exclusive".to_string(),
            )
            .into());
        }

        let target = self.resolve(input, options.explicit_pr, cwd)?;

        if let Some(worktree) = self.existing_worktree(&target)? {
            return self.reuse_workspace(target, worktree, &options);
        }

        self.create_workspace(target, &options)
    }

    fn reuse_workspace(&self, target: WorkspaceTarget, worktree: Worktree, options: &StartOptions) -> anyhow::Result<Workspace> {
        let branch = worktree.branch.clone().unwrap_or_default();
        let port = process::calculate_port(self.settings.base_port(), target.number)?;

        if !options.dry_run {
            env_file::set_env_var(&worktree.path.join(".env"), "PORT", &port.to_string())?;
        }

        let capabilities = crate::capabilities::detect(&worktree.path);
        self.launch_tools(&worktree.path, &target, options, &capabilities, &branch);

        let cli_symlinks = if !options.dry_run && capabilities.cli {
            let suffix = crate::capabilities::symlink_suffix(target.number, &branch);
            crate::capabilities::create_symlinks(
                &crate::capabilities::bin_dir(&self.repo_root),
                &worktree.path,
                &capabilities.bin_entries,
                &suffix,
            )
        } else {
            Vec::new()
        };

        Ok(Workspace {
            target,
            path: worktree.path,
            branch,
            port,
            capabilities,
            cli_symlinks,
            created_at: now(),
        })
    }

    fn create_workspace(&self, target: WorkspaceTarget, options: &StartOptions) -> anyhow::Result<Workspace> {
        let branch = self.branch_name_for_target(&target)?;

        if target.kind != TargetKind::PullRequest && self.vcs.branch_exists(&branch)? {
            return Err(VcsError::BranchExists { branch }.into());
        }

        let worktree_prefix = self
            .settings
            .worktree_prefix
            .clone()
            .unwrap_or_else(|| "<repo-dir-name>-worktrees".to_string());
        let path = self.vcs.generate_worktree_path(&target, &worktree_prefix);

        if options.dry_run {
            let port = process::calculate_port(self.settings.base_port(), target.number)?;
            return Ok(Workspace {
                target,
                path,
                branch,
                port,
                capabilities: crate::capabilities::Capabilities::default(),
                cli_symlinks: Vec::new(),
                created_at: now(),
            });
        }

        self.vcs.ensure_repository_has_commits(&self.repo_root)?;

        let create_branch = target.kind != TargetKind::PullRequest;
        self.vcs.create_worktree(&path, &branch, create_branch)?;

        match self.provision_and_seed(&target, &path, &branch, options) {
            Ok(workspace) => Ok(workspace),
            Err(e) => {
                // Rollback: remove the worktree and any branch created in this call.
                let _ = self.vcs.remove_worktree(&path, true);
                if create_branch {
                    let _ = self.vcs.delete_branch(&branch, true);
                }
                Err(e)
            }
        }
    }

    fn provision_and_seed(&self, target: &WorkspaceTarget, path: &std::path::Path, branch: &str, options: &StartOptions) -> anyhow::Result<Workspace> {
        let port = process::calculate_port(self.settings.base_port(), target.number)?;

        let db_url = self.database.create_branch_if_configured(branch)?;

        crate::install::install_dependencies(path)
            .map_err(|message| LifecycleError::InstallFailed { message })?;

        env_file::set_env_var(&path.join(".env"), "PORT", &port.to_string())?;
        if let Some(url) = &db_url {
            env_file::set_env_var(&path.join(".env"), self.settings.database_url_env_var_name(), url)?;
        }

        let capabilities = crate::capabilities::detect(path);

        let cli_symlinks = if capabilities.cli {
            let suffix = crate::capabilities::symlink_suffix(target.number, branch);
            crate::capabilities::create_symlinks(
                &crate::capabilities::bin_dir(&self.repo_root),
                path,
                &capabilities.bin_entries,
                &suffix,
            )
        } else {
            Vec::new()
        };

        if target.kind == TargetKind::Issue {
            let _ = self.tracker.move_issue_to_in_progress(target.number.expect("Issue/PullRequest targets always carry a number"));
        }

        self.launch_tools(path, target, options, &capabilities, branch);

        Ok(Workspace {
            target: target.clone(),
            path: path.to_path_buf(),
            branch: branch.to_string(),
            port,
            capabilities,
            cli_symlinks,
            created_at: now(),
        })
    }

    /// `--code-only`/`--terminal-only` (the `open`/`ignite` aliases) narrow
    /// which tools launch to exactly one; otherwise every tool the workflow
    /// config enables for this target kind launches (SPEC_FULL.md §5, Open
    /// Question resolution recorded in DESIGN.md).
    fn launch_tools(&self, path: &std::path::Path, target: &WorkspaceTarget, options: &StartOptions, capabilities: &crate::capabilities::Capabilities, branch: &str) {
        if options.dry_run {
            return;
        }
        let kind = match target.kind {
            TargetKind::Issue => WorkflowKind::Issue,
            TargetKind::PullRequest => WorkflowKind::PullRequest,
            TargetKind::Branch => WorkflowKind::Regular,
        };
        let workflow = self.settings.workflow_for(kind);

        if options.terminal_only {
            let _ = self.process.launch_terminal(path);
            return;
        }
        if options.code_only {
            let _ = self.process.launch_ide(path);
            return;
        }

        if workflow.start_ide {
            let _ = self.process.launch_ide(path);
        }
        if workflow.start_dev_server && capabilities.web {
            if let Ok(port) = process::calculate_port(self.settings.base_port(), target.number) {
                let _ = self.process.launch_dev_server(path, port);
            }
        }
        if !options.skip_agent && workflow.start_ai_agent {
            let _ = self.process.launch_ai_agent(path, &workflow, &format!("branch={branch}"));
        }
        if workflow.start_terminal {
            let _ = self.process.launch_terminal(path);
        }
    }

    /// §4.2 `finish`.
    pub fn finish(&self, input: Option<&str>, cwd: &std::path::Path, options: FinishOptions) -> anyhow::Result<CleanupResult> {
        let target = self.resolve(input, options.explicit_pr, cwd)?;

        if target.kind == TargetKind::PullRequest {
            return self.finish_pr(target, options);
        }

        if target.kind == TargetKind::Issue {
            let issue = self.tracker.fetch_issue(target.number.expect("Issue/PullRequest targets always carry a number"))?;
            if issue.state == IssueState::Closed && !options.force {
                return Err(LifecycleError::ClosedIssueWithoutForce { number: issue.number }.into());
            }
        }

        let worktree = self.existing_worktree(&target)?.ok_or(LifecycleError::NoWorktreeFound)?;
        let branch = worktree.branch.clone().unwrap_or_default();

        let validation_result = validation::run_validations(&worktree.path);
        if !validation_result.success {
            return Err(LifecycleError::ValidationFailed.into());
        }

        let state = commit::detect_uncommitted_changes(&worktree.path)?;
        if state.has_uncommitted_changes && !options.dry_run {
            let tracker_title = if target.kind == TargetKind::Issue {
                self.tracker.fetch_issue(target.number.expect("Issue/PullRequest targets always carry a number")).ok().map(|i| i.title)
            } else {
                None
            };
            let message = commit::synthesize_message(&branch, tracker_title.as_deref());
            commit::commit_changes(&worktree.path, &message, options.no_verify)?;
        }

        let merge_options = MergeOptions { dry_run: options.dry_run, force: options.force };
        merge::rebase_on_main(self.vcs, &worktree.path, &self.settings.main_branch, merge_options)?;

        let mainline_path = self.repo_root.clone();
        merge::perform_fast_forward_merge(self.vcs, &branch, &mainline_path, merge_options)?;

        if !options.dry_run {
            crate::install::install_dependencies(&mainline_path)
                .map_err(|message| LifecycleError::InstallFailed { message })?;
        }

        Ok(self.clean(target, Some(worktree.path), Some(branch), options.dry_run, options.force, true, false))
    }

    fn finish_pr(&self, target: WorkspaceTarget, options: FinishOptions) -> anyhow::Result<CleanupResult> {
        let pr = self.tracker.fetch_pr(target.number.expect("Issue/PullRequest targets always carry a number"))?;
        let worktree = self.existing_worktree(&target)?;

        if pr.state == PrState::Open {
            if let Some(worktree) = &worktree
                && !options.dry_run
            {
                let _ = crate::shell_exec::Cmd::new("git")
                    .current_dir(&worktree.path)
                    .args(["push", "origin", pr.branch.as_str()])
                    .context("push-open-pr")
                    .run_checked();
            }
            return Ok(CleanupResult {
                target,
                success: true,
                operations: Vec::new(),
                errors: Vec::new(),
                rollback_required: false,
            });
        }

        let path = worktree.as_ref().map(|w| w.path.clone());
        Ok(self.clean(target, path, Some(pr.branch), options.dry_run, options.force, true, false))
    }

    /// §4.2 `cleanup`.
    pub fn cleanup(&self, input: Option<&str>, cwd: &std::path::Path, delete_branch: bool, dry_run: bool, force: bool) -> anyhow::Result<CleanupResult> {
        let target = self.resolve(input, None, cwd)?;
        let worktree = self.existing_worktree(&target)?;
        let path = worktree.as_ref().map(|w| w.path.clone());
        let branch = worktree.and_then(|w| w.branch);
        Ok(self.clean(target, path, branch, dry_run, force, delete_branch, false))
    }

    /// §4.2 `cleanup --all`: tear down every worktree but the primary
    /// checkout, skipping protected branches the same way C12 step 5 does
    /// for a single target.
    pub fn cleanup_all(&self, delete_branch: bool, dry_run: bool, force: bool) -> anyhow::Result<Vec<CleanupResult>> {
        let protected = self.settings.protected_branches();
        let targets: Vec<_> = self
            .vcs
            .list_worktrees()?
            .into_iter()
            .filter(|w| w.path != self.repo_root)
            .filter(|w| w.branch.as_deref().is_none_or(|b| !protected.iter().any(|p| p == b)))
            .map(|w| {
                let branch = w.branch.clone();
                let label = branch.clone().unwrap_or_else(|| w.path.display().to_string());
                (WorkspaceTarget::branch(label.clone(), label), Some(w.path), branch)
            })
            .collect();

        let options = CleanupOptions { dry_run, force, delete_branch, keep_database: false };
        let ctx = CleanupContext {
            vcs: self.vcs,
            database: self.database,
            process: self.process,
            settings: self.settings,
            repo_root: &self.repo_root,
        };
        Ok(cleanup::cleanup_multiple(&ctx, targets, options))
    }

    fn clean(&self, target: WorkspaceTarget, path: Option<PathBuf>, branch: Option<String>, dry_run: bool, force: bool, delete_branch: bool, keep_database: bool) -> CleanupResult {
        let ctx = CleanupContext {
            vcs: self.vcs,
            database: self.database,
            process: self.process,
            settings: self.settings,
            repo_root: &self.repo_root,
        };
        let options = CleanupOptions { dry_run, force, delete_branch, keep_database };
        cleanup::cleanup_worktree(&ctx, target, path.as_deref(), branch.as_deref(), options)
    }

    /// Read-only: enumerate all known workspaces.
    pub fn list(&self) -> anyhow::Result<Vec<Worktree>> {
        Ok(self.vcs.list_worktrees()?)
    }

    /// Read-only: find the workspace matching `target`, if any.
    pub fn find(&self, target: &WorkspaceTarget) -> anyhow::Result<Option<Worktree>> {
        self.existing_worktree(target)
    }
}

fn now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}
