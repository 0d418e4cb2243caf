//! Library crate backing the `wsc` binary: every [MODULE] from the
//! workspace-lifecycle specification, plus the ambient logging, error, and
//! config infrastructure that wraps them.

pub mod capabilities;
pub mod cleanup;
pub mod cli;
pub mod command_log;
pub mod commit;
pub mod config;
pub mod database;
pub mod env_file;
pub mod identifier;
pub mod install;
pub mod lifecycle;
pub mod merge;
pub mod process;
pub mod shell_exec;
pub mod styling;
pub mod tracker;
pub mod validation;
pub mod vcs;

use cli::{Cli, Command};
use config::Settings;
use database::{CliDatabaseAdapter, DatabaseAdapter, NullDatabaseAdapter};
use identifier::WorkspaceTarget;
use lifecycle::{Coordinator, FinishOptions, LifecycleError, StartOptions};
use process::SystemProcessSupervisor;
use std::path::{Path, PathBuf};
use tracker::GithubTracker;
use vcs::GitAdapter;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_USAGE: i32 = 2;
pub const EXIT_VALIDATION: i32 = 3;
pub const EXIT_VCS_CONFLICT: i32 = 4;
pub const EXIT_PARTIAL_CLEANUP: i32 = 5;

/// Resolve the repository root by walking up from `cwd` to the first
/// ancestor containing a `.git` entry.
fn find_repo_root(cwd: &Path) -> Option<PathBuf> {
    let mut dir = cwd;
    loop {
        if dir.join(".git").exists() {
            return Some(dir.to_path_buf());
        }
        dir = dir.parent()?;
    }
}

/// A database provider is configured by setting both commands via
/// environment variables; settings.json only names the URL env var the
/// provider's output should be written to (§4.1 `capabilities.database`).
fn database_adapter(_settings: &Settings) -> Box<dyn DatabaseAdapter> {
    match (std::env::var("WSC_DB_CREATE_COMMAND"), std::env::var("WSC_DB_DELETE_COMMAND")) {
        (Ok(create), Ok(delete)) => Box::new(CliDatabaseAdapter::new(create, delete)),
        _ => Box::new(NullDatabaseAdapter),
    }
}

/// Dispatch a parsed [`Cli`] invocation, returning the process exit code.
pub fn run(cli: Cli) -> i32 {
    styling::set_verbosity(cli.verbose);

    let cwd = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            styling::output::error(&format!("cannot read current directory: {e}"));
            return EXIT_FAILURE;
        }
    };

    let repo_root = match find_repo_root(&cwd) {
        Some(root) => root,
        None => {
            styling::output::error("not inside a git repository");
            return EXIT_USAGE;
        }
    };

    if let Err(e) = command_log::init(&repo_root.join(".git")) {
        log::debug!("command log init failed: {e}");
    }

    let overrides = cli::overrides_to_json(&cli.set);
    let settings = match config::load(&repo_root, &overrides) {
        Ok(settings) => settings,
        Err(e) => {
            styling::output::error(&e.to_string());
            return EXIT_VALIDATION;
        }
    };

    let vcs = GitAdapter::new(repo_root.clone());
    let tracker = GithubTracker::new();
    let database = database_adapter(&settings);
    let process = SystemProcessSupervisor::new();
    let coordinator = Coordinator {
        vcs: &vcs,
        tracker: &tracker,
        database: database.as_ref(),
        process: &process,
        settings: &settings,
        repo_root: repo_root.clone(),
    };

    dispatch(&coordinator, &cwd, cli.command)
}

fn dispatch(coordinator: &Coordinator<'_>, cwd: &Path, command: Command) -> i32 {
    match command {
        Command::Start(args) => run_start(
            coordinator,
            cwd,
            args.target.identifier.as_deref(),
            StartOptions {
                force: args.force,
                dry_run: args.dry_run,
                explicit_pr: args.target.pr,
                skip_agent: args.skip_agent,
                code_only: args.code_only,
                terminal_only: args.terminal_only,
            },
        ),
        Command::Ignite(target) => run_start(
            coordinator,
            cwd,
            target.identifier.as_deref(),
            StartOptions {
                explicit_pr: target.pr,
                ..StartOptions::default()
            },
        ),
        Command::Open(target) => run_start(
            coordinator,
            cwd,
            target.identifier.as_deref(),
            StartOptions {
                explicit_pr: target.pr,
                code_only: true,
                ..StartOptions::default()
            },
        ),
        Command::Finish(args) => run_finish(
            coordinator,
            cwd,
            args.target.identifier.as_deref(),
            FinishOptions {
                force: args.force,
                dry_run: args.dry_run,
                explicit_pr: args.target.pr,
                no_verify: args.no_verify,
            },
        ),
        Command::Cleanup(args) => run_cleanup(coordinator, cwd, args),
        Command::List(args) => run_list(coordinator, args.format.as_deref()),
        Command::AddIssue(args) => run_add_issue(coordinator, cwd, &args.title, &args.body),
        Command::Enhance(args) => run_agent_message(coordinator, cwd, &args.target, &args.message),
        Command::Feedback(args) => run_agent_message(coordinator, cwd, &args.target, &args.message),
        Command::Init => run_init(&coordinator.repo_root),
        Command::Update => {
            styling::output::info(&format!("wsc {}", env!("CARGO_PKG_VERSION")));
            EXIT_SUCCESS
        }
    }
}

fn run_start(coordinator: &Coordinator<'_>, cwd: &Path, identifier: Option<&str>, options: StartOptions) -> i32 {
    match coordinator.start(identifier, cwd, options) {
        Ok(workspace) => {
            styling::output::success(&format!(
                "workspace ready at {} (branch {}, port {})",
                workspace.path.display(),
                workspace.branch,
                workspace.port
            ));
            EXIT_SUCCESS
        }
        Err(e) => exit_code_for(&e),
    }
}

fn run_finish(coordinator: &Coordinator<'_>, cwd: &Path, identifier: Option<&str>, options: FinishOptions) -> i32 {
    match coordinator.finish(identifier, cwd, options) {
        Ok(result) => report_cleanup(&result),
        Err(e) => exit_code_for(&e),
    }
}

/// §4.2 `cleanup`'s four mutually-exclusive modes.
enum CleanupMode {
    Single(Option<String>),
    All,
    List,
    ByNumber(u64),
}

/// Validates `CleanupArgs` into exactly one mode, or a `LifecycleError::
/// OptionConflict` (§4.2: "`all`/`list`/`by-number` must not take an
/// identifier"; "`--issue N` combined with a non-numeric identifier fails").
fn cleanup_mode(args: &cli::CleanupArgs) -> Result<CleanupMode, LifecycleError> {
    let identifier = args.target.identifier.clone();
    let modes_set = [args.list, args.all, args.issue.is_some()].into_iter().filter(|set| *set).count();
    if modes_set > 1 {
        return Err(LifecycleError::OptionConflict(
            "--list, --all, and --issue are mutually exclusive".to_string(),
        ));
    }

    if args.list {
        if identifier.is_some() {
            return Err(LifecycleError::OptionConflict("--list does not take an identifier".to_string()));
        }
        return Ok(CleanupMode::List);
    }

    if args.all {
        if identifier.is_some() {
            return Err(LifecycleError::OptionConflict("--all does not take an identifier".to_string()));
        }
        return Ok(CleanupMode::All);
    }

    if let Some(number) = args.issue {
        if let Some(id) = &identifier
            && id.parse::<u64>().is_err()
        {
            return Err(LifecycleError::OptionConflict(format!(
                "--issue {number} cannot be combined with non-numeric identifier '{id}'"
            )));
        }
        return Ok(CleanupMode::ByNumber(number));
    }

    Ok(CleanupMode::Single(identifier))
}

fn run_cleanup(coordinator: &Coordinator<'_>, cwd: &Path, args: cli::CleanupArgs) -> i32 {
    let mode = match cleanup_mode(&args) {
        Ok(mode) => mode,
        Err(e) => return exit_code_for(&e.into()),
    };

    match mode {
        CleanupMode::List => run_cleanup_list(coordinator),
        CleanupMode::All => run_cleanup_all(coordinator, &args),
        CleanupMode::ByNumber(number) => run_cleanup_single(coordinator, cwd, Some(number.to_string()), &args),
        CleanupMode::Single(identifier) => {
            if !args.dry_run && !args.force && !confirm_cleanup(identifier.as_deref()) {
                styling::output::info("cleanup cancelled");
                return EXIT_SUCCESS;
            }
            run_cleanup_single(coordinator, cwd, identifier, &args)
        }
    }
}

fn run_cleanup_single(coordinator: &Coordinator<'_>, cwd: &Path, identifier: Option<String>, args: &cli::CleanupArgs) -> i32 {
    match coordinator.cleanup(identifier.as_deref(), cwd, args.delete_branch, args.dry_run, args.force) {
        Ok(result) => report_cleanup(&result),
        Err(e) => exit_code_for(&e),
    }
}

fn run_cleanup_all(coordinator: &Coordinator<'_>, args: &cli::CleanupArgs) -> i32 {
    match coordinator.cleanup_all(args.delete_branch, args.dry_run, args.force) {
        Ok(results) => {
            let mut exit = EXIT_SUCCESS;
            for result in &results {
                let code = report_cleanup(result);
                if code != EXIT_SUCCESS {
                    exit = code;
                }
            }
            exit
        }
        Err(e) => exit_code_for(&e),
    }
}

fn run_cleanup_list(coordinator: &Coordinator<'_>) -> i32 {
    match coordinator.list() {
        Ok(worktrees) => {
            let protected = coordinator.settings.protected_branches();
            let candidates: Vec<_> = worktrees
                .into_iter()
                .filter(|w| w.path != coordinator.repo_root)
                .filter(|w| w.branch.as_deref().is_none_or(|b| !protected.iter().any(|p| p == b)))
                .collect();
            if candidates.is_empty() {
                styling::output::info("no cleanup candidates");
            } else {
                for w in &candidates {
                    println!("{:<50} {}", w.path.display(), w.branch.as_deref().unwrap_or("(detached)"));
                }
            }
            EXIT_SUCCESS
        }
        Err(e) => exit_code_for(&e),
    }
}

/// Single-mode confirmation prompt, grounded in the teacher's
/// `prompt_for_batch_approval` (TTY check, `eprint!` prompt, `y`/`N` via
/// `stdin().read_line`).
fn confirm_cleanup(identifier: Option<&str>) -> bool {
    use std::io::{self, IsTerminal, Write};

    if !io::stdin().is_terminal() {
        styling::output::warning("not an interactive terminal; pass --force to skip confirmation");
        return false;
    }

    let label = identifier.unwrap_or("the current workspace");
    eprint!("{} clean up {label}? [y/N] ", styling::PROMPT_EMOJI);
    let _ = io::stderr().flush();

    let mut response = String::new();
    if io::stdin().read_line(&mut response).is_err() {
        return false;
    }
    response.trim().eq_ignore_ascii_case("y")
}

fn run_list(coordinator: &Coordinator<'_>, format: Option<&str>) -> i32 {
    match coordinator.list() {
        Ok(worktrees) => {
            if format == Some("json") {
                let value: Vec<_> = worktrees
                    .iter()
                    .map(|w| {
                        serde_json::json!({
                            "path": w.path,
                            "branch": w.branch,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&value).unwrap_or_default());
            } else {
                for worktree in &worktrees {
                    println!(
                        "{:<50} {}",
                        worktree.path.display(),
                        worktree.branch.as_deref().unwrap_or("(detached)")
                    );
                }
            }
            EXIT_SUCCESS
        }
        Err(e) => exit_code_for(&e),
    }
}

fn run_add_issue(coordinator: &Coordinator<'_>, cwd: &Path, title: &str, body: &str) -> i32 {
    match coordinator.tracker.create_issue(title, body) {
        Ok(issue) => run_start(
            coordinator,
            cwd,
            Some(&issue.number.to_string()),
            StartOptions::default(),
        ),
        Err(e) => {
            styling::output::error(&e.to_string());
            EXIT_FAILURE
        }
    }
}

fn run_agent_message(coordinator: &Coordinator<'_>, cwd: &Path, target: &cli::TargetArgs, message: &str) -> i32 {
    match coordinator.find_target(target.identifier.as_deref(), target.pr, cwd) {
        Ok(resolved) => match coordinator.existing_path_for(&resolved) {
            Some(path) => match coordinator.process.launch_ai_agent(
                &path,
                &coordinator.settings.workflow_for(config::WorkflowKind::Regular),
                message,
            ) {
                Ok(()) => {
                    styling::output::success("agent message delivered");
                    EXIT_SUCCESS
                }
                Err(e) => {
                    styling::output::error(&e.to_string());
                    EXIT_FAILURE
                }
            },
            None => {
                styling::output::error("no worktree found; use 'wsc list' to see available workspaces");
                EXIT_FAILURE
            }
        },
        Err(e) => exit_code_for(&e),
    }
}

fn run_init(repo_root: &Path) -> i32 {
    let settings_dir = repo_root.join(config::SETTINGS_DIR);
    if let Err(e) = std::fs::create_dir_all(&settings_dir) {
        styling::output::error(&format!("failed to create {}: {e}", settings_dir.display()));
        return EXIT_FAILURE;
    }
    let path = settings_dir.join("settings.json");
    if path.exists() {
        styling::output::warning(&format!("{} already exists", path.display()));
        return EXIT_SUCCESS;
    }
    let starter = serde_json::json!({ "mainBranch": "main" });
    match std::fs::write(&path, serde_json::to_string_pretty(&starter).unwrap_or_default()) {
        Ok(()) => {
            styling::output::success(&format!("wrote {}", path.display()));
            EXIT_SUCCESS
        }
        Err(e) => {
            styling::output::error(&format!("failed to write {}: {e}", path.display()));
            EXIT_FAILURE
        }
    }
}

fn report_cleanup(result: &cleanup::CleanupResult) -> i32 {
    for op in &result.operations {
        if op.success {
            styling::output::info(&op.message);
        } else {
            styling::output::warning(&op.message);
        }
    }
    if result.success {
        styling::output::success("done");
        EXIT_SUCCESS
    } else {
        styling::output::error("cleanup finished with unresolved steps");
        EXIT_PARTIAL_CLEANUP
    }
}

/// Classifies a failure that crossed the C13 boundary as `anyhow::Error`
/// (SPEC_FULL.md §2.2) into a process exit code, downcasting to whichever
/// component error produced it.
fn exit_code_for(e: &anyhow::Error) -> i32 {
    styling::output::error(&e.to_string());
    if matches!(
        e.downcast_ref::<vcs::VcsError>(),
        Some(vcs::VcsError::RebaseConflict { .. }) | Some(vcs::VcsError::NotFastForward { .. })
    ) {
        return EXIT_VCS_CONFLICT;
    }
    if let Some(lifecycle_err) = e.downcast_ref::<LifecycleError>() {
        return match lifecycle_err {
            LifecycleError::ValidationFailed => EXIT_VALIDATION,
            LifecycleError::OptionConflict(_) => EXIT_USAGE,
            LifecycleError::ClosedIssueWithoutForce { .. }
            | LifecycleError::NoWorktreeFound
            | LifecycleError::InstallFailed { .. } => EXIT_FAILURE,
        };
    }
    if e.downcast_ref::<identifier::ResolveError>().is_some() {
        return EXIT_USAGE;
    }
    EXIT_FAILURE
}

impl Coordinator<'_> {
    fn find_target(&self, identifier: Option<&str>, explicit_pr: Option<u64>, cwd: &Path) -> anyhow::Result<WorkspaceTarget> {
        self.resolve(identifier, explicit_pr, cwd)
    }

    fn existing_path_for(&self, target: &WorkspaceTarget) -> Option<PathBuf> {
        self.find(target).ok().flatten().map(|w| w.path)
    }
}
