#![allow(dead_code)]

//! Shared scaffolding for the binary-level integration tests: an isolated
//! scratch git repository plus a preconfigured `wsc` [`Command`].
//!
//! Every git invocation routes through an isolated `GIT_CONFIG_GLOBAL`/
//! `GIT_CONFIG_SYSTEM` so tests never read or write the host's real git
//! config, and every `wsc` invocation gets a `HOME` inside the scratch
//! directory so nothing touches the invoking user's environment.

use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const NULL_DEVICE: &str = "/dev/null";

pub struct TestRepo {
    temp_dir: TempDir,
    root: PathBuf,
    git_config_path: PathBuf,
    home_path: PathBuf,
}

impl TestRepo {
    /// Creates a fresh repo on `main` with one commit.
    pub fn new() -> Self {
        let repo = Self::empty();
        repo.run_git(&["commit", "--allow-empty", "-m", "initial commit"]);
        repo
    }

    /// Creates an empty repo with no commits.
    pub fn empty() -> Self {
        let temp_dir = TempDir::new().expect("create tempdir");
        let root = temp_dir.path().join("repo");
        std::fs::create_dir(&root).expect("create repo dir");
        let home_path = temp_dir.path().join("home");
        std::fs::create_dir(&home_path).expect("create home dir");

        let git_config_path = temp_dir.path().join("test-gitconfig");
        std::fs::write(
            &git_config_path,
            "[user]\n\tname = Test User\n\temail = test@example.com\n\
             [advice]\n\tdetachedHead = false\n\
             [init]\n\tdefaultBranch = main\n",
        )
        .expect("write gitconfig");

        let repo = Self {
            temp_dir,
            root,
            git_config_path,
            home_path,
        };
        repo.run_git(&["init", "-q", "-b", "main"]);
        repo
    }

    pub fn root_path(&self) -> &Path {
        &self.root
    }

    pub fn home_path(&self) -> &Path {
        &self.home_path
    }

    /// Where `GitAdapter::generate_worktree_path` places new worktrees by
    /// default: a `<repo-dir-name>-worktrees` sibling directory.
    pub fn worktrees_root(&self) -> PathBuf {
        let repo_name = self.root.file_name().unwrap().to_string_lossy().into_owned();
        self.temp_dir.path().join(format!("{repo_name}-worktrees"))
    }

    fn configure_git_cmd(&self, cmd: &mut Command) {
        cmd.env("GIT_CONFIG_GLOBAL", &self.git_config_path);
        cmd.env("GIT_CONFIG_SYSTEM", NULL_DEVICE);
        cmd.env("GIT_AUTHOR_DATE", "2025-01-01T00:00:00Z");
        cmd.env("GIT_COMMITTER_DATE", "2025-01-01T00:00:00Z");
        cmd.env("GIT_TERMINAL_PROMPT", "0");
        cmd.env("LC_ALL", "C");
        cmd.env("LANG", "C");
    }

    pub fn git_command(&self) -> Command {
        let mut cmd = Command::new("git");
        self.configure_git_cmd(&mut cmd);
        cmd.current_dir(&self.root);
        cmd
    }

    pub fn run_git(&self, args: &[&str]) {
        let output = self.git_command().args(args).output().expect("spawn git");
        assert!(
            output.status.success(),
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr)
        );
    }

    pub fn git_output(&self, args: &[&str]) -> String {
        let output = self.git_command().args(args).output().expect("spawn git");
        assert!(
            output.status.success(),
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    /// Builds a `wsc` [`Command`] rooted at this repo, with every
    /// background-tool-launching flag disabled so tests never spawn an
    /// editor, dev server, shell, or AI agent.
    pub fn wsc_command(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_wsc"));
        cmd.current_dir(&self.root);
        cmd.env_remove("WSC_DB_CREATE_COMMAND");
        cmd.env_remove("WSC_DB_DELETE_COMMAND");
        cmd.env("HOME", &self.home_path);
        cmd.env("GIT_CONFIG_GLOBAL", &self.git_config_path);
        cmd.env("GIT_CONFIG_SYSTEM", NULL_DEVICE);
        cmd.env("GIT_TERMINAL_PROMPT", "0");
        cmd.env("RUST_LOG", "warn");
        cmd
    }

    /// A `wsc` command with every workflow tool-launch flag turned off, so
    /// `start`/`ignite` never tries to spawn an editor or agent process.
    pub fn wsc_command_quiet(&self) -> Command {
        let mut cmd = self.wsc_command();
        cmd.arg("--set").arg("workflows.regular.startIde=false");
        cmd.arg("--set").arg("workflows.regular.startDevServer=false");
        cmd.arg("--set").arg("workflows.regular.startAiAgent=false");
        cmd.arg("--set").arg("workflows.regular.startTerminal=false");
        cmd
    }
}
