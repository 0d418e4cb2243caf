mod common;

use common::TestRepo;

#[test]
fn start_dry_run_reports_path_without_creating_anything() {
    let repo = TestRepo::new();

    let output = repo
        .wsc_command()
        .arg("start")
        .arg("feature-dry")
        .arg("--dry-run")
        .output()
        .expect("run wsc start --dry-run");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let expected = repo.worktrees_root().join("feature-dry");
    assert!(
        String::from_utf8_lossy(&output.stdout).contains(&expected.display().to_string()),
        "stdout: {}",
        String::from_utf8_lossy(&output.stdout)
    );
    assert!(!expected.exists());
}

#[test]
fn start_creates_branch_and_worktree() {
    let repo = TestRepo::new();

    let output = repo
        .wsc_command_quiet()
        .arg("start")
        .arg("feature-start")
        .output()
        .expect("run wsc start");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let worktree_path = repo.worktrees_root().join("feature-start");
    assert!(worktree_path.is_dir());

    let branches = repo.git_output(&["branch", "--list", "feature-start"]);
    assert!(branches.contains("feature-start"));
}

#[test]
fn start_twice_for_the_same_branch_reuses_the_existing_worktree() {
    let repo = TestRepo::new();

    let first = repo
        .wsc_command_quiet()
        .arg("start")
        .arg("feature-twice")
        .output()
        .expect("run first wsc start");
    assert!(first.status.success(), "{}", String::from_utf8_lossy(&first.stderr));

    let second = repo
        .wsc_command_quiet()
        .arg("start")
        .arg("feature-twice")
        .output()
        .expect("run second wsc start");
    assert!(second.status.success(), "{}", String::from_utf8_lossy(&second.stderr));

    let worktree_path = repo.worktrees_root().join("feature-twice");
    assert!(worktree_path.is_dir());
    assert_eq!(
        String::from_utf8_lossy(&first.stdout),
        String::from_utf8_lossy(&second.stdout)
    );
}

#[test]
fn start_fails_when_branch_exists_without_a_worktree() {
    let repo = TestRepo::new();
    repo.run_git(&["branch", "feature-orphan"]);

    let output = repo
        .wsc_command_quiet()
        .arg("start")
        .arg("feature-orphan")
        .output()
        .expect("run wsc start");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("feature-orphan"));
}

#[test]
fn start_rejects_code_only_and_terminal_only_together() {
    let repo = TestRepo::new();

    let output = repo
        .wsc_command()
        .arg("start")
        .arg("feature-conflict")
        .arg("--code-only")
        .arg("--terminal-only")
        .output()
        .expect("run wsc start");
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("mutually exclusive"));
}
