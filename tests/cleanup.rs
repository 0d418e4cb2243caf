mod common;

use common::TestRepo;

#[test]
fn cleanup_removes_worktree_and_reports_success() {
    let repo = TestRepo::new();

    let start = repo
        .wsc_command_quiet()
        .arg("start")
        .arg("feature-cleanup")
        .output()
        .expect("run wsc start");
    assert!(start.status.success(), "{}", String::from_utf8_lossy(&start.stderr));

    let worktree_path = repo.worktrees_root().join("feature-cleanup");
    assert!(worktree_path.is_dir());

    let cleanup = repo
        .wsc_command()
        .arg("cleanup")
        .arg("feature-cleanup")
        .output()
        .expect("run wsc cleanup");
    assert!(cleanup.status.success(), "{}", String::from_utf8_lossy(&cleanup.stderr));
    assert!(!worktree_path.exists());

    let branches = repo.git_output(&["branch", "--list", "feature-cleanup"]);
    assert!(
        branches.contains("feature-cleanup"),
        "branch should survive cleanup without --delete-branch"
    );
}

#[test]
fn cleanup_with_delete_branch_also_removes_the_branch() {
    let repo = TestRepo::new();

    let start = repo
        .wsc_command_quiet()
        .arg("start")
        .arg("feature-delete")
        .output()
        .expect("run wsc start");
    assert!(start.status.success(), "{}", String::from_utf8_lossy(&start.stderr));

    let cleanup = repo
        .wsc_command()
        .arg("cleanup")
        .arg("feature-delete")
        .arg("--delete-branch")
        .arg("--force")
        .output()
        .expect("run wsc cleanup --delete-branch --force");
    assert!(cleanup.status.success(), "{}", String::from_utf8_lossy(&cleanup.stderr));

    let branches = repo.git_output(&["branch", "--list", "feature-delete"]);
    assert!(branches.is_empty());
}

#[test]
fn cleanup_without_matching_worktree_is_a_no_op_success() {
    let repo = TestRepo::new();

    let output = repo
        .wsc_command()
        .arg("cleanup")
        .arg("does-not-exist")
        .output()
        .expect("run wsc cleanup");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stdout).contains("no worktree found"));
}

#[test]
fn cleanup_list_shows_started_workspace_without_touching_it() {
    let repo = TestRepo::new();

    let start = repo
        .wsc_command_quiet()
        .arg("start")
        .arg("feature-list-candidate")
        .output()
        .expect("run wsc start");
    assert!(start.status.success(), "{}", String::from_utf8_lossy(&start.stderr));

    let output = repo
        .wsc_command()
        .arg("cleanup")
        .arg("--list")
        .output()
        .expect("run wsc cleanup --list");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stdout).contains("feature-list-candidate"));
    assert!(repo.worktrees_root().join("feature-list-candidate").is_dir());
}

#[test]
fn cleanup_all_removes_every_non_protected_worktree() {
    let repo = TestRepo::new();

    for branch in ["feature-all-one", "feature-all-two"] {
        let start = repo
            .wsc_command_quiet()
            .arg("start")
            .arg(branch)
            .output()
            .expect("run wsc start");
        assert!(start.status.success(), "{}", String::from_utf8_lossy(&start.stderr));
    }

    let output = repo
        .wsc_command()
        .arg("cleanup")
        .arg("--all")
        .arg("--force")
        .output()
        .expect("run wsc cleanup --all");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(!repo.worktrees_root().join("feature-all-one").exists());
    assert!(!repo.worktrees_root().join("feature-all-two").exists());
}

#[test]
fn cleanup_list_rejects_an_identifier() {
    let repo = TestRepo::new();

    let output = repo
        .wsc_command()
        .arg("cleanup")
        .arg("--list")
        .arg("feature-conflict")
        .output()
        .expect("run wsc cleanup --list feature-conflict");
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("--list"));
}

#[test]
fn cleanup_issue_rejects_a_non_numeric_identifier() {
    let repo = TestRepo::new();

    let output = repo
        .wsc_command()
        .arg("cleanup")
        .arg("--issue")
        .arg("42")
        .arg("not-a-number")
        .output()
        .expect("run wsc cleanup --issue 42 not-a-number");
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("--issue"));
}
