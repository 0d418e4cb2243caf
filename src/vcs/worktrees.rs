//! Worktree listing model and branch-pattern matching for issues (§4.3).

use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize)]
pub struct Worktree {
    pub path: PathBuf,
    pub head: String,
    pub branch: Option<String>,
    pub bare: bool,
    pub detached: bool,
    pub locked: Option<String>,
}

/// Parse the output of `git worktree list --porcelain`.
pub fn parse_porcelain(output: &str) -> Vec<Worktree> {
    let mut worktrees = Vec::new();
    let mut path: Option<PathBuf> = None;
    let mut head = String::new();
    let mut branch = None;
    let mut bare = false;
    let mut detached = false;
    let mut locked = None;

    let flush = |path: &mut Option<PathBuf>,
                 head: &mut String,
                 branch: &mut Option<String>,
                 bare: &mut bool,
                 detached: &mut bool,
                 locked: &mut Option<String>,
                 out: &mut Vec<Worktree>| {
        if let Some(p) = path.take() {
            out.push(Worktree {
                path: p,
                head: std::mem::take(head),
                branch: branch.take(),
                bare: std::mem::take(bare),
                detached: std::mem::take(detached),
                locked: locked.take(),
            });
        }
    };

    for line in output.lines() {
        if line.is_empty() {
            flush(&mut path, &mut head, &mut branch, &mut bare, &mut detached, &mut locked, &mut worktrees);
            continue;
        }
        if let Some(rest) = line.strip_prefix("worktree ") {
            flush(&mut path, &mut head, &mut branch, &mut bare, &mut detached, &mut locked, &mut worktrees);
            path = Some(PathBuf::from(rest));
        } else if let Some(rest) = line.strip_prefix("HEAD ") {
            head = rest.to_string();
        } else if let Some(rest) = line.strip_prefix("branch ") {
            branch = Some(rest.trim_start_matches("refs/heads/").to_string());
        } else if line == "bare" {
            bare = true;
        } else if line == "detached" {
            detached = true;
        } else if let Some(rest) = line.strip_prefix("locked") {
            locked = Some(rest.trim_start().to_string());
        }
    }
    flush(&mut path, &mut head, &mut branch, &mut bare, &mut detached, &mut locked, &mut worktrees);
    worktrees
}

/// §4.3 `findAllBranchesForIssue`: match branches referencing issue `n` on a
/// digit boundary, filtering protected branches and deduplicating remote
/// tracking prefixes.
pub fn find_all_branches_for_issue<'a>(
    n: u64,
    branches: impl IntoIterator<Item = &'a str>,
    protected: &[String],
) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    let target = n.to_string();

    for raw in branches {
        let stripped = strip_remote_prefix(raw);
        if protected.iter().any(|p| p == stripped) {
            continue;
        }
        if branch_references_issue(stripped, &target) && seen.insert(stripped.to_string()) {
            out.push(stripped.to_string());
        }
    }
    out
}

fn strip_remote_prefix(branch: &str) -> &str {
    branch.split_once('/').map_or(branch, |(first, rest)| {
        if first == "origin" || first.ends_with("-remote") {
            rest
        } else {
            branch
        }
    })
}

fn branch_references_issue(branch: &str, target: &str) -> bool {
    for caps in find_digit_runs(branch) {
        if caps == target {
            return true;
        }
    }
    false
}

/// Extract maximal runs of digits from `branch` bounded by non-digit
/// characters on both sides (or string start/end), so "42" never matches
/// inside "425" or "142".
fn find_digit_runs(branch: &str) -> Vec<String> {
    let mut runs = Vec::new();
    let mut current = String::new();
    for ch in branch.chars() {
        if ch.is_ascii_digit() {
            current.push(ch);
        } else if !current.is_empty() {
            runs.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}
