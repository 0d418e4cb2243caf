//! Identifier Resolver (C2): parse user input + cwd into a canonical
//! [`WorkspaceTarget`] (§3, §4.2 step 1, §9 "Identifier auto-detection").

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Issue,
    PullRequest,
    Branch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceTarget {
    pub kind: TargetKind,
    pub number: Option<u64>,
    pub branch_name: Option<String>,
    pub original_input: String,
}

impl WorkspaceTarget {
    pub fn issue(number: u64, original_input: impl Into<String>) -> Self {
        Self {
            kind: TargetKind::Issue,
            number: Some(number),
            branch_name: None,
            original_input: original_input.into(),
        }
    }

    pub fn pull_request(number: u64, original_input: impl Into<String>) -> Self {
        Self {
            kind: TargetKind::PullRequest,
            number: Some(number),
            branch_name: None,
            original_input: original_input.into(),
        }
    }

    pub fn branch(name: impl Into<String>, original_input: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            kind: TargetKind::Branch,
            number: None,
            branch_name: Some(name),
            original_input: original_input.into(),
        }
    }
}

#[derive(Debug)]
pub enum ResolveError {
    MissingIdentifier,
    InvalidIdentifier { input: String },
    AutoDetectFailed,
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::MissingIdentifier => {
                write!(f, "no identifier given and none could be auto-detected")
            }
            ResolveError::InvalidIdentifier { input } => {
                write!(f, "'{input}' is not a valid issue, PR, or branch identifier")
            }
            ResolveError::AutoDetectFailed => {
                write!(f, "could not auto-detect a workspace from the current directory")
            }
        }
    }
}

impl std::error::Error for ResolveError {}

static PR_FORMAT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^pr[-/](\d+)$").unwrap());
static NUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").unwrap());
static INVALID_BRANCH_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[@\s\x00-\x1f\x7f]").unwrap());
static CWD_PR: Lazy<Regex> = Lazy::new(|| Regex::new(r"_pr_(\d+)").unwrap());
static CWD_ISSUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"issue-(\d+)").unwrap());

/// Probes a numeric identifier to classify it as issue or PR; abstracts over
/// the Issue-Tracker Adapter (C4) so this module stays testable without it.
pub trait NumberClassifier {
    fn classify(&self, number: u64) -> Result<TargetKind, ResolveError>;
}

/// Resolves a free-form identifier plus explicit CLI flags into a
/// [`WorkspaceTarget`]. `cwd` and `current_branch` are explicit parameters
/// (never read from process state) so auto-detection stays unit-testable.
pub fn resolve(
    input: Option<&str>,
    explicit_pr: Option<u64>,
    cwd_basename: &str,
    current_branch: Option<&str>,
    classifier: &dyn NumberClassifier,
) -> Result<WorkspaceTarget, ResolveError> {
    if let Some(n) = explicit_pr {
        let original = input.unwrap_or_default().to_string();
        return Ok(WorkspaceTarget::pull_request(n, original));
    }

    if let Some(raw) = input {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ResolveError::MissingIdentifier);
        }

        if let Some(captures) = PR_FORMAT.captures(trimmed) {
            let n = parse_number(&captures[1]);
            return Ok(WorkspaceTarget::pull_request(n, raw));
        }

        if NUMERIC.is_match(trimmed) {
            let n = parse_number(trimmed);
            return match classifier.classify(n)? {
                TargetKind::PullRequest => Ok(WorkspaceTarget::pull_request(n, raw)),
                _ => Ok(WorkspaceTarget::issue(n, raw)),
            };
        }

        if INVALID_BRANCH_CHARS.is_match(trimmed) {
            return Err(ResolveError::InvalidIdentifier {
                input: raw.to_string(),
            });
        }

        return Ok(WorkspaceTarget::branch(trimmed, raw));
    }

    auto_detect(cwd_basename, current_branch)
}

fn auto_detect(cwd_basename: &str, current_branch: Option<&str>) -> Result<WorkspaceTarget, ResolveError> {
    if let Some(captures) = CWD_PR.captures(cwd_basename) {
        let n = parse_number(&captures[1]);
        return Ok(WorkspaceTarget::pull_request(n, cwd_basename.to_string()));
    }
    if let Some(captures) = CWD_ISSUE.captures(cwd_basename) {
        let n = parse_number(&captures[1]);
        return Ok(WorkspaceTarget::issue(n, cwd_basename.to_string()));
    }
    match current_branch {
        Some(branch) => Ok(WorkspaceTarget::branch(branch, branch)),
        None => Err(ResolveError::AutoDetectFailed),
    }
}

/// Normalize leading zeros (e.g. "00042" -> 42).
fn parse_number(digits: &str) -> u64 {
    digits.parse().unwrap_or(0)
}

pub fn cwd_basename(cwd: &Path) -> String {
    cwd.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
