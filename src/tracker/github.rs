//! `gh`-CLI-backed Issue-Tracker Adapter, following the same
//! shell-out-then-parse-JSON shape as the teacher's CI-status collector.

use super::{DetectedKind, Issue, IssueState, IssueTracker, PrState, PullRequest, TrackerError, slugify};
use crate::shell_exec::Cmd;
use serde::Deserialize;

pub struct GithubTracker;

impl GithubTracker {
    pub fn new() -> Self {
        Self
    }

    /// `number` is the issue/PR this call is about, when there is one — it's
    /// threaded into `classify_gh_failure` so a NotFound error's message
    /// includes the original input verbatim (§7), not a placeholder.
    fn run_json(&self, args: &[&str], number: Option<u64>) -> Result<serde_json::Value, TrackerError> {
        let output = Cmd::new("gh").args(args).context("gh").run().map_err(|e| {
            TrackerError::NetworkError(e.to_string())
        })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_gh_failure(&stderr, number));
        }
        serde_json::from_slice(&output.stdout)
            .map_err(|e| TrackerError::NetworkError(format!("invalid gh output: {e}")))
    }
}

impl Default for GithubTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn classify_gh_failure(stderr: &str, number: Option<u64>) -> TrackerError {
    let lower = stderr.to_lowercase();
    if lower.contains("not found") || lower.contains("404") {
        TrackerError::NotFound {
            number: number.unwrap_or(0),
        }
    } else if lower.contains("authentication") || lower.contains("401") {
        TrackerError::AuthRequired
    } else if lower.contains("rate limit") || lower.contains("429") {
        TrackerError::RateLimited
    } else {
        TrackerError::NetworkError(stderr.trim().to_string())
    }
}

#[derive(Deserialize)]
struct RawIssue {
    number: u64,
    title: String,
    state: String,
    body: Option<String>,
    labels: Vec<RawLabel>,
    assignees: Vec<RawUser>,
    url: String,
}

#[derive(Deserialize)]
struct RawLabel {
    name: String,
}

#[derive(Deserialize)]
struct RawUser {
    login: String,
}

#[derive(Deserialize)]
struct RawPr {
    number: u64,
    title: String,
    state: String,
    #[serde(rename = "headRefName")]
    head_ref_name: String,
    #[serde(rename = "baseRefName")]
    base_ref_name: String,
    body: Option<String>,
    url: String,
    #[serde(rename = "isDraft")]
    is_draft: bool,
}

impl IssueTracker for GithubTracker {
    fn detect_input_type(&self, number: u64) -> Result<DetectedKind, TrackerError> {
        if self.fetch_issue(number).is_ok() {
            return Ok(DetectedKind::Issue);
        }
        if self.fetch_pr(number).is_ok() {
            return Ok(DetectedKind::Pr);
        }
        Ok(DetectedKind::Unknown)
    }

    fn fetch_issue(&self, number: u64) -> Result<Issue, TrackerError> {
        let value = self.run_json(
            &[
                "issue",
                "view",
                &number.to_string(),
                "--json",
                "number,title,state,body,labels,assignees,url",
            ],
            Some(number),
        )?;
        let raw: RawIssue = serde_json::from_value(value)
            .map_err(|e| TrackerError::NetworkError(e.to_string()))?;
        Ok(Issue {
            number: raw.number,
            title: raw.title,
            state: if raw.state.eq_ignore_ascii_case("closed") {
                IssueState::Closed
            } else {
                IssueState::Open
            },
            body: raw.body.unwrap_or_default(),
            labels: raw.labels.into_iter().map(|l| l.name).collect(),
            assignees: raw.assignees.into_iter().map(|a| a.login).collect(),
            url: raw.url,
        })
    }

    fn fetch_pr(&self, number: u64) -> Result<PullRequest, TrackerError> {
        let value = self.run_json(
            &[
                "pr",
                "view",
                &number.to_string(),
                "--json",
                "number,title,state,headRefName,baseRefName,body,url,isDraft",
            ],
            Some(number),
        )?;
        let raw: RawPr = serde_json::from_value(value)
            .map_err(|e| TrackerError::NetworkError(e.to_string()))?;
        let state = match raw.state.to_uppercase().as_str() {
            "MERGED" => PrState::Merged,
            "CLOSED" => PrState::Closed,
            _ => PrState::Open,
        };
        Ok(PullRequest {
            number: raw.number,
            title: raw.title,
            state,
            branch: raw.head_ref_name,
            base_branch: raw.base_ref_name,
            body: raw.body.unwrap_or_default(),
            url: raw.url,
            is_draft: raw.is_draft,
        })
    }

    fn generate_branch_name(&self, number: u64, title: &str) -> String {
        let slug = slugify(title, 40);
        format!("feat/issue-{number}-{slug}")
    }

    fn move_issue_to_in_progress(&self, number: u64) -> Result<(), TrackerError> {
        let output = Cmd::new("gh")
            .args(["issue", "edit", &number.to_string(), "--add-label", "in-progress"])
            .context("gh")
            .run()
            .map_err(|e| TrackerError::NetworkError(e.to_string()))?;
        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.to_lowercase().contains("scope") {
                Err(TrackerError::MissingScope("issue write".to_string()))
            } else {
                Err(classify_gh_failure(&stderr, Some(number)))
            }
        }
    }

    fn create_issue(&self, title: &str, body: &str) -> Result<Issue, TrackerError> {
        let value = self.run_json(
            &[
                "issue",
                "create",
                "--title",
                title,
                "--body",
                body,
                "--json",
                "number,title,state,body,labels,assignees,url",
            ],
            None,
        )?;
        let raw: RawIssue = serde_json::from_value(value)
            .map_err(|e| TrackerError::NetworkError(e.to_string()))?;
        Ok(Issue {
            number: raw.number,
            title: raw.title,
            state: IssueState::Open,
            body: raw.body.unwrap_or_default(),
            labels: raw.labels.into_iter().map(|l| l.name).collect(),
            assignees: raw.assignees.into_iter().map(|a| a.login).collect(),
            url: raw.url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_branch_name_matches_scenario_1() {
        let tracker = GithubTracker::new();
        assert_eq!(
            tracker.generate_branch_name(42, "Add OAuth"),
            "feat/issue-42-add-oauth"
        );
    }

    #[test]
    fn not_found_message_includes_the_original_number() {
        let err = classify_gh_failure("GraphQL: Could not resolve to an issue (404)", Some(42));
        assert_eq!(err.to_string(), "#42 was not found");
    }

    #[test]
    fn not_found_without_a_known_number_falls_back_to_zero() {
        let err = classify_gh_failure("HTTP 404: Not Found", None);
        assert_eq!(err.to_string(), "#0 was not found");
    }
}
