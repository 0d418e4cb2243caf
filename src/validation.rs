//! Validation Runner (C9): execute configured quality gates inside a
//! workspace (§4.9).

use crate::shell_exec::Cmd;
use std::path::Path;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct StepResult {
    pub name: String,
    pub duration_ms: u64,
    pub success: bool,
    pub output: String,
}

#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub success: bool,
    pub steps: Vec<StepResult>,
    pub total_duration: Duration,
}

/// Derive the gate list from a project's manifest: any of test/typecheck/lint
/// scripts that are declared become steps, run in that fixed order.
pub fn derive_steps(path: &Path) -> Vec<(&'static str, String)> {
    let Ok(contents) = std::fs::read_to_string(path.join("package.json")) else {
        return Vec::new();
    };
    let Ok(manifest) = serde_json::from_str::<serde_json::Value>(&contents) else {
        return Vec::new();
    };
    let Some(scripts) = manifest.get("scripts").and_then(|s| s.as_object()) else {
        return Vec::new();
    };

    [("test", "test"), ("typecheck", "typecheck"), ("lint", "lint")]
        .into_iter()
        .filter_map(|(name, script_key)| scripts.get(script_key).map(|_| (name, script_key.to_string())))
        .collect()
}

/// Run every declared gate inside `path`. Every step runs even after an
/// earlier failure (§4.9); only the aggregated `success` flag is a hard
/// stop for C13.
pub fn run_validations(path: &Path) -> ValidationResult {
    let steps_to_run = derive_steps(path);
    let mut steps = Vec::new();
    let mut success = true;
    let overall_start = Instant::now();

    for (name, script) in steps_to_run {
        let start = Instant::now();
        let output = Cmd::new("npm")
            .args(["run", &script])
            .current_dir(path)
            .context(name)
            .run();
        let duration_ms = start.elapsed().as_millis() as u64;
        let (step_success, text) = match output {
            Ok(out) => (
                out.status.success(),
                String::from_utf8_lossy(&out.stdout).into_owned(),
            ),
            Err(e) => (false, e.to_string()),
        };
        if !step_success {
            success = false;
        }
        steps.push(StepResult {
            name: name.to_string(),
            duration_ms,
            success: step_success,
            output: text,
        });
    }

    ValidationResult {
        success,
        steps,
        total_duration: overall_start.elapsed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn derive_steps_picks_up_declared_scripts_in_order() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("package.json"),
            r#"{"scripts": {"lint": "eslint .", "test": "vitest"}}"#,
        )
        .unwrap();
        let steps = derive_steps(dir.path());
        let names: Vec<&str> = steps.iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["test", "lint"]);
    }

    #[test]
    fn derive_steps_is_empty_without_manifest() {
        let dir = TempDir::new().unwrap();
        assert!(derive_steps(dir.path()).is_empty());
    }
}
