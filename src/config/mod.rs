//! Config Store (C1): load, merge, and validate hierarchical settings.

mod error;
mod merge;
mod settings;

pub use error::ConfigError;
pub use settings::{
    AgentConfig, AgentModel, CapabilitiesConfig, PermissionMode, Settings, WorkflowConfig,
    WorkflowKind,
};

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::fs;
use std::path::Path;

pub const SETTINGS_DIR: &str = ".wsc";

static WORKTREE_PREFIX_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]*[A-Za-z0-9][A-Za-z0-9_-]*$").unwrap());
static DATABASE_ENV_VAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z_][A-Z0-9_]*$").unwrap());

/// Load and validate settings for a project root, applying `--set key=value`
/// CLI overrides at the highest merge priority (§4.1).
pub fn load(project_root: &Path, cli_overrides: &Value) -> Result<Settings, ConfigError> {
    let settings_dir = project_root.join(SETTINGS_DIR);
    let base_path = settings_dir.join("settings.json");
    let local_path = settings_dir.join("settings.local.json");
    let base = read_json_file(&base_path)?;
    let local = read_json_file(&local_path)?;

    reject_unknown_keys(&base, &base_path)?;
    reject_unknown_keys(&local, &local_path)?;

    let merged = merge::merge_all([Value::Object(Default::default()), base, local, cli_overrides.clone()]);

    let settings: Settings = serde_json::from_value(merged).map_err(|e| ConfigError::ValidationError {
        violations: vec![e.to_string()],
        had_cli_overrides: !matches!(cli_overrides, Value::Null)
            && cli_overrides.as_object().is_some_and(|m| !m.is_empty()),
    })?;

    let violations = validate(&settings);
    if !violations.is_empty() {
        return Err(ConfigError::ValidationError {
            violations,
            had_cli_overrides: cli_overrides.as_object().is_some_and(|m| !m.is_empty()),
        });
    }

    Ok(settings)
}

/// §4.1 protectedBranches contract, as a standalone entry point so callers
/// that only need the protected-branch list don't have to load full Settings.
pub fn get_protected_branches(project_root: &Path) -> Result<Vec<String>, ConfigError> {
    let settings = load(project_root, &Value::Null)?;
    Ok(settings.protected_branches())
}

fn read_json_file(path: &Path) -> Result<Value, ConfigError> {
    match fs::read_to_string(path) {
        Ok(contents) => serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Value::Object(Default::default())),
        Err(e) => Err(ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        }),
    }
}

/// §6: unknown keys are rejected at the single-file level, before the deep
/// merge makes the combined view permissive about which file a known key
/// came from.
fn reject_unknown_keys(value: &Value, path: &Path) -> Result<(), ConfigError> {
    let Value::Object(map) = value else {
        return Ok(());
    };

    let unknown: Vec<String> = map
        .keys()
        .filter(|k| !Settings::KNOWN_KEYS.contains(&k.as_str()))
        .map(|k| format!("{}: unknown key '{k}'", path.display()))
        .collect();

    if unknown.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            violations: unknown,
            had_cli_overrides: false,
        })
    }
}

fn validate(settings: &Settings) -> Vec<String> {
    let mut violations = Vec::new();

    if settings.main_branch.trim().is_empty() {
        violations.push("mainBranch: must be non-empty".to_string());
    }

    if let Some(prefix) = &settings.worktree_prefix
        && !prefix.split('/').all(|segment| WORKTREE_PREFIX_SEGMENT.is_match(segment))
    {
        violations.push(format!(
            "worktreePrefix: '{prefix}' does not match the required segment grammar"
        ));
    }

    let base_port = settings.base_port();
    if base_port == 0 || base_port > 65535 {
        violations.push(format!(
            "capabilities.web.basePort: {base_port} is outside [1, 65535]"
        ));
    }

    let env_var = settings.database_url_env_var_name();
    if !DATABASE_ENV_VAR.is_match(env_var) {
        violations.push(format!(
            "capabilities.database.databaseUrlEnvVarName: '{env_var}' is not a valid identifier"
        ));
    }

    if let Some(branches) = &settings.protected_branches
        && branches.iter().any(|b| b.trim().is_empty())
    {
        violations.push("protectedBranches: entries must be non-empty".to_string());
    }

    violations
}
