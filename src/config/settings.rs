//! Typed settings schema (§3 Settings/WorkflowConfig/AgentConfig).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[strum(serialize_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub enum PermissionMode {
    Plan,
    AcceptEdits,
    BypassPermissions,
    Default,
}

impl Default for PermissionMode {
    fn default() -> Self {
        PermissionMode::Default
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AgentModel {
    Sonnet,
    Opus,
    Haiku,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WorkflowConfig {
    pub permission_mode: PermissionMode,
    pub no_verify: bool,
    pub start_ide: bool,
    pub start_dev_server: bool,
    pub start_ai_agent: bool,
    pub start_terminal: bool,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            permission_mode: PermissionMode::Default,
            no_verify: false,
            start_ide: true,
            start_dev_server: true,
            start_ai_agent: true,
            start_terminal: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString, Hash)]
#[strum(serialize_all = "kebab-case")]
pub enum WorkflowKind {
    Issue,
    PullRequest,
    Regular,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub model: Option<AgentModel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WebCapabilityConfig {
    pub base_port: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DatabaseCapabilityConfig {
    pub database_url_env_var_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CapabilitiesConfig {
    pub web: WebCapabilityConfig,
    pub database: DatabaseCapabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub main_branch: String,
    pub worktree_prefix: Option<String>,
    pub protected_branches: Option<Vec<String>>,
    pub workflows: IndexMap<String, WorkflowConfig>,
    pub agents: IndexMap<String, AgentConfig>,
    pub capabilities: CapabilitiesConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            main_branch: "main".to_string(),
            worktree_prefix: None,
            protected_branches: None,
            workflows: IndexMap::new(),
            agents: IndexMap::new(),
            capabilities: CapabilitiesConfig::default(),
        }
    }
}

impl Settings {
    pub const DEFAULT_BASE_PORT: u32 = 3000;
    pub const DEFAULT_DATABASE_URL_ENV_VAR_NAME: &'static str = "DATABASE_URL";

    /// Top-level keys a single settings file is allowed to declare (§6:
    /// unknown keys are rejected per-file, before the deep merge).
    pub const KNOWN_KEYS: &'static [&'static str] = &[
        "mainBranch",
        "worktreePrefix",
        "protectedBranches",
        "workflows",
        "agents",
        "capabilities",
    ];

    pub fn base_port(&self) -> u32 {
        self.capabilities
            .web
            .base_port
            .unwrap_or(Self::DEFAULT_BASE_PORT)
    }

    pub fn database_url_env_var_name(&self) -> &str {
        self.capabilities
            .database
            .database_url_env_var_name
            .as_deref()
            .unwrap_or(Self::DEFAULT_DATABASE_URL_ENV_VAR_NAME)
    }

    pub fn workflow_for(&self, kind: WorkflowKind) -> WorkflowConfig {
        self.workflows
            .get(&kind.to_string())
            .cloned()
            .unwrap_or_default()
    }

    /// §4.1 protectedBranches contract.
    pub fn protected_branches(&self) -> Vec<String> {
        match &self.protected_branches {
            None => vec![
                self.main_branch.clone(),
                "main".to_string(),
                "master".to_string(),
                "develop".to_string(),
            ],
            Some(list) => {
                if list.iter().any(|b| b == &self.main_branch) {
                    list.clone()
                } else {
                    let mut out = vec![self.main_branch.clone()];
                    out.extend(list.clone());
                    out
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_protected_branches_includes_backward_compat_list() {
        let settings = Settings::default();
        assert_eq!(
            settings.protected_branches(),
            vec!["main", "main", "master", "develop"]
        );
    }

    #[test]
    fn protected_branches_prepends_main_when_absent() {
        let settings = Settings {
            main_branch: "trunk".to_string(),
            protected_branches: Some(vec!["release".to_string()]),
            ..Settings::default()
        };
        assert_eq!(settings.protected_branches(), vec!["trunk", "release"]);
    }

    #[test]
    fn protected_branches_not_duplicated_when_present() {
        let settings = Settings {
            main_branch: "trunk".to_string(),
            protected_branches: Some(vec!["trunk".to_string(), "release".to_string()]),
            ..Settings::default()
        };
        assert_eq!(settings.protected_branches(), vec!["trunk", "release"]);
    }

    #[test]
    fn base_port_defaults_to_3000() {
        assert_eq!(Settings::default().base_port(), 3000);
    }
}
