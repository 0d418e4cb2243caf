//! Database Adapter (C5): isolated per-workspace database branches.

use crate::shell_exec::Cmd;
use std::fmt;

#[derive(Debug)]
pub enum DatabaseError {
    CommandFailed(String),
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseError::CommandFailed(msg) => write!(f, "database provider command failed: {msg}"),
        }
    }
}

impl std::error::Error for DatabaseError {}

/// Abstracts over the remote database provider's branching CLI (e.g. a
/// Postgres-as-a-service branch-per-workspace provider).
pub trait DatabaseAdapter {
    fn create_branch_if_configured(&self, name: &str) -> Result<Option<String>, DatabaseError>;
    fn delete_branch_if_configured(&self, name: &str) -> Result<bool, DatabaseError>;
}

/// No-op adapter used when no database provider is configured.
pub struct NullDatabaseAdapter;

impl DatabaseAdapter for NullDatabaseAdapter {
    fn create_branch_if_configured(&self, _name: &str) -> Result<Option<String>, DatabaseError> {
        Ok(None)
    }

    fn delete_branch_if_configured(&self, _name: &str) -> Result<bool, DatabaseError> {
        Ok(false)
    }
}

/// Generic CLI-provider adapter: a project declares a template command for
/// branch create/delete, analogous to the teacher's `CommandConfig`
/// template-expansion pattern used for arbitrary project commands.
pub struct CliDatabaseAdapter {
    pub create_command: String,
    pub delete_command: String,
}

impl CliDatabaseAdapter {
    pub fn new(create_command: impl Into<String>, delete_command: impl Into<String>) -> Self {
        Self {
            create_command: create_command.into(),
            delete_command: delete_command.into(),
        }
    }

    fn expand(template: &str, branch: &str) -> String {
        template.replace("{{ branch }}", branch).replace("{{branch}}", branch)
    }
}

impl DatabaseAdapter for CliDatabaseAdapter {
    fn create_branch_if_configured(&self, name: &str) -> Result<Option<String>, DatabaseError> {
        let command = Self::expand(&self.create_command, name);
        let output = Cmd::new("sh")
            .arg("-c")
            .arg(&command)
            .context("db-create-branch")
            .run_checked()
            .map_err(|e| DatabaseError::CommandFailed(e.to_string()))?;
        Ok(Some(output))
    }

    fn delete_branch_if_configured(&self, name: &str) -> Result<bool, DatabaseError> {
        let command = Self::expand(&self.delete_command, name);
        Cmd::new("sh")
            .arg("-c")
            .arg(&command)
            .context("db-delete-branch")
            .run_checked()
            .map_err(|e| DatabaseError::CommandFailed(e.to_string()))?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_adapter_never_creates_or_deletes() {
        let adapter = NullDatabaseAdapter;
        assert_eq!(adapter.create_branch_if_configured("issue-42").unwrap(), None);
        assert!(!adapter.delete_branch_if_configured("issue-42").unwrap());
    }

    #[test]
    fn template_expansion_substitutes_branch_name() {
        let expanded = CliDatabaseAdapter::expand("echo url-for-{{ branch }}", "issue-42");
        assert_eq!(expanded, "echo url-for-issue-42");
    }
}
