//! Config Store error types and formatting.

use crate::styling::{ERROR_EMOJI, HINT_EMOJI, error_message, hint_message};
use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum ConfigError {
    /// A settings file exists but is not valid JSON.
    ParseError { path: PathBuf, message: String },
    /// The merged settings failed schema validation.
    ValidationError {
        violations: Vec<String>,
        had_cli_overrides: bool,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError { path, message } => write!(
                f,
                "{}",
                error_message(format!("Failed to parse {}: {message}", path.display()))
            ),
            ConfigError::ValidationError {
                violations,
                had_cli_overrides,
            } => {
                writeln!(f, "{ERROR_EMOJI} Invalid settings:")?;
                for v in violations {
                    writeln!(f, "  - {v}")?;
                }
                if *had_cli_overrides {
                    write!(
                        f,
                        "{HINT_EMOJI} One or more --set overrides may be the cause"
                    )
                } else {
                    write!(f, "{}", hint_message("Fix settings.json or settings.local.json"))
                }
            }
        }
    }
}

impl std::error::Error for ConfigError {}
