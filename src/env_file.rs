//! Environment Writer (C8): idempotent `.env` key set/unset via
//! temp-file-and-rename, preserving comments and unrelated keys.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;

static KEY_GRAMMAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z_][A-Z0-9_]*$").unwrap());

#[derive(Debug)]
pub enum EnvFileError {
    InvalidKey(String),
    Io(String),
}

impl fmt::Display for EnvFileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvFileError::InvalidKey(key) => write!(f, "'{key}' is not a valid env var name"),
            EnvFileError::Io(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for EnvFileError {}

impl From<std::io::Error> for EnvFileError {
    fn from(e: std::io::Error) -> Self {
        EnvFileError::Io(e.to_string())
    }
}

/// Set `key=value` in the `.env` file at `path`, creating it if absent.
/// Comments and unrelated lines are preserved; a previous occurrence of
/// `key` is replaced in place, otherwise the assignment is appended.
pub fn set_env_var(path: &Path, key: &str, value: &str) -> Result<(), EnvFileError> {
    if !KEY_GRAMMAR.is_match(key) {
        return Err(EnvFileError::InvalidKey(key.to_string()));
    }
    let mut lines = read_lines(path)?;
    let assignment = format!("{key}={value}");
    let mut replaced = false;
    for line in lines.iter_mut() {
        if let Some(existing_key) = line.split_once('=').map(|(k, _)| k) {
            if existing_key == key {
                *line = assignment.clone();
                replaced = true;
                break;
            }
        }
    }
    if !replaced {
        lines.push(assignment);
    }
    write_atomic(path, &lines)
}

/// Remove any assignment of `key`, leaving everything else untouched.
pub fn unset_env_var(path: &Path, key: &str) -> Result<(), EnvFileError> {
    let lines = read_lines(path)?;
    let filtered: Vec<String> = lines
        .into_iter()
        .filter(|line| line.split_once('=').map(|(k, _)| k) != Some(key))
        .collect();
    write_atomic(path, &filtered)
}

pub fn read_env_var(path: &Path, key: &str) -> Option<String> {
    read_lines(path).ok()?.into_iter().find_map(|line| {
        let (k, v) = line.split_once('=')?;
        (k == key).then(|| v.to_string())
    })
}

fn read_lines(path: &Path) -> Result<Vec<String>, EnvFileError> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(contents.lines().map(str::to_string).collect()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

fn write_atomic(path: &Path, lines: &[String]) -> Result<(), EnvFileError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    for line in lines {
        writeln!(tmp, "{line}")?;
    }
    tmp.persist(path).map_err(|e| EnvFileError::Io(e.to_string()))?;
    Ok(())
}
