//! Append-only JSONL audit trail of external commands run by the CLI.
//!
//! Mirrors the teacher's `.git/wt-logs/commands.jsonl` convention: one JSON
//! object per line, rotated once the file crosses [`MAX_LOG_SIZE`].

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

const MAX_LOG_SIZE: u64 = 1_048_576;
const MAX_CMD_LENGTH: usize = 2_000;

static COMMAND_LOG: OnceLock<Mutex<CommandLog>> = OnceLock::new();

struct CommandLog {
    path: PathBuf,
}

/// Initialize the global command log under `<git_common_dir>/wsc/commands.jsonl`.
/// Safe to call more than once; only the first call takes effect.
pub fn init(git_common_dir: &Path) -> std::io::Result<()> {
    let dir = git_common_dir.join("wsc");
    fs::create_dir_all(&dir)?;
    let path = dir.join("commands.jsonl");
    let _ = COMMAND_LOG.set(Mutex::new(CommandLog { path }));
    Ok(())
}

/// Record one external command invocation. No-op if [`init`] was never called.
pub fn log_command(label: &str, command: &str, exit_code: Option<i32>, duration: Duration) {
    let Some(log) = COMMAND_LOG.get() else {
        return;
    };
    let Ok(mut log) = log.lock() else {
        return;
    };
    let truncated = truncate_chars(command, MAX_CMD_LENGTH);
    let entry = serde_json::json!({
        "ts": chrono::Utc::now().to_rfc3339(),
        "label": label,
        "cmd": truncated,
        "exit": exit_code,
        "dur_ms": duration.as_millis() as u64,
    });
    if let Err(e) = log.append(&entry) {
        log::warn!("failed to write command log: {e}");
    }
}

impl CommandLog {
    fn append(&mut self, entry: &serde_json::Value) -> std::io::Result<()> {
        self.maybe_rotate()?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{entry}")?;
        Ok(())
    }

    fn maybe_rotate(&self) -> std::io::Result<()> {
        if let Ok(meta) = fs::metadata(&self.path)
            && meta.len() > MAX_LOG_SIZE
        {
            let rotated = self.path.with_extension("jsonl.old");
            fs::rename(&self.path, rotated)?;
        }
        Ok(())
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let truncated: String = s.chars().take(max).collect();
    format!("{truncated}...")
}

/// Ensure a file handle exists for tests that need to assert rotation.
#[cfg(test)]
fn open_for_test(path: &Path) -> File {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn truncate_chars_is_char_boundary_safe() {
        let s = "a".repeat(10);
        assert_eq!(truncate_chars(&s, 5), "aaaaa...");
        assert_eq!(truncate_chars(&s, 20), s);
    }

    #[test]
    fn init_creates_log_dir() {
        let dir = TempDir::new().unwrap();
        init(dir.path()).unwrap();
        assert!(dir.path().join("wsc").exists());
        let _ = open_for_test(&dir.path().join("wsc/commands.jsonl"));
    }
}
