//! Capability Detector (C7): classify a workspace as {web, cli, neither,
//! both} by reading its package manifest.

use indexmap::IndexMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub web: bool,
    pub cli: bool,
    pub bin_entries: IndexMap<String, String>,
}

impl Capabilities {
    /// §4.7: an empty capability set is represented as "no capabilities"
    /// and, by C13 convention, omitted from the Workspace record.
    pub fn is_empty(&self) -> bool {
        !self.web && !self.cli
    }
}

const WEB_DEV_SCRIPTS: &[&str] = &["dev", "start"];

/// Reads `<workspace>/package.json`. Missing or unparsable manifests yield
/// an empty capability set rather than an error — capability detection is
/// advisory, not load-bearing for lifecycle correctness.
pub fn detect(workspace_path: &Path) -> Capabilities {
    let Ok(contents) = std::fs::read_to_string(workspace_path.join("package.json")) else {
        return Capabilities::default();
    };
    let Ok(manifest) = serde_json::from_str::<serde_json::Value>(&contents) else {
        return Capabilities::default();
    };

    let web = manifest
        .get("scripts")
        .and_then(|s| s.as_object())
        .is_some_and(|scripts| WEB_DEV_SCRIPTS.iter().any(|k| scripts.contains_key(*k)));

    let mut bin_entries = IndexMap::new();
    if let Some(bin) = manifest.get("bin") {
        match bin {
            serde_json::Value::String(path) => {
                if let Some(name) = manifest.get("name").and_then(|n| n.as_str()) {
                    bin_entries.insert(name.to_string(), path.clone());
                }
            }
            serde_json::Value::Object(map) => {
                for (name, path) in map {
                    if let Some(path) = path.as_str() {
                        bin_entries.insert(name.clone(), path.to_string());
                    }
                }
            }
            _ => {}
        }
    }

    Capabilities {
        web,
        cli: !bin_entries.is_empty(),
        bin_entries,
    }
}

/// §4.2 step 5 / §4.12 step 6 "implementation-defined bin directory":
/// rooted at the repository rather than the worktree, so symlinks survive
/// worktree removal long enough for cleanup to find them.
pub fn bin_dir(repo_root: &Path) -> PathBuf {
    repo_root.join(crate::config::SETTINGS_DIR).join("bin")
}

/// `<binName>-<suffix>` naming: an issue/PR number when the target carries
/// one, otherwise the slash-sanitized branch name (DESIGN.md Open Question).
pub fn symlink_suffix(number: Option<u64>, branch: &str) -> String {
    number
        .map(|n| n.to_string())
        .unwrap_or_else(|| branch.replace('/', "-"))
}

/// Best-effort: create `<binName>-<suffix>` symlinks under `dir`, each
/// pointing at its `bin_entries` target inside `workspace_path`. Failures
/// are logged and skipped rather than propagated (§4.2 step 5).
pub fn create_symlinks(dir: &Path, workspace_path: &Path, bin_entries: &IndexMap<String, String>, suffix: &str) -> Vec<String> {
    if bin_entries.is_empty() {
        return Vec::new();
    }
    if let Err(e) = std::fs::create_dir_all(dir) {
        log::warn!("cli symlink directory {} unavailable: {e}", dir.display());
        return Vec::new();
    }

    let mut created = Vec::new();
    for (name, relative_path) in bin_entries {
        let basename = format!("{name}-{suffix}");
        let dest = dir.join(&basename);
        let target = workspace_path.join(relative_path);
        let _ = std::fs::remove_file(&dest);
        match create_symlink(&target, &dest) {
            Ok(()) => created.push(basename),
            Err(e) => log::warn!("failed to create cli symlink {}: {e}", dest.display()),
        }
    }
    created
}

/// Best-effort removal counterpart to [`create_symlinks`] (§4.12 step 6). A
/// symlink that is already gone is not an error.
pub fn remove_symlinks(dir: &Path, bin_entries: &IndexMap<String, String>, suffix: &str) -> usize {
    bin_entries
        .keys()
        .filter(|name| {
            let dest = dir.join(format!("{name}-{suffix}"));
            std::fs::symlink_metadata(&dest).is_ok() && std::fs::remove_file(&dest).is_ok()
        })
        .count()
}

#[cfg(unix)]
fn create_symlink(target: &Path, dest: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, dest)
}

#[cfg(windows)]
fn create_symlink(target: &Path, dest: &Path) -> std::io::Result<()> {
    let is_dir = target.metadata().map(|m| m.is_dir()).unwrap_or(false);
    if is_dir {
        std::os::windows::fs::symlink_dir(target, dest)
    } else {
        std::os::windows::fs::symlink_file(target, dest)
    }
}

#[cfg(not(any(unix, windows)))]
fn create_symlink(_target: &Path, _dest: &Path) -> std::io::Result<()> {
    Err(std::io::Error::new(std::io::ErrorKind::Unsupported, "symlinks unsupported on this platform"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn detects_web_capability_from_dev_script() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("package.json"), r#"{"scripts": {"dev": "vite"}}"#).unwrap();
        let caps = detect(dir.path());
        assert!(caps.web);
        assert!(!caps.cli);
    }

    #[test]
    fn detects_cli_capability_from_bin_map() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("package.json"),
            r#"{"bin": {"mytool": "./bin/mytool.js"}}"#,
        )
        .unwrap();
        let caps = detect(dir.path());
        assert!(caps.cli);
        assert_eq!(caps.bin_entries.get("mytool"), Some(&"./bin/mytool.js".to_string()));
    }

    #[test]
    fn missing_manifest_yields_empty_capabilities() {
        let dir = TempDir::new().unwrap();
        let caps = detect(dir.path());
        assert!(caps.is_empty());
    }

    #[test]
    fn symlink_suffix_prefers_number_over_branch() {
        assert_eq!(symlink_suffix(Some(42), "feat/issue-42"), "42");
        assert_eq!(symlink_suffix(None, "feat/my-branch"), "feat-my-branch");
    }

    #[test]
    fn create_symlinks_then_remove_round_trips() {
        let workspace = TempDir::new().unwrap();
        std::fs::write(workspace.path().join("mytool.js"), "#!/usr/bin/env node").unwrap();
        let mut bin_entries = IndexMap::new();
        bin_entries.insert("mytool".to_string(), "mytool.js".to_string());

        let dir = TempDir::new().unwrap();
        let created = create_symlinks(dir.path(), workspace.path(), &bin_entries, "42");
        assert_eq!(created, vec!["mytool-42".to_string()]);
        assert!(dir.path().join("mytool-42").symlink_metadata().is_ok());

        let removed = remove_symlinks(dir.path(), &bin_entries, "42");
        assert_eq!(removed, 1);
        assert!(dir.path().join("mytool-42").symlink_metadata().is_err());
    }

    #[test]
    fn create_symlinks_is_a_no_op_without_cli_capability() {
        let workspace = TempDir::new().unwrap();
        let dir = TempDir::new().unwrap();
        let created = create_symlinks(dir.path(), workspace.path(), &IndexMap::new(), "42");
        assert!(created.is_empty());
        assert!(!dir.path().exists());
    }
}
