//! Dependency install: a black-box external collaborator (§1 "Package-manager
//! detection for dependency install (consumed as a black-box operation)").
//! Used for §4.2 step 4 (provisioning, fatal on real failure) and step e
//! (post-merge, same contract, run in the mainline worktree).

use crate::shell_exec::Cmd;
use std::path::Path;

fn detect_install_command(path: &Path) -> Option<(&'static str, &'static [&'static str])> {
    if !path.join("package.json").exists() {
        return None;
    }
    if path.join("pnpm-lock.yaml").exists() {
        Some(("pnpm", &["install"]))
    } else if path.join("yarn.lock").exists() {
        Some(("yarn", &["install"]))
    } else {
        Some(("npm", &["install"]))
    }
}

/// Runs the detected package manager's install command inside `path`.
/// `Ok(false)` means no manifest was found — not applicable, not a failure.
/// `Err` carries the offending command's stderr (or spawn error).
pub fn install_dependencies(path: &Path) -> Result<bool, String> {
    let Some((program, args)) = detect_install_command(path) else {
        return Ok(false);
    };

    match Cmd::new(program).args(args).current_dir(path).context("install").run() {
        Ok(out) if out.status.success() => Ok(true),
        Ok(out) => Err(String::from_utf8_lossy(&out.stderr).trim_end().to_string()),
        Err(e) => Err(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn no_manifest_is_not_applicable() {
        let dir = TempDir::new().unwrap();
        assert_eq!(install_dependencies(dir.path()), Ok(false));
    }

    #[test]
    fn detects_pnpm_over_npm_when_lockfile_present() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("package.json"), "{}").unwrap();
        std::fs::write(dir.path().join("pnpm-lock.yaml"), "").unwrap();
        assert_eq!(detect_install_command(dir.path()).map(|(p, _)| p), Some("pnpm"));
    }

    #[test]
    fn detects_yarn_when_yarn_lock_present() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("package.json"), "{}").unwrap();
        std::fs::write(dir.path().join("yarn.lock"), "").unwrap();
        assert_eq!(detect_install_command(dir.path()).map(|(p, _)| p), Some("yarn"));
    }

    #[test]
    fn falls_back_to_npm() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("package.json"), "{}").unwrap();
        assert_eq!(detect_install_command(dir.path()).map(|(p, _)| p), Some("npm"));
    }
}
