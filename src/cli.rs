//! Command-line surface: `clap`-derive parser over the lifecycle coordinator.

use clap::builder::styling::{AnsiColor, Color, Styles};
use clap::{Parser, Subcommand};

/// Help/usage/error colors for `--help` and parse-error output.
fn help_styles() -> Styles {
    Styles::styled()
        .header(anstyle::Style::new().bold().fg_color(Some(Color::Ansi(AnsiColor::Green))))
        .usage(anstyle::Style::new().bold().fg_color(Some(Color::Ansi(AnsiColor::Green))))
        .literal(anstyle::Style::new().bold().fg_color(Some(Color::Ansi(AnsiColor::Cyan))))
        .placeholder(anstyle::Style::new().fg_color(Some(Color::Ansi(AnsiColor::Cyan))))
        .error(anstyle::Style::new().bold().fg_color(Some(Color::Ansi(AnsiColor::Red))))
        .valid(anstyle::Style::new().bold().fg_color(Some(Color::Ansi(AnsiColor::Green))))
        .invalid(anstyle::Style::new().bold().fg_color(Some(Color::Ansi(AnsiColor::Yellow))))
}

#[derive(Parser)]
#[command(
    name = "wsc",
    version,
    about = "Create and tear down per-issue/PR workspaces",
    long_about = None,
    styles = help_styles(),
)]
pub struct Cli {
    /// Increase logging verbosity (-v debug, -vv trace).
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Set a config value for this invocation only (`key.path=value`, repeatable).
    #[arg(long = "set", global = true, value_parser = parse_key_val)]
    pub set: Vec<(String, String)>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create or reuse the workspace for an issue, PR, or branch.
    Start(StartArgs),
    /// Rebase, merge, and clean up a finished workspace.
    Finish(FinishArgs),
    /// Tear down a workspace without merging it.
    Cleanup(CleanupArgs),
    /// List known workspaces.
    List(ListArgs),
    /// Alias for `start` that launches every configured tool.
    Ignite(TargetArgs),
    /// Alias for `start` that only opens the IDE.
    Open(TargetArgs),
    /// Create a tracker issue, then start a workspace for it.
    AddIssue(AddIssueArgs),
    /// Seed the AI agent's context with a freeform enhancement request.
    Enhance(AgentMessageArgs),
    /// Seed the AI agent's context with freeform feedback.
    Feedback(AgentMessageArgs),
    /// Write a starter `.wsc/settings.json`.
    Init,
    /// Print the installed version.
    Update,
}

#[derive(Parser)]
pub struct TargetArgs {
    /// Issue number, `pr/<N>`, branch name, or omitted to auto-detect.
    pub identifier: Option<String>,
    /// Treat `identifier` as a pull request number.
    #[arg(long)]
    pub pr: Option<u64>,
}

#[derive(Parser)]
pub struct StartArgs {
    #[command(flatten)]
    pub target: TargetArgs,
    /// Reuse an existing branch/worktree even if it looks stale.
    #[arg(short, long)]
    pub force: bool,
    /// Print what would happen without creating anything.
    #[arg(long)]
    pub dry_run: bool,
    /// Only launch the IDE.
    #[arg(long)]
    pub code_only: bool,
    /// Only launch a terminal.
    #[arg(long)]
    pub terminal_only: bool,
    /// Skip launching the AI agent even if the workflow enables it.
    #[arg(long)]
    pub skip_agent: bool,
}

#[derive(Parser)]
pub struct FinishArgs {
    #[command(flatten)]
    pub target: TargetArgs,
    /// Finish even if validations fail or the issue is closed.
    #[arg(short, long)]
    pub force: bool,
    /// Print what would happen without changing anything.
    #[arg(long)]
    pub dry_run: bool,
    /// Skip pre-commit hooks when synthesizing the final commit.
    #[arg(long)]
    pub no_verify: bool,
}

#[derive(Parser)]
pub struct CleanupArgs {
    #[command(flatten)]
    pub target: TargetArgs,
    /// Delete unmerged branches too.
    #[arg(short, long)]
    pub force: bool,
    /// Print what would happen without changing anything.
    #[arg(long)]
    pub dry_run: bool,
    /// Also delete the local branch once the worktree is gone.
    #[arg(long)]
    pub delete_branch: bool,
    /// Keep the provisioned database branch.
    #[arg(long)]
    pub keep_database: bool,
    /// Clean up every known workspace instead of a single one.
    #[arg(long)]
    pub all: bool,
    /// List cleanup candidates without removing anything.
    #[arg(long)]
    pub list: bool,
    /// Clean up the workspace for this issue/PR number.
    #[arg(long)]
    pub issue: Option<u64>,
}

#[derive(Parser)]
pub struct ListArgs {
    /// Render as `json` instead of a table.
    #[arg(long)]
    pub format: Option<String>,
}

#[derive(Parser)]
pub struct AddIssueArgs {
    #[arg(long)]
    pub title: String,
    #[arg(long, default_value = "")]
    pub body: String,
}

#[derive(Parser)]
pub struct AgentMessageArgs {
    #[command(flatten)]
    pub target: TargetArgs,
    pub message: String,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{s}'"))?;
    Ok((key.to_string(), value.to_string()))
}

/// Fold `--set key.path=value` pairs into a nested `serde_json::Value`
/// overlay, matching the dotted-path convention used by `settings.json`.
pub fn overrides_to_json(pairs: &[(String, String)]) -> serde_json::Value {
    let mut root = serde_json::Value::Object(Default::default());
    for (key, value) in pairs {
        set_dotted(&mut root, key, parse_scalar(value));
    }
    root
}

fn parse_scalar(value: &str) -> serde_json::Value {
    if let Ok(b) = value.parse::<bool>() {
        return serde_json::Value::Bool(b);
    }
    if let Ok(n) = value.parse::<i64>() {
        return serde_json::Value::Number(n.into());
    }
    serde_json::Value::String(value.to_string())
}

fn set_dotted(root: &mut serde_json::Value, path: &str, value: serde_json::Value) {
    let mut cursor = root;
    let parts: Vec<&str> = path.split('.').collect();
    for segment in &parts[..parts.len().saturating_sub(1)] {
        let map = cursor
            .as_object_mut()
            .expect("set_dotted only walks objects it created");
        cursor = map
            .entry(segment.to_string())
            .or_insert_with(|| serde_json::Value::Object(Default::default()));
    }
    if let Some(last) = parts.last() {
        cursor
            .as_object_mut()
            .expect("set_dotted only walks objects it created")
            .insert(last.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_key_val_splits_on_first_equals() {
        let (k, v) = parse_key_val("mainBranch=trunk").unwrap();
        assert_eq!(k, "mainBranch");
        assert_eq!(v, "trunk");
    }

    #[test]
    fn parse_key_val_rejects_missing_equals() {
        assert!(parse_key_val("no-equals-here").is_err());
    }

    #[test]
    fn overrides_to_json_nests_dotted_paths() {
        let value = overrides_to_json(&[("capabilities.web.basePort".to_string(), "4000".to_string())]);
        assert_eq!(value["capabilities"]["web"]["basePort"], 4000);
    }

    #[test]
    fn overrides_to_json_parses_booleans_and_numbers() {
        let value = overrides_to_json(&[
            ("mainBranch".to_string(), "trunk".to_string()),
            ("workflows.issue.startTerminal".to_string(), "true".to_string()),
        ]);
        assert_eq!(value["mainBranch"], "trunk");
        assert_eq!(value["workflows"]["issue"]["startTerminal"], true);
    }
}
