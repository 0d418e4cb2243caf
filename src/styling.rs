//! Terminal styling helpers: emojis, color-print wrappers, message formatting.
//!
//! Semantic mapping for `cformat!` tags:
//! - Errors: `<red>...</>`
//! - Warnings: `<yellow>...</>`
//! - Hints: `<dim>...</>`
//! - Success: `<green>...</>`
//! - Progress: `<cyan>...</>`

use color_print::cformat;
use std::sync::atomic::{AtomicU8, Ordering};

/// Auto-detecting println/eprintln that respect `NO_COLOR`/`CLICOLOR_FORCE`
/// and strip ANSI when the destination isn't a TTY.
pub use anstream::{eprintln, println};

pub const SUCCESS_EMOJI: &str = "\u{2705}";
pub const ERROR_EMOJI: &str = "\u{274c}";
pub const WARNING_EMOJI: &str = "\u{1f7e1}";
pub const HINT_EMOJI: &str = "\u{1f4a1}";
pub const INFO_EMOJI: &str = "\u{26aa}";
pub const PROMPT_EMOJI: &str = "\u{2753}";

static VERBOSITY: AtomicU8 = AtomicU8::new(0);

/// Set the global verbosity level (0 = quiet, 1 = -v, 2 = -vv).
pub fn set_verbosity(level: u8) {
    VERBOSITY.store(level, Ordering::Relaxed);
}

pub fn verbosity() -> u8 {
    VERBOSITY.load(Ordering::Relaxed)
}

pub fn error_message(content: impl AsRef<str>) -> String {
    cformat!("{ERROR_EMOJI} <red>{}</>", content.as_ref())
}

pub fn warning_message(content: impl AsRef<str>) -> String {
    cformat!("{WARNING_EMOJI} <yellow>{}</>", content.as_ref())
}

pub fn hint_message(content: impl AsRef<str>) -> String {
    cformat!("{HINT_EMOJI} <dim>{}</>", content.as_ref())
}

pub fn success_message(content: impl AsRef<str>) -> String {
    cformat!("{SUCCESS_EMOJI} <green>{}</>", content.as_ref())
}

pub fn info_message(content: impl AsRef<str>) -> String {
    cformat!("{INFO_EMOJI} {}", content.as_ref())
}

/// Indent every line of `content` with a left gutter bar, for quoting
/// subprocess output inside an error message.
pub fn format_with_gutter(content: &str, prefix: &str, limit: Option<usize>) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let truncated = match limit {
        Some(n) if lines.len() > n => &lines[lines.len() - n..],
        _ => &lines[..],
    };
    truncated
        .iter()
        .map(|line| format!("{prefix}  | {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub mod output {
    //! Thin println/eprintln wrappers applying the message formatters.
    //! Routes through `anstream`'s re-exports so ANSI is stripped when the
    //! destination isn't a TTY, rather than std's raw `println!`/`eprintln!`.
    use super::*;

    pub fn success(msg: impl AsRef<str>) {
        println!("{}", success_message(msg));
    }

    pub fn error(msg: impl AsRef<str>) {
        eprintln!("{}", error_message(msg));
    }

    pub fn warning(msg: impl AsRef<str>) {
        eprintln!("{}", warning_message(msg));
    }

    pub fn hint(msg: impl AsRef<str>) {
        eprintln!("{}", hint_message(msg));
    }

    pub fn info(msg: impl AsRef<str>) {
        println!("{}", info_message(msg));
    }
}
