//! Cleanup of raw model output into plain executable source. Never fails;
//! fence-less input passes through trimmed.

use std::sync::OnceLock;

use regex::Regex;

fn leading_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\A```[a-z0-9_+-]*[ \t]*\r?\n?").expect("leading fence regex"))
}

fn trailing_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\r?\n?```\s*\z").expect("trailing fence regex"))
}

/// Strips one leading code-fence marker (with or without a language tag) and
/// one trailing fence marker, case-insensitively, and trims surrounding
/// whitespace.
pub fn strip_code_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_leading = leading_fence().replace(trimmed, "");
    let without_trailing = trailing_fence().replace(&without_leading, "");
    without_trailing.trim().to_string()
}
