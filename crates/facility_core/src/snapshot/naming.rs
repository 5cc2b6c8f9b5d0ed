//! Default snapshot file names.

use once_cell::sync::Lazy;
use regex::Regex;

/// File extension of project snapshots, without the dot.
pub const SNAPSHOT_EXTENSION: &str = "fsnap";

const FALLBACK_STEM: &str = "project";
const MAX_STEM_CHARS: usize = 120;

static UNSAFE_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{N}\-_. ]+").expect("valid file name regex"));

/// Builds `<sanitized project name>.fsnap`.
///
/// Runs of characters other than letters, digits, `-`, `_`, `.` and space
/// collapse to one `_`. Surrounding spaces and dots are trimmed; an empty
/// result falls back to `project`.
pub fn default_file_name(project_name: &str) -> String {
    let replaced = UNSAFE_RUN_RE.replace_all(project_name, "_");
    let trimmed = replaced.trim_matches(|c: char| c == ' ' || c == '.');
    let stem = trimmed.chars().take(MAX_STEM_CHARS).collect::<String>();
    let stem = stem.trim_end_matches(|c: char| c == ' ' || c == '.');
    if stem.is_empty() {
        format!("{FALLBACK_STEM}.{SNAPSHOT_EXTENSION}")
    } else {
        format!("{stem}.{SNAPSHOT_EXTENSION}")
    }
}
