//! Logical path helpers.
//!
//! Destination paths are logical: they always use `/` as separator, no
//! matter which platform or adapter produced the source path. Adapters that
//! write to a local filesystem convert them when storing.

use std::sync::LazyLock;

use regex::Regex;

static DRIVE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]+:[\\/]").expect("valid drive prefix regex"));

static SEPARATOR_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\\/]+").expect("valid separator regex"));

static INVALID_ID_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_-]").expect("valid id regex"));

/// The separator used by every logical path.
pub const SEPARATOR: char = '/';

/// Combine two paths into one logical path.
///
/// A drive prefix on the second path (`c:\`) is dropped, so a rooted path
/// from any platform nests under `first`. Runs of `/` and `\` collapse into
/// a single `/`.
pub fn combine(first: &str, second: &str) -> String {
    let second = DRIVE_PREFIX.replace(second, "");
    let joined = format!("{first}{SEPARATOR}{second}");
    SEPARATOR_RUNS.replace_all(&joined, "/").into_owned()
}

/// Strip `root` from the front of `path`.
///
/// Leading separators on either side are ignored, and the root only matches
/// on a path component boundary (`/data` does not prefix `/database`). When
/// the root does not prefix the path, the path is returned unchanged.
pub fn strip_root<'a>(path: &'a str, root: &str) -> &'a str {
    let is_separator = |c: char| c == '/' || c == '\\';

    let trimmed_root = root.trim_start_matches(is_separator);
    let trimmed_path = path.trim_start_matches(is_separator);

    if trimmed_root.is_empty() {
        return trimmed_path;
    }

    match trimmed_path.strip_prefix(trimmed_root) {
        Some(rest) if rest.is_empty() || trimmed_root.ends_with(is_separator) => rest,
        Some(rest) if rest.starts_with(is_separator) => rest,
        _ => path,
    }
}

/// Replace every character outside `[A-Za-z0-9_-]` with `_`.
pub fn sanitize_id(id: &str) -> String {
    INVALID_ID_CHARS.replace_all(id, "_").into_owned()
}
