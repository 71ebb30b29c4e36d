//! String and lexical normalization applied before any filesystem lookup.

use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

use regex_lite::Regex;

/// `/C:/...`, `/C:\...` or a bare `/C:`.
fn drive_prefix() -> Option<&'static Regex> {
    static DRIVE: OnceLock<Option<Regex>> = OnceLock::new();
    DRIVE
        .get_or_init(|| Regex::new(r"^/[A-Za-z]:([/\\]|$)").ok())
        .as_ref()
}

/// Percent-decodes `raw` and strips a separator in front of a drive letter.
///
/// `+` is left alone. Undecodable input is returned unchanged.
pub fn pre_normalize(raw: &str) -> String {
    let decoded = urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw));
    match drive_prefix() {
        Some(re) if re.is_match(&decoded) => decoded[1..].to_string(),
        _ => decoded.into_owned(),
    }
}

/// Collapses `.` and `..` without touching the filesystem.
///
/// `..` never climbs above the root of an absolute path.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}
