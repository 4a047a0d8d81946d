//! Path ordering and hierarchy helpers.
//!
//! Server paths use `/` and are rooted at `$/`. Local paths use the
//! platform separator. Both kinds are compared case-insensitively, one
//! segment at a time, so that a folder always sorts immediately before its
//! descendants and every subtree forms one contiguous run in a sorted
//! collection. Range scans over `BTreeMap<PathKey, _>` rely on this.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{TypeError, TypeResult};

/// Separator used by server paths.
pub const SERVER_SEPARATOR: char = '/';

/// The root of the server namespace.
pub const SERVER_ROOT: &str = "$/";

/// Separator used by local paths on this platform.
pub const LOCAL_SEPARATOR: char = std::path::MAIN_SEPARATOR;

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

fn segments(path: &str, separator: char) -> std::str::Split<'_, char> {
    path.trim_end_matches(separator).split(separator)
}

fn compare_segment(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

/// Compare two paths top-down: parents before children, case-insensitive
/// lexicographic order between siblings.
pub fn compare_top_down(a: &str, b: &str, separator: char) -> Ordering {
    let mut left = segments(a, separator);
    let mut right = segments(b, separator);
    loop {
        match (left.next(), right.next()) {
            (Some(l), Some(r)) => match compare_segment(l, r) {
                Ordering::Equal => continue,
                other => return other,
            },
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (None, None) => return Ordering::Equal,
        }
    }
}

/// Case-insensitive path equality, ignoring a trailing separator.
pub fn equals(a: &str, b: &str, separator: char) -> bool {
    compare_top_down(a, b, separator) == Ordering::Equal
}

/// Number of levels `item` sits below `parent`, or `None` if `item` is not
/// in `parent`'s subtree. An item is at depth 0 below itself.
pub fn depth_below(parent: &str, item: &str, separator: char) -> Option<usize> {
    let mut item_segments = segments(item, separator);
    for parent_segment in segments(parent, separator) {
        match item_segments.next() {
            Some(s) if compare_segment(s, parent_segment) == Ordering::Equal => {}
            _ => return None,
        }
    }
    Some(item_segments.count())
}

/// Returns `true` if `item` equals `parent` or lies beneath it.
pub fn is_child(parent: &str, item: &str, separator: char) -> bool {
    depth_below(parent, item, separator).is_some()
}

/// The last segment of a path.
pub fn file_name(path: &str, separator: char) -> &str {
    let trimmed = path.trim_end_matches(separator);
    match trimmed.rfind(separator) {
        Some(idx) => &trimmed[idx + separator.len_utf8()..],
        None => trimmed,
    }
}

/// The parent of a path, or `None` for a root.
///
/// When the parent is a root its trailing separator is kept, so the parent
/// of `$/Project` is `$/` and the parent of `/work` is `/`.
pub fn parent(path: &str, separator: char) -> Option<&str> {
    let trimmed = path.trim_end_matches(separator);
    let idx = trimmed.rfind(separator)?;
    let head = &trimmed[..idx];
    if head.contains(separator) {
        Some(head)
    } else {
        Some(&trimmed[..idx + separator.len_utf8()])
    }
}

/// Validate that a path is a rooted server path (`$/...`).
pub fn check_server_path(path: &str) -> TypeResult<()> {
    let rooted = path
        .get(..2)
        .is_some_and(|head| head.eq_ignore_ascii_case(SERVER_ROOT));
    if rooted || path == "$" {
        Ok(())
    } else {
        Err(TypeError::InvalidPath(format!(
            "server paths must start with {SERVER_ROOT}: {path:?}"
        )))
    }
}

// ---------------------------------------------------------------------------
// PathKey
// ---------------------------------------------------------------------------

/// A path used as an ordered map key.
///
/// Ordering and equality follow [`compare_top_down`] with the key's own
/// separator. Keys of one map must all share a separator.
#[derive(Clone, Serialize, Deserialize)]
pub struct PathKey {
    path: String,
    separator: char,
}

impl PathKey {
    /// Create a key with an explicit separator.
    pub fn new(path: impl Into<String>, separator: char) -> Self {
        Self {
            path: path.into(),
            separator,
        }
    }

    /// Create a key for a server path.
    pub fn server(path: impl Into<String>) -> Self {
        Self::new(path, SERVER_SEPARATOR)
    }

    /// Create a key for a local path.
    pub fn local(path: impl Into<String>) -> Self {
        Self::new(path, LOCAL_SEPARATOR)
    }

    /// The path as originally spelled.
    pub fn as_str(&self) -> &str {
        &self.path
    }

    /// The separator this key orders by.
    pub fn separator(&self) -> char {
        self.separator
    }

    /// Returns `true` if `other` equals this path or lies beneath it.
    pub fn contains(&self, other: &str) -> bool {
        is_child(&self.path, other, self.separator)
    }

    /// Depth of `other` below this path.
    pub fn depth_of(&self, other: &str) -> Option<usize> {
        depth_below(&self.path, other, self.separator)
    }

    /// Consume the key, returning the path string.
    pub fn into_string(self) -> String {
        self.path
    }
}

impl PartialEq for PathKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PathKey {}

impl PartialOrd for PathKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PathKey {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_top_down(&self.path, &other.path, self.separator)
    }
}

impl fmt::Debug for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PathKey({:?})", self.path)
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const S: char = SERVER_SEPARATOR;

    #[test]
    fn parent_sorts_before_children() {
        assert_eq!(compare_top_down("$/A", "$/A/b", S), Ordering::Less);
        assert_eq!(compare_top_down("$/", "$/A", S), Ordering::Less);
        assert_eq!(compare_top_down("$/A/b", "$/A", S), Ordering::Greater);
    }

    #[test]
    fn subtree_stays_contiguous() {
        // Plain string order would put "b-x" between "b" and "b/c".
        assert_eq!(compare_top_down("$/A/b/c", "$/A/b-x", S), Ordering::Less);
        assert_eq!(compare_top_down("$/A/b", "$/A/b-x", S), Ordering::Less);

        let mut paths = vec!["$/A/b-x", "$/A/b/c", "$/A", "$/A/b", "$/A/a"];
        paths.sort_by(|a, b| compare_top_down(a, b, S));
        assert_eq!(paths, vec!["$/A", "$/A/a", "$/A/b", "$/A/b/c", "$/A/b-x"]);
    }

    #[test]
    fn comparison_ignores_case_and_trailing_separator() {
        assert!(equals("$/Proj/File.txt", "$/proj/FILE.TXT", S));
        assert!(equals("$/Proj/", "$/Proj", S));
        assert!(!equals("$/Proj", "$/Proj2", S));
    }

    #[test]
    fn depth_below_counts_levels() {
        assert_eq!(depth_below("$/A", "$/A", S), Some(0));
        assert_eq!(depth_below("$/A", "$/a/B", S), Some(1));
        assert_eq!(depth_below("$/", "$/A/B/C", S), Some(3));
        assert_eq!(depth_below("$/A", "$/AB", S), None);
        assert_eq!(depth_below("$/A/B", "$/A", S), None);
    }

    #[test]
    fn local_root_is_parent_of_everything() {
        assert!(is_child("/", "/work/a.txt", '/'));
        assert!(is_child("/work", "/work/a.txt", '/'));
        assert!(!is_child("/work", "/workspace/a.txt", '/'));
    }

    #[test]
    fn file_name_and_parent() {
        assert_eq!(file_name("$/A/b.txt", S), "b.txt");
        assert_eq!(file_name("$/A/sub/", S), "sub");
        assert_eq!(parent("$/A/b.txt", S), Some("$/A"));
        assert_eq!(parent("$/A", S), Some("$/"));
        assert_eq!(parent("/work", '/'), Some("/"));
        assert_eq!(parent("$", S), None);
    }

    #[test]
    fn check_server_path_requires_root() {
        assert!(check_server_path("$/A").is_ok());
        assert!(check_server_path("$/").is_ok());
        assert!(matches!(
            check_server_path("/local/path"),
            Err(TypeError::InvalidPath(_))
        ));
    }

    #[test]
    fn path_keys_compare_case_insensitively() {
        assert_eq!(PathKey::server("$/A/B"), PathKey::server("$/a/b"));
        assert!(PathKey::server("$/A") < PathKey::server("$/A/z"));
        assert_eq!(PathKey::server("$/Mixed").as_str(), "$/Mixed");
    }

    fn segment() -> impl Strategy<Value = String> {
        "[a-cA-C\\-]{1,3}"
    }

    proptest! {
        #[test]
        fn descendants_follow_their_ancestor(
            base in proptest::collection::vec(segment(), 1..4),
            tail in proptest::collection::vec(segment(), 1..3),
            other in proptest::collection::vec(segment(), 1..5),
        ) {
            let ancestor = format!("$/{}", base.join("/"));
            let descendant = format!("{ancestor}/{}", tail.join("/"));
            let unrelated = format!("$/{}", other.join("/"));

            prop_assert_eq!(compare_top_down(&ancestor, &descendant, S), Ordering::Less);
            // Anything outside the subtree sorts entirely before or after it.
            if !is_child(&ancestor, &unrelated, S) {
                prop_assert_eq!(
                    compare_top_down(&unrelated, &ancestor, S),
                    compare_top_down(&unrelated, &descendant, S)
                );
            }
        }
    }
}
