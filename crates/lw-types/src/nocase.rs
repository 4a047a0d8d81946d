//! Case-insensitive string keys.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// A string that compares, orders and hashes without regard to case.
///
/// The original spelling is preserved for display and serialization.
#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoCase(String);

impl NoCase {
    /// Wrap a string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The string as originally spelled.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the key, returning the original string.
    pub fn into_string(self) -> String {
        self.0
    }

    fn folded(&self) -> impl Iterator<Item = char> + '_ {
        self.0.chars().flat_map(char::to_lowercase)
    }
}

impl PartialEq for NoCase {
    fn eq(&self, other: &Self) -> bool {
        self.folded().eq(other.folded())
    }
}

impl Eq for NoCase {}

impl PartialOrd for NoCase {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NoCase {
    fn cmp(&self, other: &Self) -> Ordering {
        self.folded().cmp(other.folded())
    }
}

impl Hash for NoCase {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for c in self.folded() {
            c.hash(state);
        }
    }
}

impl From<&str> for NoCase {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for NoCase {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Debug for NoCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NoCase({:?})", self.0)
    }
}

impl fmt::Display for NoCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeSet, HashSet};

    #[test]
    fn equal_ignoring_case() {
        assert_eq!(NoCase::from("*.DLL"), NoCase::from("*.dll"));
        assert_ne!(NoCase::from("*.dll"), NoCase::from("*.dl"));
    }

    #[test]
    fn sets_collapse_case_variants() {
        let hashed: HashSet<NoCase> = ["Bin", "bin", "BIN"].into_iter().map(NoCase::from).collect();
        assert_eq!(hashed.len(), 1);

        let ordered: BTreeSet<NoCase> = ["obj", "Bin", "bin"].into_iter().map(NoCase::from).collect();
        let spelled: Vec<&str> = ordered.iter().map(NoCase::as_str).collect();
        assert_eq!(spelled, vec!["Bin", "obj"]);
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&NoCase::from("TestResults")).unwrap();
        assert_eq!(json, "\"TestResults\"");
    }
}
