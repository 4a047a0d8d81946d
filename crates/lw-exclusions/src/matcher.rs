//! Compiled exclusion patterns.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::error::{ExclusionError, ExclusionResult};

/// A set of exclusion patterns matched against single file names.
///
/// Matching is case-insensitive and `*` never crosses a separator.
#[derive(Clone, Debug)]
pub struct ExclusionMatcher {
    patterns: Vec<String>,
    set: GlobSet,
}

impl ExclusionMatcher {
    pub fn new<I, S>(patterns: I) -> ExclusionResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();
        let mut builder = GlobSetBuilder::new();
        for pattern in &patterns {
            let glob = GlobBuilder::new(pattern)
                .case_insensitive(true)
                .literal_separator(true)
                .build()
                .map_err(|source| ExclusionError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                })?;
            builder.add(glob);
        }
        let set = builder.build().map_err(|source| ExclusionError::InvalidPattern {
            pattern: patterns.join(";"),
            source,
        })?;
        Ok(Self { patterns, set })
    }

    /// An empty matcher that excludes nothing.
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
            set: GlobSet::empty(),
        }
    }

    pub fn is_excluded(&self, file_name: &str) -> bool {
        self.set.is_match(file_name)
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl Default for ExclusionMatcher {
    fn default() -> Self {
        Self::empty()
    }
}
