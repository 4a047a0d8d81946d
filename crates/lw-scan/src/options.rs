//! Scan configuration.

use serde::{Deserialize, Serialize};

/// Highest numbered baseline folder variant (`$tf1` .. `$tf15`).
pub const MAX_BASELINE_FOLDER_SUFFIX: u32 = 15;

/// The baseline folder names a workspace may create: `$tf` and `.tf`,
/// each with numbered variants.
pub fn default_baseline_folder_names() -> Vec<String> {
    ["$tf", ".tf"]
        .into_iter()
        .flat_map(|base| {
            std::iter::once(base.to_string())
                .chain((1..=MAX_BASELINE_FOLDER_SUFFIX).map(move |n| format!("{base}{n}")))
        })
        .collect()
}

/// What a [`Scanner`](crate::Scanner) reports and what it skips.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    /// Report hidden and system entries too.
    pub include_hidden: bool,
    /// Local paths skipped together with everything below them. Matched
    /// exactly, ignoring case.
    pub excluded_paths: Vec<String>,
    /// File name globs skipped together with everything below them.
    pub exclusion_patterns: Vec<String>,
    /// Reserved folder names that are never reported.
    pub baseline_folder_names: Vec<String>,
    /// Honor `.tfignore` files in scanned directories.
    pub use_ignore_files: bool,
    /// Topmost directory whose `.tfignore` applies to a scan rooted below
    /// it, usually the workspace root. Without it only ignore files at or
    /// below the scan root are read.
    pub ignore_files_root: Option<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            include_hidden: false,
            excluded_paths: Vec::new(),
            exclusion_patterns: Vec::new(),
            baseline_folder_names: default_baseline_folder_names(),
            use_ignore_files: true,
            ignore_files_root: None,
        }
    }
}

impl ScanOptions {
    pub fn with_include_hidden(mut self, include_hidden: bool) -> Self {
        self.include_hidden = include_hidden;
        self
    }

    pub fn with_excluded_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_exclusion_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclusion_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_baseline_folder_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.baseline_folder_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_ignore_files(mut self, use_ignore_files: bool) -> Self {
        self.use_ignore_files = use_ignore_files;
        self
    }

    pub fn with_ignore_files_root(mut self, root: impl Into<String>) -> Self {
        self.ignore_files_root = Some(root.into());
        self
    }

    /// Returns `true` if `name` is a reserved baseline folder name.
    pub fn is_reserved(&self, name: &str) -> bool {
        self.baseline_folder_names
            .iter()
            .any(|reserved| reserved.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_names_cover_numbered_variants() {
        let options = ScanOptions::default();
        assert_eq!(options.baseline_folder_names.len(), 32);
        assert!(options.is_reserved("$tf"));
        assert!(options.is_reserved("$TF7"));
        assert!(options.is_reserved(".tf15"));
        assert!(!options.is_reserved("$tf16"));
        assert!(!options.is_reserved("tf"));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let options: ScanOptions = serde_json::from_str(r#"{"include_hidden": true}"#).unwrap();
        assert!(options.include_hidden);
        assert!(options.is_reserved(".tf"));
        assert!(options.use_ignore_files);
        assert!(options.ignore_files_root.is_none());
    }
}
