//! Exclusion cache configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Name of the cache file inside the configured directory.
pub const CACHE_FILE_NAME: &str = "LocalItemExclusions.config";

/// Where the exclusion cache lives, and whether it touches disk at all.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionCacheConfig {
    pub directory: PathBuf,
    /// A disabled cache keeps everything in memory.
    pub enabled: bool,
}

impl ExclusionCacheConfig {
    /// An enabled cache stored in `directory`.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            enabled: true,
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Full path of the cache file.
    pub fn file_path(&self) -> PathBuf {
        self.directory.join(CACHE_FILE_NAME)
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl Default for ExclusionCacheConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::new(),
            enabled: false,
        }
    }
}
