use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for reading and positioning table files.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    /// Attempts made for each slot rename before giving up.
    pub rename_retries: u32,
    /// Pause between rename attempts.
    pub rename_retry_delay: Duration,
    /// Buffer size for table file reads and writes.
    pub buffer_size: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            rename_retries: 5,
            rename_retry_delay: Duration::from_millis(100),
            buffer_size: 64 * 1024, // 64 KiB
        }
    }
}

impl TableConfig {
    pub fn with_rename_retries(mut self, retries: u32) -> Self {
        self.rename_retries = retries.max(1);
        self
    }

    pub fn with_rename_retry_delay(mut self, delay: Duration) -> Self {
        self.rename_retry_delay = delay;
        self
    }

    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }
}
