//! Per-directory `.tfignore` files.
//!
//! Each line of an ignore file is a file name glob that applies to the
//! directory holding the file and everything below it:
//!
//! - `#` starts a comment; blank lines are skipped
//! - `!pattern` re-includes what an outer rule excluded
//! - `/pattern` matches only entries directly in the directory
//! - `pattern/` matches only folders
//! - `dir/pattern` matches below `dir` only
//!
//! Within a file, later lines override earlier ones. Across files the
//! innermost file with an opinion decides.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use globset::{GlobBuilder, GlobMatcher};
use lw_types::path::{self, LOCAL_SEPARATOR};
use tracing::{debug, warn};

use crate::error::{ExclusionError, ExclusionResult};

/// File name of a per-directory ignore file.
pub const IGNORE_FILE_NAME: &str = ".tfignore";

const INCLUDE_PREFIX: char = '!';
const COMMENT_PREFIX: char = '#';
const BYTE_ORDER_MARK: char = '\u{feff}';

/// One rule of an ignore file.
#[derive(Clone, Debug)]
pub struct IgnoreEntry {
    /// Line as written, for diagnostics.
    line: String,
    /// Directory the rule applies below.
    base: String,
    matcher: GlobMatcher,
    excluded: bool,
    recursive: bool,
    folder_only: bool,
}

impl IgnoreEntry {
    /// Parse one line of an ignore file in `directory`.
    ///
    /// Returns `Ok(None)` for blank and comment lines.
    pub fn parse(directory: &str, line: &str) -> ExclusionResult<Option<Self>> {
        let text = line.trim_start_matches(BYTE_ORDER_MARK).trim();
        if text.is_empty() || text.starts_with(COMMENT_PREFIX) {
            return Ok(None);
        }

        let normalized: String = text
            .chars()
            .map(|c| if c == '/' || c == '\\' { LOCAL_SEPARATOR } else { c })
            .collect();
        let mut pattern = normalized.as_str();

        let mut excluded = true;
        if pattern.len() > 1 && pattern.starts_with(INCLUDE_PREFIX) {
            excluded = false;
            pattern = &pattern[INCLUDE_PREFIX.len_utf8()..];
        }
        let mut recursive = true;
        if pattern.len() > 1 && pattern.starts_with(LOCAL_SEPARATOR) {
            recursive = false;
            pattern = &pattern[LOCAL_SEPARATOR.len_utf8()..];
        }
        let mut folder_only = false;
        if pattern.len() > 1 && pattern.ends_with(LOCAL_SEPARATOR) {
            folder_only = true;
            pattern = &pattern[..pattern.len() - LOCAL_SEPARATOR.len_utf8()];
        }
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Ok(None);
        }

        let (base, name) = match pattern.rfind(LOCAL_SEPARATOR) {
            Some(idx) => (
                join(directory, &pattern[..idx]),
                &pattern[idx + LOCAL_SEPARATOR.len_utf8()..],
            ),
            None => (directory.to_string(), pattern),
        };
        let matcher = GlobBuilder::new(name)
            .case_insensitive(true)
            .literal_separator(true)
            .build()
            .map_err(|source| ExclusionError::InvalidPattern {
                pattern: text.to_string(),
                source,
            })?
            .compile_matcher();

        Ok(Some(Self {
            line: text.to_string(),
            base,
            matcher,
            excluded,
            recursive,
            folder_only,
        }))
    }

    pub fn line(&self) -> &str {
        &self.line
    }

    pub fn is_exclusion(&self) -> bool {
        self.excluded
    }

    /// This rule's opinion of `item`, considering only the segments of
    /// `item` below `start`.
    ///
    /// An exclusion matching any such segment excludes the item; an
    /// inclusion must match the item's own name.
    fn verdict(&self, item: &str, is_folder: bool, start: &str) -> Option<bool> {
        let depth = path::depth_below(&self.base, item, LOCAL_SEPARATOR)?;
        if depth == 0 {
            return None;
        }
        let below_start = path::depth_below(start, item, LOCAL_SEPARATOR).unwrap_or(depth);
        let first = depth.saturating_sub(below_start);

        let all: Vec<&str> = item.trim_end_matches(LOCAL_SEPARATOR).split(LOCAL_SEPARATOR).collect();
        let segments = &all[all.len() - depth..];

        let mut result = None;
        for (index, segment) in segments.iter().enumerate().skip(first) {
            if !self.recursive && index > 0 {
                break;
            }
            let last = index + 1 == segments.len();
            if self.folder_only && !is_folder && last {
                break;
            }
            if self.matcher.is_match(segment) {
                if self.excluded {
                    result = Some(true);
                } else if last {
                    result = Some(false);
                }
            }
        }
        result
    }
}

/// The rules of one ignore file.
#[derive(Clone, Debug, Default)]
pub struct IgnoreFile {
    directory: String,
    entries: Vec<IgnoreEntry>,
}

impl IgnoreFile {
    /// Rules from `patterns`, applied below `directory`.
    ///
    /// Lines that do not compile are logged and skipped.
    pub fn from_patterns<I, S>(directory: &str, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut file = Self {
            directory: directory.to_string(),
            entries: Vec::new(),
        };
        for line in patterns {
            match IgnoreEntry::parse(directory, line.as_ref()) {
                Ok(Some(entry)) => file.entries.push(entry),
                Ok(None) => {}
                Err(e) => warn!(directory, error = %e, "skipping ignore file line"),
            }
        }
        file
    }

    /// Read the ignore file in `directory`, if there is one.
    pub fn load(directory: &str) -> ExclusionResult<Option<Self>> {
        let file_path = Path::new(directory).join(IGNORE_FILE_NAME);
        let bytes = match fs::read(&file_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ExclusionError::ReadIgnoreFile {
                    path: file_path,
                    source,
                })
            }
        };
        let text = decode(&bytes);
        let file = Self::from_patterns(directory, text.lines());
        debug!(path = %file_path.display(), entries = file.entries.len(), "ignore file loaded");
        Ok(Some(file))
    }

    pub fn directory(&self) -> &str {
        &self.directory
    }

    pub fn entries(&self) -> &[IgnoreEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `Some(true)` if this file excludes `item`, `Some(false)` if it
    /// re-includes it, `None` if it has no opinion.
    ///
    /// Only the segments of `item` below `start` are matched.
    pub fn is_excluded(&self, item: &str, is_folder: bool, start: &str) -> Option<bool> {
        self.entries
            .iter()
            .filter_map(|entry| entry.verdict(item, is_folder, start))
            .last()
    }
}

/// The first opinion among `files`, innermost first.
pub fn evaluate<'a, I>(files: I, item: &str, is_folder: bool, start: &str) -> Option<bool>
where
    I: IntoIterator<Item = &'a IgnoreFile>,
{
    files
        .into_iter()
        .find_map(|file| file.is_excluded(item, is_folder, start))
}

fn join(directory: &str, relative: &str) -> String {
    format!(
        "{}{}{}",
        directory.trim_end_matches(LOCAL_SEPARATOR),
        LOCAL_SEPARATOR,
        relative
    )
}

/// UTF-16LE when it carries that byte order mark, UTF-8 otherwise.
fn decode(bytes: &[u8]) -> String {
    match bytes {
        [0xFF, 0xFE, rest @ ..] => {
            let units = rest.chunks_exact(2).map(|pair| u16::from_le_bytes([pair[0], pair[1]]));
            char::decode_utf16(units)
                .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect()
        }
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}
