//! Filesystem attributes of scanned entries.

use std::fs::{self, Metadata};
use std::io;
use std::path::Path;
use std::time::SystemTime;

/// What the scanner and its consumers need to know about one entry.
///
/// Attributes describe the entry itself; symbolic links are never
/// followed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileAttributes {
    pub is_directory: bool,
    pub is_symlink: bool,
    pub is_hidden: bool,
    pub is_system: bool,
    pub is_executable: bool,
    pub length: u64,
    pub last_modified: Option<SystemTime>,
}

impl FileAttributes {
    /// Build from `lstat`-style metadata of the entry at `path`.
    pub fn from_metadata(path: &Path, metadata: &Metadata) -> Self {
        let file_type = metadata.file_type();
        let is_symlink = file_type.is_symlink();
        let is_directory = file_type.is_dir();
        Self {
            is_directory,
            is_symlink,
            is_hidden: is_hidden(path, metadata),
            is_system: is_system(metadata),
            is_executable: !is_directory && !is_symlink && is_executable(metadata),
            length: if is_directory { 0 } else { metadata.len() },
            last_modified: metadata.modified().ok(),
        }
    }
}

/// Where a scan gets entry attributes from.
pub trait AttributeSource {
    fn attributes(&self, path: &Path) -> io::Result<FileAttributes>;
}

/// Reads attributes from the real filesystem without following links.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsAttributes;

impl AttributeSource for FsAttributes {
    fn attributes(&self, path: &Path) -> io::Result<FileAttributes> {
        let metadata = fs::symlink_metadata(path)?;
        Ok(FileAttributes::from_metadata(path, &metadata))
    }
}

// ---------------------------------------------------------------------------
// Platform specifics
// ---------------------------------------------------------------------------

#[cfg(windows)]
const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;
#[cfg(windows)]
const FILE_ATTRIBUTE_SYSTEM: u32 = 0x4;

#[cfg(windows)]
fn is_hidden(_path: &Path, metadata: &Metadata) -> bool {
    use std::os::windows::fs::MetadataExt;
    metadata.file_attributes() & FILE_ATTRIBUTE_HIDDEN != 0
}

#[cfg(not(windows))]
fn is_hidden(path: &Path, _metadata: &Metadata) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.') && name != "." && name != "..")
}

#[cfg(windows)]
fn is_system(metadata: &Metadata) -> bool {
    use std::os::windows::fs::MetadataExt;
    metadata.file_attributes() & FILE_ATTRIBUTE_SYSTEM != 0
}

#[cfg(not(windows))]
fn is_system(_metadata: &Metadata) -> bool {
    false
}

#[cfg(unix)]
fn is_executable(metadata: &Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &Metadata) -> bool {
    false
}
