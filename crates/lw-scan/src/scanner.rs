//! Breadth-first discovery of candidate items on disk.

use std::cell::OnceCell;
use std::collections::{BTreeSet, VecDeque};
use std::fs::{self, FileType};
use std::io;
use std::path::Path;

use lw_exclusions::{ignore, ExclusionMatcher, IgnoreFile};
use lw_types::path::{self, LOCAL_SEPARATOR};
use lw_types::{PathKey, RecursionType};
use tracing::{debug, warn};

use crate::attributes::{AttributeSource, FileAttributes, FsAttributes};
use crate::error::{ScanError, ScanResult};
use crate::options::ScanOptions;

// ---------------------------------------------------------------------------
// ScannedItem
// ---------------------------------------------------------------------------

/// Entry type as reported by the directory listing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
}

impl From<FileType> for EntryKind {
    fn from(file_type: FileType) -> Self {
        if file_type.is_symlink() {
            Self::Symlink
        } else if file_type.is_dir() {
            Self::Directory
        } else {
            Self::File
        }
    }
}

/// One entry found by a [`Scanner`].
///
/// Full attributes are fetched on first use, unless the scan already had
/// to read them to filter the entry.
#[derive(Clone, Debug)]
pub struct ScannedItem {
    local_item: String,
    kind: EntryKind,
    attributes: OnceCell<FileAttributes>,
}

impl ScannedItem {
    fn new(local_item: String, kind: EntryKind) -> Self {
        Self {
            local_item,
            kind,
            attributes: OnceCell::new(),
        }
    }

    fn with_attributes(local_item: String, attributes: FileAttributes) -> Self {
        let kind = if attributes.is_symlink {
            EntryKind::Symlink
        } else if attributes.is_directory {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        Self {
            local_item,
            kind,
            attributes: OnceCell::from(attributes),
        }
    }

    pub fn local_item(&self) -> &str {
        &self.local_item
    }

    pub fn path(&self) -> &Path {
        Path::new(&self.local_item)
    }

    pub fn name(&self) -> &str {
        path::file_name(&self.local_item, LOCAL_SEPARATOR)
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    /// A real directory; links to directories are not.
    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn is_symlink(&self) -> bool {
        self.kind == EntryKind::Symlink
    }

    /// The entry's attributes. If the scan did not already read them, they
    /// are read from the real filesystem on first call.
    pub fn attributes(&self) -> io::Result<&FileAttributes> {
        if let Some(attributes) = self.attributes.get() {
            return Ok(attributes);
        }
        let attributes = FsAttributes.attributes(self.path())?;
        Ok(self.attributes.get_or_init(|| attributes))
    }
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

/// Entries of one directory: first reported one by one, then descended
/// into one by one.
#[derive(Debug, Default)]
struct Level {
    unvisited: VecDeque<ScannedItem>,
    subdirectories: VecDeque<String>,
    /// Ignore file of the directory these entries were listed from.
    ignore: Option<IgnoreFile>,
}

/// Walks a tree from a start path, reporting the start item, then all of a
/// directory's children before descending into any of them.
///
/// Children are ordered case-insensitively. Reserved baseline folders,
/// excluded paths, entries excluded by a `.tfignore` file or by an
/// exclusion pattern and, unless asked for, hidden or system entries are
/// skipped together with everything below them. The innermost ignore file
/// with an opinion decides; exclusion patterns apply only where no ignore
/// file has one. Symbolic links are reported but never followed. Entries
/// whose attributes cannot be read are skipped.
pub struct Scanner<S: AttributeSource = FsAttributes> {
    source: S,
    options: ScanOptions,
    root: String,
    excluded: BTreeSet<PathKey>,
    matcher: ExclusionMatcher,
    /// Ignore files above the root, innermost first.
    outer_ignore: Vec<IgnoreFile>,
    max_depth: usize,
    levels: Vec<Level>,
}

impl Scanner<FsAttributes> {
    pub fn new(root: &str, recursion: RecursionType, options: ScanOptions) -> ScanResult<Self> {
        Self::with_source(root, recursion, options, FsAttributes)
    }
}

impl<S: AttributeSource> Scanner<S> {
    pub fn with_source(root: &str, recursion: RecursionType, options: ScanOptions, source: S) -> ScanResult<Self> {
        if root.is_empty() {
            return Err(ScanError::InvalidRoot(root.to_string()));
        }
        let matcher = ExclusionMatcher::new(options.exclusion_patterns.iter().cloned())?;
        let excluded: BTreeSet<PathKey> = options.excluded_paths.iter().map(|p| PathKey::local(p.as_str())).collect();

        let outer_ignore = match options.ignore_files_root.as_deref() {
            Some(top) if options.use_ignore_files => outer_ignore_files(top, root),
            _ => Vec::new(),
        };

        let mut scanner = Self {
            source,
            options,
            root: root.to_string(),
            excluded,
            matcher,
            outer_ignore,
            max_depth: recursion.depth(),
            levels: Vec::new(),
        };

        if scanner.excluded.contains(&PathKey::local(root)) {
            debug!(path = root, "scan root is excluded");
            return Ok(scanner);
        }
        match scanner.source.attributes(Path::new(root)) {
            Ok(attributes) => {
                let mut level = Level::default();
                level.unvisited.push_back(ScannedItem::with_attributes(root.to_string(), attributes));
                scanner.levels.push(level);
            }
            Err(e) => debug!(path = root, error = %e, "scan root unreadable"),
        }
        Ok(scanner)
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// The listed, filtered and sorted children of `dir`, with the ignore
    /// file of `dir`.
    fn read_children(&self, dir: &str) -> Level {
        let ignore_file = if self.options.use_ignore_files {
            load_ignore_file(dir)
        } else {
            None
        };
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(path = dir, error = %e, "skipping unreadable directory");
                return Level {
                    ignore: ignore_file,
                    ..Level::default()
                };
            }
        };

        let mut children = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!(path = dir, error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            let local_item = match entry.path().into_os_string().into_string() {
                Ok(local_item) => local_item,
                Err(raw) => {
                    debug!(path = ?raw, "skipping non-UTF-8 entry");
                    continue;
                }
            };
            if let Some(reason) = self.skip_reason(&local_item) {
                debug!(path = %local_item, reason, "scanner skip");
                continue;
            }
            let kind = match entry.file_type() {
                Ok(file_type) => EntryKind::from(file_type),
                Err(e) => {
                    debug!(path = %local_item, error = %e, "skipping entry with unreadable type");
                    continue;
                }
            };
            if let Some(reason) = self.exclusion_reason(ignore_file.as_ref(), &local_item, kind == EntryKind::Directory) {
                debug!(path = %local_item, reason, "scanner skip");
                continue;
            }

            let item = ScannedItem::new(local_item, kind);
            if !self.options.include_hidden {
                match self.source.attributes(item.path()) {
                    Ok(attributes) if attributes.is_hidden || attributes.is_system => {
                        debug!(path = %item.local_item, "scanner skip hidden");
                        continue;
                    }
                    Ok(attributes) => {
                        let _ = item.attributes.set(attributes);
                    }
                    Err(e) => {
                        debug!(path = %item.local_item, error = %e, "skipping entry with unreadable attributes");
                        continue;
                    }
                }
            }
            children.push(item);
        }

        children.sort_by(|a, b| path::compare_top_down(&a.local_item, &b.local_item, LOCAL_SEPARATOR));
        Level {
            unvisited: children.into(),
            subdirectories: VecDeque::new(),
            ignore: ignore_file,
        }
    }

    /// Name and path based filters, checked before any attribute read.
    fn skip_reason(&self, local_item: &str) -> Option<&'static str> {
        let name = path::file_name(local_item, LOCAL_SEPARATOR);
        if name == "." || name == ".." {
            Some("self or parent")
        } else if self.options.is_reserved(name) {
            Some("baseline folder")
        } else if self.excluded.contains(&PathKey::local(local_item)) {
            Some("excluded path")
        } else {
            None
        }
    }

    /// Ignore files from `own` outwards, then the exclusion patterns.
    fn exclusion_reason(&self, own: Option<&IgnoreFile>, local_item: &str, is_folder: bool) -> Option<&'static str> {
        let files = own
            .into_iter()
            .chain(self.levels.iter().rev().filter_map(|level| level.ignore.as_ref()))
            .chain(self.outer_ignore.iter());
        match ignore::evaluate(files, local_item, is_folder, &self.root) {
            Some(true) => Some("ignore file"),
            Some(false) => None,
            None if self.matcher.is_excluded(path::file_name(local_item, LOCAL_SEPARATOR)) => {
                Some("exclusion pattern")
            }
            None => None,
        }
    }
}

fn load_ignore_file(dir: &str) -> Option<IgnoreFile> {
    match IgnoreFile::load(dir) {
        Ok(file) => file,
        Err(e) => {
            warn!(path = dir, error = %e, "ignore file unreadable");
            None
        }
    }
}

/// Ignore files in the directories above `root`, up to and including
/// `top`, innermost first.
fn outer_ignore_files(top: &str, root: &str) -> Vec<IgnoreFile> {
    let mut files = Vec::new();
    let mut current = path::parent(root, LOCAL_SEPARATOR);
    while let Some(dir) = current {
        if !path::is_child(top, dir, LOCAL_SEPARATOR) {
            break;
        }
        files.extend(load_ignore_file(dir));
        current = path::parent(dir, LOCAL_SEPARATOR);
    }
    files
}

impl<S: AttributeSource> Iterator for Scanner<S> {
    type Item = ScannedItem;

    fn next(&mut self) -> Option<ScannedItem> {
        loop {
            let depth = self.levels.len();
            let level = self.levels.last_mut()?;
            if let Some(item) = level.unvisited.pop_front() {
                if item.is_directory() && depth <= self.max_depth {
                    level.subdirectories.push_back(item.local_item.clone());
                }
                return Some(item);
            }
            match level.subdirectories.pop_front() {
                Some(dir) => {
                    let level = self.read_children(&dir);
                    self.levels.push(level);
                }
                None => {
                    self.levels.pop();
                }
            }
        }
    }
}

impl<S: AttributeSource> std::fmt::Debug for Scanner<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("depth", &self.levels.len())
            .field("max_depth", &self.max_depth)
            .field("include_hidden", &self.options.include_hidden)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn root_of(dir: &tempfile::TempDir) -> String {
        dir.path().to_str().unwrap().to_string()
    }

    /// Paths relative to `root`, joined with `/`; the root itself is `.`.
    fn relative(items: impl Iterator<Item = ScannedItem>, root: &str) -> Vec<String> {
        items
            .map(|item| {
                let rel = item.path().strip_prefix(root).unwrap();
                let parts: Vec<&str> = rel.iter().map(|c| c.to_str().unwrap()).collect();
                if parts.is_empty() {
                    ".".to_string()
                } else {
                    parts.join("/")
                }
            })
            .collect()
    }

    fn build_tree(dir: &tempfile::TempDir) {
        let root = dir.path();
        fs::write(root.join("a.txt"), b"a").unwrap();
        fs::write(root.join(".h"), b"h").unwrap();
        fs::create_dir(root.join("$tf")).unwrap();
        fs::write(root.join("$tf").join("base"), b"").unwrap();
        fs::create_dir(root.join("x")).unwrap();
        fs::write(root.join("x").join("y"), b"").unwrap();
        fs::create_dir(root.join("B")).unwrap();
        fs::create_dir_all(root.join("sub").join("deeper")).unwrap();
        fs::write(root.join("sub").join("c.txt"), b"c").unwrap();
        fs::write(root.join("sub").join("deeper").join("d.txt"), b"d").unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn breadth_first_with_filters() {
        let dir = tempfile::tempdir().unwrap();
        build_tree(&dir);
        let root = root_of(&dir);
        let excluded = dir.path().join("x").to_str().unwrap().to_string();

        let options = ScanOptions::default().with_excluded_paths([excluded]);
        let scanner = Scanner::new(&root, RecursionType::Full, options).unwrap();
        assert_eq!(
            relative(scanner, &root),
            vec![".", "a.txt", "B", "sub", "sub/c.txt", "sub/deeper", "sub/deeper/d.txt"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn hidden_entries_when_asked() {
        let dir = tempfile::tempdir().unwrap();
        build_tree(&dir);
        let root = root_of(&dir);

        let options = ScanOptions::default().with_include_hidden(true);
        let found = relative(Scanner::new(&root, RecursionType::OneLevel, options).unwrap(), &root);
        assert_eq!(found, vec![".", ".h", "a.txt", "B", "sub", "x"]);
    }

    #[test]
    fn recursion_bounds_depth() {
        let dir = tempfile::tempdir().unwrap();
        build_tree(&dir);
        let root = root_of(&dir);

        let only_root = relative(Scanner::new(&root, RecursionType::None, ScanOptions::default()).unwrap(), &root);
        assert_eq!(only_root, vec!["."]);

        let one_level: Vec<String> =
            relative(Scanner::new(&root, RecursionType::OneLevel, ScanOptions::default()).unwrap(), &root);
        assert!(one_level.contains(&"sub".to_string()));
        assert!(!one_level.iter().any(|p| p.contains('/')));
    }

    #[test]
    fn exclusion_patterns_skip_by_name() {
        let dir = tempfile::tempdir().unwrap();
        build_tree(&dir);
        let root = root_of(&dir);

        let options = ScanOptions::default()
            .with_include_hidden(true)
            .with_exclusion_patterns(["*.TXT", "deeper"]);
        let found = relative(Scanner::new(&root, RecursionType::Full, options).unwrap(), &root);
        assert!(!found.iter().any(|p| p.ends_with(".txt") || p.contains("deeper")));
        assert!(found.contains(&"sub".to_string()));
        assert!(found.contains(&"x/y".to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn nested_ignore_file_reincludes_what_parent_excluded() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join(".tfignore"), "# logs\n*.log\nbuild/\n").unwrap();
        fs::write(root.join("a.log"), b"").unwrap();
        fs::write(root.join("build"), b"").unwrap();
        fs::create_dir_all(root.join("sub").join("build")).unwrap();
        fs::write(root.join("sub").join(".tfignore"), "!keep.log\n").unwrap();
        fs::write(root.join("sub").join("b.log"), b"").unwrap();
        fs::write(root.join("sub").join("keep.log"), b"").unwrap();
        fs::write(root.join("sub").join("c.txt"), b"").unwrap();
        let root = root_of(&dir);

        let found = relative(Scanner::new(&root, RecursionType::Full, ScanOptions::default()).unwrap(), &root);
        assert_eq!(found, vec![".", "build", "sub", "sub/c.txt", "sub/keep.log"]);
    }

    #[cfg(unix)]
    #[test]
    fn ignore_file_overrides_exclusion_patterns() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".tfignore"), "!vendor.dll\n").unwrap();
        fs::write(dir.path().join("vendor.dll"), b"").unwrap();
        fs::write(dir.path().join("other.dll"), b"").unwrap();
        let root = root_of(&dir);

        let options = ScanOptions::default().with_exclusion_patterns(["*.dll"]);
        let found = relative(Scanner::new(&root, RecursionType::Full, options.clone()).unwrap(), &root);
        assert_eq!(found, vec![".", "vendor.dll"]);

        let found = relative(Scanner::new(&root, RecursionType::Full, options.with_ignore_files(false)).unwrap(), &root);
        assert_eq!(found, vec!["."]);
    }

    #[cfg(unix)]
    #[test]
    fn ignore_files_above_the_root_apply_when_asked() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".tfignore"), "*.tmp\n").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("x.tmp"), b"").unwrap();
        fs::write(dir.path().join("sub").join("y.txt"), b"").unwrap();
        let top = root_of(&dir);
        let root = dir.path().join("sub").to_str().unwrap().to_string();

        let found = relative(Scanner::new(&root, RecursionType::Full, ScanOptions::default()).unwrap(), &root);
        assert_eq!(found, vec![".", "x.tmp", "y.txt"]);

        let options = ScanOptions::default().with_ignore_files_root(top);
        let found = relative(Scanner::new(&root, RecursionType::Full, options).unwrap(), &root);
        assert_eq!(found, vec![".", "y.txt"]);
    }

    struct FailingOn {
        name: &'static str,
        calls: Cell<usize>,
    }

    impl AttributeSource for FailingOn {
        fn attributes(&self, path: &Path) -> io::Result<FileAttributes> {
            self.calls.set(self.calls.get() + 1);
            if path.file_name().and_then(|n| n.to_str()) == Some(self.name) {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
            }
            FsAttributes.attributes(path)
        }
    }

    #[test]
    fn attribute_failures_skip_the_entry() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("ok"), b"").unwrap();
        fs::write(dir.path().join("denied"), b"").unwrap();
        let root = root_of(&dir);

        let source = FailingOn { name: "denied", calls: Cell::new(0) };
        let scanner = Scanner::with_source(&root, RecursionType::Full, ScanOptions::default(), source).unwrap();
        assert_eq!(relative(scanner, &root), vec![".", "ok"]);
    }

    #[test]
    fn attributes_are_lazy_when_not_filtering() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("denied"), b"abc").unwrap();
        let root = root_of(&dir);

        let source = FailingOn { name: "denied", calls: Cell::new(0) };
        let options = ScanOptions::default().with_include_hidden(true);
        let mut scanner = Scanner::with_source(&root, RecursionType::Full, options, source).unwrap();

        let first = scanner.next().unwrap();
        assert!(first.attributes().unwrap().is_directory);
        let item = scanner.next().unwrap();
        assert_eq!(item.name(), "denied");
        assert!(scanner.next().is_none());

        // Only the root was read through the source.
        assert_eq!(scanner.source.calls.get(), 1);
        assert_eq!(item.attributes().unwrap().length, 3);
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_reported_not_followed() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("real")).unwrap();
        fs::write(dir.path().join("real").join("f"), b"").unwrap();
        std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("link")).unwrap();
        let root = root_of(&dir);

        let items: Vec<ScannedItem> = Scanner::new(&root, RecursionType::Full, ScanOptions::default())
            .unwrap()
            .collect();
        let link = items.iter().find(|i| i.name() == "link").unwrap();
        assert!(link.is_symlink());
        assert!(!link.is_directory());
        assert_eq!(relative(items.into_iter(), &root), vec![".", "link", "real", "real/f"]);
    }

    #[test]
    fn file_root_and_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("only.txt");
        fs::write(&file, b"").unwrap();

        let items: Vec<ScannedItem> = Scanner::new(file.to_str().unwrap(), RecursionType::Full, ScanOptions::default())
            .unwrap()
            .collect();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].kind(), EntryKind::File);

        let missing = dir.path().join("missing");
        let mut scanner = Scanner::new(missing.to_str().unwrap(), RecursionType::Full, ScanOptions::default()).unwrap();
        assert!(scanner.next().is_none());
    }

    #[test]
    fn setup_errors() {
        assert!(matches!(
            Scanner::new("", RecursionType::Full, ScanOptions::default()),
            Err(ScanError::InvalidRoot(_))
        ));
        let options = ScanOptions::default().with_exclusion_patterns(["[bad"]);
        assert!(matches!(
            Scanner::new("/tmp", RecursionType::Full, options),
            Err(ScanError::Exclusion(_))
        ));
    }
}
