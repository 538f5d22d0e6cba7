//! The database behind a set of [`Preferences`](crate::Preferences) handles.
//!
//! A [`RootNode`] owns one [`Tree`] and knows which file it came from. It
//! reads that file once, when it is created, and writes the complete tree
//! back on flush and when it is dropped.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use prefstore_format::{self as format, Line};

use crate::access::FileAccess;
use crate::error::PrefsError;
use crate::paths::{self, Scope};
use crate::tree::Tree;

/// Where a database is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// A file derived from scope, vendor and application.
    Scoped {
        /// System-wide or per-user.
        scope: Scope,
        /// Core library preferences, which need the CORE access bits too.
        core: bool,
        /// Resolved file.
        file: PathBuf,
    },
    /// A file in a directory chosen by the caller. Governed by the user
    /// access bits.
    Directory {
        /// Resolved file.
        file: PathBuf,
    },
    /// Not persisted at all.
    Memory,
}

impl Location {
    /// Backing file, if any.
    pub fn file(&self) -> Option<&Path> {
        match self {
            Self::Scoped { file, .. } | Self::Directory { file } => Some(file),
            Self::Memory => None,
        }
    }

    fn scope(&self) -> Scope {
        match self {
            Self::Scoped { scope, .. } => *scope,
            Self::Directory { .. } | Self::Memory => Scope::User,
        }
    }

    fn is_core(&self) -> bool {
        matches!(self, Self::Scoped { core: true, .. })
    }
}

/// One open preferences database.
#[derive(Debug)]
pub struct RootNode {
    vendor: String,
    application: String,
    location: Location,
    access: FileAccess,
    read_only: bool,
    tree: Tree,
}

impl RootNode {
    /// Open a database and load its file. A missing, unreadable or
    /// forbidden file leaves the tree empty.
    pub fn new(
        vendor: &str,
        application: &str,
        location: Location,
        access: FileAccess,
        read_only: bool,
    ) -> Self {
        let mut root = Self {
            vendor: vendor.to_string(),
            application: application.to_string(),
            location,
            access,
            read_only,
            tree: Tree::new(),
        };
        if let Err(e) = root.read() {
            tracing::debug!("Starting with empty preferences: {e}");
        }
        root
    }

    /// A database that is never read from or written to disk.
    pub fn memory(vendor: &str, application: &str) -> Self {
        Self::new(
            vendor,
            application,
            Location::Memory,
            FileAccess::NONE,
            false,
        )
    }

    /// Vendor name as given when opening.
    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    /// Application name as given when opening.
    pub fn application(&self) -> &str {
        &self.application
    }

    /// Where this database is persisted.
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// The access policy this database was opened with.
    pub fn access(&self) -> FileAccess {
        self.access
    }

    /// Whether modifications are refused.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// The group tree.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// The group tree, mutably.
    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    fn may_read(&self) -> bool {
        self.access.allows_read(self.location.scope(), self.location.is_core())
    }

    fn may_write(&self) -> bool {
        self.access.allows_write(self.location.scope(), self.location.is_core())
    }

    /// Replace the tree with the contents of the backing file.
    ///
    /// Only called while opening: ids handed out before a read would not
    /// survive it.
    fn read(&mut self) -> Result<(), PrefsError> {
        let Some(path) = self.location.file().map(Path::to_path_buf) else {
            return Ok(());
        };
        if !self.may_read() {
            return Err(PrefsError::PermissionDenied { op: "read", path });
        }

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("No preferences file at {}", path.display());
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let (tree, skipped) = parse(&String::from_utf8_lossy(&bytes));
        self.tree = tree;
        tracing::debug!(
            "Loaded {} groups from {} ({skipped} lines skipped)",
            self.tree.len(),
            path.display()
        );
        Ok(())
    }

    /// The complete file contents for the current tree.
    ///
    /// # Errors
    ///
    /// Only fails if the tree writer fails, which an in-memory buffer never
    /// does.
    pub fn render(&self) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        for line in format::file_header(&self.vendor, &self.application) {
            writeln!(out, "{line}")?;
        }
        self.tree.write(&mut out)?;
        Ok(out)
    }

    /// Write the complete tree to the backing file, atomically.
    ///
    /// Dirty flags are cleared only when the file was replaced.
    ///
    /// # Errors
    ///
    /// [`PrefsError::NoFile`] for in-memory databases,
    /// [`PrefsError::ReadOnly`], [`PrefsError::PermissionDenied`] when the
    /// access policy forbids writing (checked before any I/O), and
    /// [`PrefsError::Unwritable`] when the file cannot be replaced.
    pub fn write(&mut self) -> Result<(), PrefsError> {
        let Some(path) = self.location.file().map(Path::to_path_buf) else {
            return Err(PrefsError::NoFile);
        };
        if self.read_only {
            return Err(PrefsError::ReadOnly);
        }
        if !self.may_write() {
            return Err(PrefsError::PermissionDenied { op: "write", path });
        }

        let unwritable = |source: io::Error| PrefsError::Unwritable {
            path: path.clone(),
            source,
        };
        let contents = self.render().map_err(unwritable)?;
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(unwritable)?;

        // Write next to the target so the rename stays on one filesystem.
        let mut tmp = tempfile::Builder::new()
            .prefix(".prefstore-")
            .tempfile_in(dir)
            .map_err(unwritable)?;
        tmp.write_all(&contents).map_err(unwritable)?;
        tmp.as_file().sync_all().map_err(unwritable)?;
        tmp.persist(&path).map_err(|e| unwritable(e.error))?;

        self.tree.clear_dirty_flags();
        tracing::debug!("Wrote preferences to {}", path.display());
        Ok(())
    }

    /// Write if anything changed since the last successful write.
    ///
    /// # Errors
    ///
    /// As [`RootNode::write`].
    pub fn flush(&mut self) -> Result<(), PrefsError> {
        if !self.tree.is_dirty() {
            return Ok(());
        }
        self.write()
    }

    /// Directory for bulk application data next to the preferences file,
    /// created if needed.
    ///
    /// # Errors
    ///
    /// [`PrefsError::NoFile`] for in-memory databases,
    /// [`PrefsError::PermissionDenied`] without write access, or an I/O
    /// error if the directory cannot be created.
    pub fn userdata_path(&self) -> Result<PathBuf, PrefsError> {
        let file = self.location.file().ok_or(PrefsError::NoFile)?;
        let dir = paths::userdata_dir(file);
        if !self.may_write() {
            return Err(PrefsError::PermissionDenied {
                op: "write",
                path: dir,
            });
        }
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

impl Drop for RootNode {
    fn drop(&mut self) {
        if self.read_only || self.location.file().is_none() {
            return;
        }
        match self.flush() {
            Ok(()) => {}
            Err(e @ PrefsError::PermissionDenied { .. }) => {
                tracing::debug!("Preferences not saved: {e}");
            }
            Err(e) => tracing::warn!("Preferences not saved: {e}"),
        }
    }
}

/// Build a tree from file contents. Returns the tree and the number of
/// lines that were skipped as malformed.
///
/// Comment lines attach to the entry that follows them in the same group;
/// comments before a group header or at the end of the file stay at the end
/// of the group they appear in.
pub fn parse(text: &str) -> (Tree, usize) {
    let mut tree = Tree::new();
    let mut current = tree.root();
    let mut last_entry: Option<usize> = None;
    let mut pending: Vec<String> = Vec::new();
    let mut skipped = 0;
    let mut in_header = true;

    for (number, raw) in text.lines().enumerate() {
        if in_header && format::is_header_line(number, raw) {
            continue;
        }
        in_header = false;

        match format::parse_line(raw) {
            Line::Blank => {}
            Line::Comment(comment) => pending.push(comment.to_string()),
            Line::Group(segments) => {
                if let Some(node) = tree.node_mut(current) {
                    node.push_trailing_comments(&mut pending);
                }
                current = tree.find_segments(&segments);
                last_entry = None;
            }
            Line::Continuation(chunk) => {
                let appended = match (last_entry, tree.node_mut(current)) {
                    (Some(ix), Some(node)) => node.append_value(ix, &chunk),
                    _ => false,
                };
                if !appended {
                    skipped += 1;
                    tracing::warn!(
                        "Skipping continuation without an entry on line {}",
                        number + 1
                    );
                }
            }
            Line::Entry { name, value } => {
                if let Some(node) = tree.node_mut(current) {
                    last_entry = Some(node.add_parsed(&name, value, &mut pending));
                }
            }
            Line::Malformed(line) => {
                skipped += 1;
                last_entry = None;
                tracing::warn!("Skipping malformed line {}: {line}", number + 1);
            }
        }
    }

    if let Some(node) = tree.node_mut(current) {
        node.push_trailing_comments(&mut pending);
    }
    tree.clear_dirty_flags();
    (tree, skipped)
}
