//! How to open a preferences database.

use std::path::{Path, PathBuf};

use crate::access::FileAccess;
use crate::paths::{self, Scope};
use crate::prefs::Preferences;
use crate::root::{Location, RootNode};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Scope(Scope),
    Directory(PathBuf),
    Memory,
}

/// Builder for opening a database.
///
/// # Example
///
/// ```
/// use prefstore::{FileAccess, OpenOptions, Scope};
///
/// let dir = tempfile::tempdir().unwrap();
/// let prefs = OpenOptions::new(Scope::User, "Acme", "Widgets")
///     .base_dir(dir.path())
///     .access(FileAccess::USER_OK)
///     .open();
/// prefs.set_int("/Window/width", 800).unwrap();
/// prefs.flush().unwrap();
/// assert!(dir.path().join("Acme").join("Widgets.prefs").exists());
/// ```
#[derive(Debug, Clone)]
pub struct OpenOptions {
    target: Target,
    vendor: String,
    application: String,
    base_dir: Option<PathBuf>,
    access: FileAccess,
    core: bool,
    read_only: bool,
}

impl OpenOptions {
    fn with_target(target: Target, vendor: &str, application: &str) -> Self {
        Self {
            target,
            vendor: vendor.to_string(),
            application: application.to_string(),
            base_dir: None,
            access: FileAccess::NONE,
            core: false,
            read_only: false,
        }
    }

    /// A database identified by scope, vendor and application. The file
    /// lives at `<scope dir>/<vendor>/<application>.prefs`.
    pub fn new(scope: Scope, vendor: &str, application: &str) -> Self {
        Self::with_target(Target::Scope(scope), vendor, application)
    }

    /// A database stored as `<dir>/<application>.prefs`.
    pub fn directory(dir: impl AsRef<Path>, vendor: &str, application: &str) -> Self {
        Self::with_target(
            Target::Directory(dir.as_ref().to_path_buf()),
            vendor,
            application,
        )
    }

    /// A database that is never persisted.
    pub fn memory(vendor: &str, application: &str) -> Self {
        Self::with_target(Target::Memory, vendor, application)
    }

    /// File access policy. Defaults to [`FileAccess::NONE`].
    pub fn access(mut self, access: FileAccess) -> Self {
        self.access = access;
        self
    }

    /// Replace the platform directory of the scope with `dir`.
    pub fn base_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.base_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Mark this as a core library database, which also needs the
    /// `CORE_*` access bits.
    pub fn core(mut self, core: bool) -> Self {
        self.core = core;
        self
    }

    /// Refuse every modification and never write the file.
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Resolve where the database lives.
    pub fn location(&self) -> Location {
        match &self.target {
            Target::Scope(scope) => {
                let base = self
                    .base_dir
                    .clone()
                    .or_else(|| paths::scope_dir(*scope));
                match base {
                    Some(base) => Location::Scoped {
                        scope: *scope,
                        core: self.core,
                        file: paths::preferences_file(&base, &self.vendor, &self.application),
                    },
                    None => {
                        tracing::warn!(
                            "No {scope} configuration directory; preferences stay in memory"
                        );
                        Location::Memory
                    }
                }
            }
            Target::Directory(dir) => Location::Directory {
                file: paths::directory_file(dir, &self.application),
            },
            Target::Memory => Location::Memory,
        }
    }

    /// Open the database, reading its file if the policy allows. Never
    /// fails: an unreadable file gives an empty database.
    pub fn open(&self) -> Preferences {
        let root = RootNode::new(
            &self.vendor,
            &self.application,
            self.location(),
            self.access,
            self.read_only,
        );
        Preferences::from_root(root)
    }
}
