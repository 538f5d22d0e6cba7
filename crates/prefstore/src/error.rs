//! Errors reported by the preferences store.
//!
//! Missing entries and groups are not errors: reads fall back to the
//! caller's default and lookups return `Option`.

use std::path::PathBuf;

use thiserror::Error;

/// Failure of a store operation.
#[derive(Error, Debug)]
pub enum PrefsError {
    /// The database was opened read-only; nothing was changed.
    #[error("Preferences are read-only")]
    ReadOnly,

    /// The file access policy forbids this operation. No I/O was attempted.
    #[error("File access policy denies {op} of {}", path.display())]
    PermissionDenied {
        /// `"read"` or `"write"`.
        op: &'static str,
        /// File that would have been touched.
        path: PathBuf,
    },

    /// The preferences file could not be written. The in-memory tree is
    /// intact and still dirty.
    #[error("Failed to write {}: {source}", path.display())]
    Unwritable {
        /// Target file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The database lives only in memory.
    #[error("Preferences are not backed by a file")]
    NoFile,

    /// The group was removed, or the operation cannot apply to it (such as
    /// removing the root).
    #[error("Invalid group: {0}")]
    InvalidGroup(String),

    /// Empty entry name, or a key ending in `/`.
    #[error("Invalid entry name: '{0}'")]
    InvalidKey(String),

    /// Any other I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
