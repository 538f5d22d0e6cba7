//! Where preferences files live.
//!
//! User files go under the platform configuration directory, system files
//! under a fixed shared directory. Both end in `<vendor>/<application>.prefs`.

use std::path::{Path, PathBuf};

use dirs::config_dir;

/// Environment variable that overrides the user configuration directory.
pub const HOME_ENV: &str = "PREFSTORE_HOME";

/// File extension of preferences files.
pub const EXTENSION: &str = "prefs";

/// Whether a database is shared by all users or private to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Preferences are used system-wide.
    System,
    /// Preferences apply only to the current user.
    User,
}

impl Scope {
    /// Lowercase name, for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-user configuration directory, or None if it cannot be determined.
pub fn user_dir() -> Option<PathBuf> {
    if let Some(val) = std::env::var_os(HOME_ENV) {
        return Some(PathBuf::from(val));
    }
    config_dir()
}

/// Shared, system-wide configuration directory.
pub fn system_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        PathBuf::from("/Library/Preferences")
    }
    #[cfg(windows)]
    {
        std::env::var_os("PROGRAMDATA")
            .map_or_else(|| PathBuf::from("C:\\ProgramData"), PathBuf::from)
    }
    #[cfg(not(any(target_os = "macos", windows)))]
    {
        PathBuf::from("/etc/xdg")
    }
}

/// Base directory for a scope.
pub fn scope_dir(scope: Scope) -> Option<PathBuf> {
    match scope {
        Scope::User => user_dir(),
        Scope::System => Some(system_dir()),
    }
}

/// Make a vendor or application name usable as a single path component.
///
/// Empty names become `unknown`; separators and other characters that are
/// awkward in file names become `_`.
pub fn sanitize_component(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "unknown".to_string(),
        _ => cleaned,
    }
}

/// `<base>/<vendor>/<application>.prefs`
pub fn preferences_file(base: &Path, vendor: &str, application: &str) -> PathBuf {
    base.join(sanitize_component(vendor))
        .join(format!("{}.{EXTENSION}", sanitize_component(application)))
}

/// `<dir>/<application>.prefs`, for databases opened at an explicit directory.
pub fn directory_file(dir: &Path, application: &str) -> PathBuf {
    dir.join(format!("{}.{EXTENSION}", sanitize_component(application)))
}

/// Directory for an application's bulk data next to its preferences file:
/// the file path without its extension.
pub fn userdata_dir(prefs_file: &Path) -> PathBuf {
    prefs_file.with_extension("")
}
