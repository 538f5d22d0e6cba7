//! Hierarchical preferences stored as human-editable text files.
//!
//! A database is a tree of named groups holding name/value entries, persisted
//! at `<scope dir>/<vendor>/<application>.prefs`. Values are stored as text;
//! typed accessors convert on the way in and out, and every getter takes a
//! default for missing or unparsable entries.
//!
//! ```
//! use prefstore::Preferences;
//!
//! let prefs = Preferences::in_memory("Acme", "Widgets");
//! prefs.set_int("/Window/width", 800).unwrap();
//! assert_eq!(prefs.get_int("/Window/width", 0), 800);
//! assert_eq!(prefs.get_int("/Window/height", 600), 600);
//! ```
//!
//! Nothing touches the disk unless the [`FileAccess`] policy passed at open
//! time allows it. Handles are cheap to clone and may be shared between
//! threads; each call locks the whole database.

pub mod access;
pub mod error;
pub mod name;
pub mod node;
pub mod options;
pub mod paths;
pub mod prefs;
pub mod root;
pub mod tree;

// Re-exports
pub use access::FileAccess;
pub use error::PrefsError;
pub use name::{Name, new_uuid};
pub use node::{Entry, Node};
pub use options::OpenOptions;
pub use paths::Scope;
pub use prefs::{GroupId, Preferences};
pub use root::{Location, RootNode};
pub use tree::{NodeId, Tree};
