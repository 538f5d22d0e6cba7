//! User-facing handles.
//!
//! A [`Preferences`] handle points at one group of an open database. Any
//! number of handles may point into the same database; they share it through
//! an `Arc<Mutex<_>>`, and the database is flushed when the last one drops.
//!
//! Keys may carry a group path: `"Window/width"` addresses entry `width` in
//! child group `Window`, and `"/Window/width"` does the same from the root.
//! Writes create missing groups on the way; reads never do.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use prefstore_format::number;

use crate::access::FileAccess;
use crate::error::PrefsError;
use crate::node::Node;
use crate::options::OpenOptions;
use crate::paths::Scope;
use crate::root::RootNode;
use crate::tree::NodeId;

/// Identifies a group while its database is open. See [`Preferences::id`].
pub type GroupId = NodeId;

/// A handle to one group of a preferences database.
///
/// Every `get_*` takes a default that is returned, unchanged, when the entry
/// is missing or does not parse as the requested type. Callers never need to
/// special-case a first run.
///
/// Handles are `Send + Sync`; each call locks the whole database for its
/// duration.
#[derive(Debug, Clone)]
pub struct Preferences {
    root: Arc<Mutex<RootNode>>,
    node: NodeId,
}

fn split_key(key: &str) -> Result<(Option<&str>, &str), PrefsError> {
    let (group, leaf) = match key.rfind('/') {
        Some(0) => (Some("/"), &key[1..]),
        Some(i) => (Some(&key[..i]), &key[i + 1..]),
        None => (None, key),
    };
    if leaf.is_empty() {
        return Err(PrefsError::InvalidKey(key.to_string()));
    }
    Ok((group, leaf))
}

impl Preferences {
    /// Open the database for (scope, vendor, application).
    pub fn new(scope: Scope, vendor: &str, application: &str, access: FileAccess) -> Self {
        OpenOptions::new(scope, vendor, application)
            .access(access)
            .open()
    }

    /// Open the database stored as `<dir>/<application>.prefs`.
    pub fn with_path(
        dir: impl AsRef<Path>,
        vendor: &str,
        application: &str,
        access: FileAccess,
    ) -> Self {
        OpenOptions::directory(dir, vendor, application)
            .access(access)
            .open()
    }

    /// Open a database that lives only in memory.
    pub fn in_memory(vendor: &str, application: &str) -> Self {
        OpenOptions::memory(vendor, application).open()
    }

    /// Open a database described by `options`.
    pub fn open(options: &OpenOptions) -> Self {
        options.open()
    }

    pub(crate) fn from_root(root: RootNode) -> Self {
        let node = root.tree().root();
        Self {
            root: Arc::new(Mutex::new(root)),
            node,
        }
    }

    fn lock(&self) -> MutexGuard<'_, RootNode> {
        self.root.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn handle(&self, node: NodeId) -> Self {
        Self {
            root: Arc::clone(&self.root),
            node,
        }
    }

    fn stale(&self) -> PrefsError {
        PrefsError::InvalidGroup(format!("{:?}", self.node))
    }

    // ----- navigation -----

    /// Handle to the group at `path` (relative, or absolute with a leading
    /// `/`), created if missing.
    ///
    /// # Errors
    ///
    /// [`PrefsError::InvalidGroup`] if this handle's group was removed.
    pub fn group(&self, path: &str) -> Result<Self, PrefsError> {
        let id = self.lock().tree_mut().find(self.node, path);
        id.map(|id| self.handle(id)).ok_or_else(|| self.stale())
    }

    /// Handle to the child group at ordinal position `ix`.
    pub fn group_at(&self, ix: usize) -> Option<Self> {
        let id = self.lock().tree().child_node(self.node, ix)?;
        Some(self.handle(id))
    }

    /// Id of this group, usable with [`Preferences::from_id`] and
    /// [`Preferences::remove_id`] while the database stays open.
    pub fn id(&self) -> GroupId {
        self.node
    }

    /// Another handle into the same database, for a group id obtained
    /// earlier. None if that group has been removed.
    pub fn from_id(&self, id: GroupId) -> Option<Self> {
        self.lock().tree().contains(id).then(|| self.handle(id))
    }

    /// Remove the group `id` and everything below it.
    ///
    /// # Errors
    ///
    /// [`PrefsError::ReadOnly`], or [`PrefsError::InvalidGroup`] for the
    /// root or an already removed group.
    pub fn remove_id(&self, id: GroupId) -> Result<(), PrefsError> {
        let mut root = self.lock();
        if root.is_read_only() {
            return Err(PrefsError::ReadOnly);
        }
        if root.tree_mut().remove(id) {
            Ok(())
        } else {
            Err(PrefsError::InvalidGroup(format!("{id:?}")))
        }
    }

    /// Name of this group; empty for the root.
    pub fn name(&self) -> String {
        self.lock()
            .tree()
            .node(self.node)
            .map(|n| n.name().to_string())
            .unwrap_or_default()
    }

    /// Full path of this group; `/` for the root.
    pub fn path(&self) -> String {
        self.lock().tree().path(self.node).unwrap_or_default()
    }

    // ----- groups -----

    /// Number of child groups.
    pub fn groups(&self) -> usize {
        self.lock().tree().n_children(self.node)
    }

    /// Name of the child group at ordinal position `ix`.
    pub fn group_name(&self, ix: usize) -> Option<String> {
        self.lock().tree().child(self.node, ix).map(str::to_string)
    }

    /// Whether the group at `path` exists. Never creates it.
    pub fn group_exists(&self, path: &str) -> bool {
        self.lock().tree_mut().search(self.node, path, 0).is_some()
    }

    /// Delete the group at `path` with everything below it. Returns whether
    /// it existed.
    ///
    /// # Errors
    ///
    /// [`PrefsError::ReadOnly`].
    pub fn delete_group(&self, path: &str) -> Result<bool, PrefsError> {
        let mut root = self.lock();
        if root.is_read_only() {
            return Err(PrefsError::ReadOnly);
        }
        let tree = root.tree_mut();
        Ok(tree
            .search(self.node, path, 0)
            .is_some_and(|id| tree.remove(id)))
    }

    /// Delete every child group.
    ///
    /// # Errors
    ///
    /// [`PrefsError::ReadOnly`], or [`PrefsError::InvalidGroup`] if this
    /// group was removed.
    pub fn delete_all_groups(&self) -> Result<(), PrefsError> {
        let mut root = self.lock();
        if root.is_read_only() {
            return Err(PrefsError::ReadOnly);
        }
        if root.tree_mut().delete_all_children(self.node) {
            Ok(())
        } else {
            Err(self.stale())
        }
    }

    // ----- entries -----

    /// Number of entries in this group.
    pub fn entries(&self) -> usize {
        self.lock()
            .tree()
            .node(self.node)
            .map_or(0, Node::n_entries)
    }

    /// Name of the entry at ordinal position `ix`.
    pub fn entry(&self, ix: usize) -> Option<String> {
        let root = self.lock();
        let entry = root.tree().node(self.node)?.entry(ix)?;
        Some(entry.name().to_string())
    }

    /// Whether `key` exists. Never creates anything.
    pub fn entry_exists(&self, key: &str) -> bool {
        self.read_raw(key, |_| Some(())).is_some()
    }

    /// Delete one entry and the comments in front of it. Returns whether it
    /// existed.
    ///
    /// # Errors
    ///
    /// [`PrefsError::ReadOnly`], or [`PrefsError::InvalidKey`].
    pub fn delete_entry(&self, key: &str) -> Result<bool, PrefsError> {
        let (group, leaf) = split_key(key)?;
        let mut root = self.lock();
        if root.is_read_only() {
            return Err(PrefsError::ReadOnly);
        }
        let tree = root.tree_mut();
        let id = match group {
            Some(group) => tree.search(self.node, group, 0),
            None => Some(self.node),
        };
        Ok(id
            .and_then(|id| tree.node_mut(id))
            .is_some_and(|node| node.delete_entry(leaf)))
    }

    /// Delete every entry of this group. Child groups stay.
    ///
    /// # Errors
    ///
    /// [`PrefsError::ReadOnly`], or [`PrefsError::InvalidGroup`] if this
    /// group was removed.
    pub fn delete_all_entries(&self) -> Result<(), PrefsError> {
        let mut root = self.lock();
        if root.is_read_only() {
            return Err(PrefsError::ReadOnly);
        }
        let node = root.tree_mut().node_mut(self.node).ok_or_else(|| self.stale())?;
        node.delete_all_entries();
        Ok(())
    }

    /// Delete every entry and every child group.
    ///
    /// # Errors
    ///
    /// As [`Preferences::delete_all_entries`].
    pub fn clear(&self) -> Result<(), PrefsError> {
        self.delete_all_entries()?;
        self.delete_all_groups()
    }

    /// Length in bytes of the stored text of `key`, 0 if missing.
    pub fn size(&self, key: &str) -> usize {
        self.read_raw(key, |raw| Some(raw.len())).unwrap_or(0)
    }

    // ----- raw access -----

    fn read_raw<T>(&self, key: &str, parse: impl FnOnce(&str) -> Option<T>) -> Option<T> {
        let (group, leaf) = split_key(key).ok()?;
        let mut root = self.lock();
        let tree = root.tree_mut();
        let id = match group {
            Some(group) => tree.search(self.node, group, 0)?,
            None => self.node,
        };
        tree.node_mut(id)?.get(leaf).and_then(parse)
    }

    fn write_raw(&self, key: &str, value: &str) -> Result<(), PrefsError> {
        let (group, leaf) = split_key(key)?;
        let mut root = self.lock();
        if root.is_read_only() {
            return Err(PrefsError::ReadOnly);
        }
        let tree = root.tree_mut();
        let id = match group {
            Some(group) => tree.find(self.node, group),
            None => Some(self.node),
        };
        let node = id
            .and_then(|id| tree.node_mut(id))
            .ok_or_else(|| self.stale())?;
        node.set(leaf, value);
        Ok(())
    }

    // ----- typed setters -----

    /// Store a string.
    ///
    /// # Errors
    ///
    /// [`PrefsError::ReadOnly`], [`PrefsError::InvalidKey`], or
    /// [`PrefsError::InvalidGroup`] if this group was removed. The tree is
    /// unchanged on error.
    pub fn set(&self, key: &str, value: &str) -> Result<(), PrefsError> {
        self.write_raw(key, value)
    }

    /// Store an integer.
    ///
    /// # Errors
    ///
    /// As [`Preferences::set`].
    pub fn set_int(&self, key: &str, value: i64) -> Result<(), PrefsError> {
        self.write_raw(key, &value.to_string())
    }

    /// Store a float in its shortest exact form.
    ///
    /// # Errors
    ///
    /// As [`Preferences::set`].
    pub fn set_float(&self, key: &str, value: f32) -> Result<(), PrefsError> {
        self.write_raw(key, &number::format_float(value))
    }

    /// Store a float with `precision` significant digits.
    ///
    /// # Errors
    ///
    /// As [`Preferences::set`].
    pub fn set_float_with_precision(
        &self,
        key: &str,
        value: f32,
        precision: usize,
    ) -> Result<(), PrefsError> {
        self.write_raw(key, &number::format_general(f64::from(value), precision))
    }

    /// Store a double in its shortest exact form.
    ///
    /// # Errors
    ///
    /// As [`Preferences::set`].
    pub fn set_double(&self, key: &str, value: f64) -> Result<(), PrefsError> {
        self.write_raw(key, &number::format_double(value))
    }

    /// Store a double with `precision` significant digits.
    ///
    /// # Errors
    ///
    /// As [`Preferences::set`].
    pub fn set_double_with_precision(
        &self,
        key: &str,
        value: f64,
        precision: usize,
    ) -> Result<(), PrefsError> {
        self.write_raw(key, &number::format_general(value, precision))
    }

    /// Store binary data as hex text.
    ///
    /// # Errors
    ///
    /// As [`Preferences::set`].
    pub fn set_bytes(&self, key: &str, value: &[u8]) -> Result<(), PrefsError> {
        self.write_raw(key, &hex::encode(value))
    }

    // ----- typed getters -----

    /// The stored string, or None if missing.
    pub fn try_get(&self, key: &str) -> Option<String> {
        self.read_raw(key, |raw| Some(raw.to_string()))
    }

    /// The stored string, or `default`.
    pub fn get(&self, key: &str, default: &str) -> String {
        self.try_get(key).unwrap_or_else(|| default.to_string())
    }

    /// The stored integer, or `default`.
    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        self.read_raw(key, |raw| number::parse_int(raw).ok()).unwrap_or(default)
    }

    /// The stored float, or `default`.
    pub fn get_float(&self, key: &str, default: f32) -> f32 {
        self.read_raw(key, |raw| number::parse_float(raw).ok()).unwrap_or(default)
    }

    /// The stored double, or `default`.
    pub fn get_double(&self, key: &str, default: f64) -> f64 {
        self.read_raw(key, |raw| number::parse_double(raw).ok()).unwrap_or(default)
    }

    /// The stored binary data, or `default`.
    pub fn get_bytes(&self, key: &str, default: &[u8]) -> Vec<u8> {
        self.read_raw(key, |raw| hex::decode(raw.trim()).ok())
            .unwrap_or_else(|| default.to_vec())
    }

    // ----- persistence -----

    /// Write the database if anything changed since the last write.
    ///
    /// # Errors
    ///
    /// [`PrefsError::NoFile`] for in-memory databases with changes,
    /// [`PrefsError::ReadOnly`], [`PrefsError::PermissionDenied`] or
    /// [`PrefsError::Unwritable`]. Nothing is lost in memory on error.
    pub fn flush(&self) -> Result<(), PrefsError> {
        self.lock().flush()
    }

    /// Whether anything in the database changed since the last write.
    pub fn is_dirty(&self) -> bool {
        self.lock().tree().is_dirty()
    }

    /// Whether the database refuses modifications.
    pub fn is_read_only(&self) -> bool {
        self.lock().is_read_only()
    }

    /// The backing file, if any.
    pub fn file_path(&self) -> Option<PathBuf> {
        self.lock().location().file().map(Path::to_path_buf)
    }

    /// Directory for bulk application data that does not belong in the
    /// preferences file, created on demand.
    ///
    /// # Errors
    ///
    /// As [`RootNode::userdata_path`].
    pub fn userdata_path(&self) -> Result<PathBuf, PrefsError> {
        self.lock().userdata_path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn prefs() -> Preferences {
        Preferences::in_memory("Acme", "Widgets")
    }

    #[test]
    fn split_key_forms() {
        assert_eq!(split_key("w").unwrap(), (None, "w"));
        assert_eq!(split_key("/w").unwrap(), (Some("/"), "w"));
        assert_eq!(split_key("a/b/w").unwrap(), (Some("a/b"), "w"));
        assert!(split_key("a/").is_err());
        assert!(split_key("").is_err());
    }

    #[test]
    fn typed_round_trips() {
        let p = prefs();
        p.set_int("int", -42).unwrap();
        p.set_float("float", 0.1).unwrap();
        p.set_double("double", 1.0 / 3.0).unwrap();
        p.set_float_with_precision("fp", 2.5, 3).unwrap();
        p.set_double_with_precision("dp", 0.125, 6).unwrap();
        p.set("str", "hello").unwrap();
        p.set_bytes("bin", &[0, 1, 0xfe, 0xff]).unwrap();

        assert_eq!(p.get_int("int", 0), -42);
        assert_eq!(p.get_float("float", 0.0).to_bits(), 0.1f32.to_bits());
        assert_eq!(p.get_double("double", 0.0).to_bits(), (1.0f64 / 3.0).to_bits());
        assert_eq!(p.get_float("fp", 0.0).to_bits(), 2.5f32.to_bits());
        assert_eq!(p.get("fp", ""), "2.5");
        assert_eq!(p.get_double("dp", 0.0).to_bits(), 0.125f64.to_bits());
        assert_eq!(p.get("str", ""), "hello");
        assert_eq!(p.get_bytes("bin", &[]), vec![0, 1, 0xfe, 0xff]);
        assert_eq!(p.get("bin", ""), "0001feff");
    }

    #[test]
    fn precision_controls_text() {
        let p = prefs();
        p.set_double_with_precision("pi", std::f64::consts::PI, 4).unwrap();
        assert_eq!(p.get("pi", ""), "3.142");
    }

    #[test]
    fn defaults_on_miss_and_parse_failure() {
        let p = prefs();
        p.set("word", "not a number").unwrap();
        assert_eq!(p.get_int("word", 7), 7);
        assert_eq!(p.get_double("word", 1.5).to_bits(), 1.5f64.to_bits());
        assert_eq!(p.get_bytes("word", b"dflt"), b"dflt".to_vec());
        assert_eq!(p.get_int("missing", 9), 9);
        assert_eq!(p.get("missing", "fallback"), "fallback");
        assert_eq!(p.try_get("missing"), None);
    }

    #[test]
    fn reads_never_create() {
        let p = prefs();
        assert_eq!(p.get_int("/Window/width", 0), 0);
        assert!(!p.group_exists("Window"));
        assert!(!p.entry_exists("/Window/width"));
        assert_eq!(p.groups(), 0);
        assert!(!p.is_dirty());
    }

    #[test]
    fn key_paths_vivify_groups_on_write() {
        let p = prefs();
        p.set_int("/Window/Panel/width", 800).unwrap();
        assert!(p.group_exists("Window"));
        assert!(p.group_exists("/Window/Panel"));
        let window = p.group("Window").unwrap();
        assert_eq!(window.get_int("Panel/width", 0), 800);
        assert_eq!(window.get_int("/Window/Panel/width", 0), 800);
        assert_eq!(window.path(), "/Window");
        assert_eq!(window.name(), "Window");
        assert_eq!(p.path(), "/");
        assert_eq!(p.name(), "");
    }

    #[test]
    fn enumerate_groups_and_entries() {
        let p = prefs();
        p.group("b").unwrap();
        p.group("a").unwrap();
        p.set("y", "1").unwrap();
        p.set("x", "2").unwrap();
        assert_eq!(p.groups(), 2);
        assert_eq!(p.group_name(0).as_deref(), Some("b"));
        assert_eq!(p.group_name(1).as_deref(), Some("a"));
        assert_eq!(p.group_name(2), None);
        assert_eq!(p.group_at(1).unwrap().path(), "/a");
        assert_eq!(p.entries(), 2);
        assert_eq!(p.entry(0).as_deref(), Some("y"));
        assert_eq!(p.entry(1).as_deref(), Some("x"));
    }

    #[test]
    fn delete_group_removes_descendants() {
        let p = prefs();
        p.set("a/b/c/k", "v").unwrap();
        p.set("a/keep", "1").unwrap();
        assert!(p.delete_group("a/b").unwrap());
        assert!(!p.delete_group("a/b").unwrap());
        assert!(!p.group_exists("a/b/c"));
        assert!(p.group_exists("a"));
        assert_eq!(p.get("a/keep", ""), "1");
        assert!(!p.delete_group("/").unwrap());
    }

    #[test]
    fn delete_entry_and_clear() {
        let p = prefs();
        p.set("a", "1").unwrap();
        p.set("g/b", "2").unwrap();
        assert!(p.delete_entry("a").unwrap());
        assert!(!p.delete_entry("a").unwrap());
        assert!(!p.delete_entry("nowhere/x").unwrap());
        assert!(!p.group_exists("nowhere"));
        assert!(p.delete_entry("g/b").unwrap());
        p.set("c", "3").unwrap();
        p.clear().unwrap();
        assert_eq!(p.entries(), 0);
        assert_eq!(p.groups(), 0);
    }

    #[test]
    fn delete_all_entries_keeps_groups() {
        let p = prefs();
        p.set("a", "1").unwrap();
        p.group("child").unwrap();
        p.delete_all_entries().unwrap();
        assert_eq!(p.entries(), 0);
        assert_eq!(p.groups(), 1);
        p.delete_all_groups().unwrap();
        assert_eq!(p.groups(), 0);
    }

    #[test]
    fn ids_go_stale_after_remove() {
        let p = prefs();
        let window = p.group("Window").unwrap();
        let id = window.id();
        assert_eq!(p.from_id(id).unwrap().path(), "/Window");
        p.remove_id(id).unwrap();
        assert!(p.from_id(id).is_none());
        assert!(matches!(p.remove_id(id), Err(PrefsError::InvalidGroup(_))));
        assert!(matches!(p.remove_id(p.id()), Err(PrefsError::InvalidGroup(_))));
        assert!(matches!(window.set("w", "1"), Err(PrefsError::InvalidGroup(_))));
        // A new group with the same name gets a fresh id.
        assert_ne!(p.group("Window").unwrap().id(), id);
    }

    #[test]
    fn invalid_keys_are_rejected() {
        let p = prefs();
        assert!(matches!(p.set("", "v"), Err(PrefsError::InvalidKey(_))));
        assert!(matches!(p.set_int("g/", 1), Err(PrefsError::InvalidKey(_))));
        assert!(!p.group_exists("g"));
        assert_eq!(p.get("g/", "d"), "d");
    }

    #[test]
    fn size_is_stored_text_length() {
        let p = prefs();
        p.set("s", "hello").unwrap();
        p.set_bytes("b", &[1, 2, 3]).unwrap();
        assert_eq!(p.size("s"), 5);
        assert_eq!(p.size("b"), 6);
        assert_eq!(p.size("missing"), 0);
    }

    #[test]
    fn read_only_rejects_changes() {
        let p = OpenOptions::memory("Acme", "Widgets").read_only(true).open();
        assert!(p.is_read_only());
        assert!(matches!(p.set("a", "1"), Err(PrefsError::ReadOnly)));
        assert!(matches!(p.delete_entry("a"), Err(PrefsError::ReadOnly)));
        assert!(matches!(p.delete_group("g"), Err(PrefsError::ReadOnly)));
        assert!(matches!(p.clear(), Err(PrefsError::ReadOnly)));
        assert_eq!(p.entries(), 0);
    }

    #[test]
    fn memory_flush_needs_a_file() {
        let p = prefs();
        assert!(p.flush().is_ok());
        p.set("a", "1").unwrap();
        assert!(matches!(p.flush(), Err(PrefsError::NoFile)));
        assert!(p.is_dirty());
        assert_eq!(p.file_path(), None);
    }

    #[test]
    fn handles_share_one_database() {
        let p = prefs();
        let other = p.clone();
        let group = p.group("g").unwrap();
        other.set("g/k", "v").unwrap();
        assert_eq!(group.get("k", ""), "v");
        let worker = std::thread::spawn(move || group.set_int("n", 5));
        worker.join().unwrap().unwrap();
        assert_eq!(p.get_int("g/n", 0), 5);
    }

    proptest! {
        #[test]
        fn any_string_round_trips(value in any::<String>()) {
            let p = prefs();
            p.set("v", &value).unwrap();
            prop_assert_eq!(p.get("v", ""), value);
        }

        #[test]
        fn any_int_round_trips(value in any::<i64>()) {
            let p = prefs();
            p.set_int("v", value).unwrap();
            prop_assert_eq!(p.get_int("v", 0), value);
        }

        #[test]
        fn any_bytes_round_trip(value in proptest::collection::vec(any::<u8>(), 0..64)) {
            let p = prefs();
            p.set_bytes("v", &value).unwrap();
            prop_assert_eq!(p.get_bytes("v", b"x"), value);
        }
    }
}
