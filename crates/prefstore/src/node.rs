//! One group of the preferences tree.
//!
//! A [`Node`] owns its entries and the comment lines around them. Child
//! groups live in the [`Tree`](crate::tree::Tree) arena; the node only keeps
//! their ids, in insertion order.

use std::collections::BTreeMap;

use crate::tree::NodeId;

/// Number of entries or children at which lookups switch from a linear
/// scan to a name-sorted index.
pub const INDEX_THRESHOLD: usize = 16;

/// A name/value pair, plus the comment lines that preceded it in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    name: String,
    value: String,
    comments: Vec<String>,
}

impl Entry {
    /// Create an entry without comments.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            comments: Vec::new(),
        }
    }

    /// Entry name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw stored text.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Comment lines written immediately before this entry.
    pub fn comments(&self) -> &[String] {
        &self.comments
    }
}

/// One group level.
#[derive(Debug)]
pub struct Node {
    name: String,
    parent: Option<NodeId>,
    entries: Vec<Entry>,
    trailing_comments: Vec<String>,
    pub(crate) children: Vec<NodeId>,
    dirty: bool,
    entry_index: Option<BTreeMap<String, usize>>,
    pub(crate) child_index: Option<BTreeMap<String, NodeId>>,
}

impl Node {
    /// Create an empty, clean node.
    pub fn new(name: impl Into<String>, parent: Option<NodeId>) -> Self {
        Self {
            name: name.into(),
            parent,
            entries: Vec::new(),
            trailing_comments: Vec::new(),
            children: Vec::new(),
            dirty: false,
            entry_index: None,
            child_index: None,
        }
    }

    /// Last path segment. Empty for the root.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent group, None for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Whether this node changed since the last successful write.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Number of entries. Comments are not counted.
    pub fn n_entries(&self) -> usize {
        self.entries.len()
    }

    /// Entry by ordinal position (file/insertion order).
    pub fn entry(&self, ix: usize) -> Option<&Entry> {
        self.entries.get(ix)
    }

    /// All entries in order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Comment lines after the last entry.
    pub fn trailing_comments(&self) -> &[String] {
        &self.trailing_comments
    }

    /// Ordinal position of the entry called `name`.
    pub fn entry_index(&mut self, name: &str) -> Option<usize> {
        if self.entries.len() < INDEX_THRESHOLD {
            return self.entries.iter().position(|e| e.name == name);
        }
        self.entry_index
            .get_or_insert_with(|| {
                // Later duplicates never shadow the first occurrence.
                let mut index = BTreeMap::new();
                for (i, e) in self.entries.iter().enumerate() {
                    index.entry(e.name.clone()).or_insert(i);
                }
                index
            })
            .get(name)
            .copied()
    }

    /// Raw text of the entry called `name`.
    pub fn get(&mut self, name: &str) -> Option<&str> {
        let ix = self.entry_index(name)?;
        Some(self.entries[ix].value.as_str())
    }

    /// Insert or overwrite an entry. The node becomes dirty only if
    /// something actually changed. Returns the entry's position.
    pub fn set(&mut self, name: &str, value: &str) -> usize {
        if let Some(ix) = self.entry_index(name) {
            if self.entries[ix].value != value {
                self.entries[ix].value = value.to_string();
                self.dirty = true;
            }
            return ix;
        }
        self.entries.push(Entry::new(name, value));
        self.entry_index = None;
        self.dirty = true;
        self.entries.len() - 1
    }

    /// Delete the entry called `name` together with its leading comments.
    /// Returns whether it existed.
    pub fn delete_entry(&mut self, name: &str) -> bool {
        let Some(ix) = self.entry_index(name) else {
            return false;
        };
        self.entries.remove(ix);
        self.entry_index = None;
        self.dirty = true;
        true
    }

    /// Delete every entry and the comments attached to them. The node itself
    /// and its children stay.
    pub fn delete_all_entries(&mut self) {
        if !self.entries.is_empty() {
            self.entries.clear();
            self.entry_index = None;
            self.dirty = true;
        }
    }

    /// Attach comment lines read from a file. Comments go in front of the
    /// next entry added with [`Node::add_parsed`], or to the end of the node.
    pub(crate) fn push_trailing_comments(&mut self, comments: &mut Vec<String>) {
        self.trailing_comments.append(comments);
    }

    /// Add an entry read from a file, with the comments that preceded it.
    /// Returns the entry's position. Loading does not make a node dirty.
    pub(crate) fn add_parsed(
        &mut self,
        name: &str,
        value: String,
        comments: &mut Vec<String>,
    ) -> usize {
        // Comments that were pending at the end of the node now lead this entry.
        let mut leading = std::mem::take(&mut self.trailing_comments);
        leading.append(comments);

        if let Some(ix) = self.entry_index(name) {
            let entry = &mut self.entries[ix];
            entry.value = value;
            entry.comments.append(&mut leading);
            return ix;
        }
        self.entries.push(Entry {
            name: name.to_string(),
            value,
            comments: leading,
        });
        self.entry_index = None;
        self.entries.len() - 1
    }

    /// Append a continuation chunk to the value of entry `ix`.
    pub(crate) fn append_value(&mut self, ix: usize, chunk: &str) -> bool {
        match self.entries.get_mut(ix) {
            Some(entry) => {
                entry.value.push_str(chunk);
                true
            }
            None => false,
        }
    }

    /// Number of child groups.
    pub fn n_children(&self) -> usize {
        self.children.len()
    }

    /// Child id by ordinal position (insertion order).
    pub fn child_node(&self, ix: usize) -> Option<NodeId> {
        self.children.get(ix).copied()
    }

    /// All child ids in insertion order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}
