//! Arena of [`Node`]s forming one preferences tree.
//!
//! Nodes refer to each other by [`NodeId`]. An id carries the generation of
//! its slot, so an id of a removed group never resolves again, even after
//! the slot is reused.

use std::collections::BTreeMap;
use std::io::{self, Write};

use prefstore_format::line;

use crate::node::{INDEX_THRESHOLD, Node};

/// Stable handle to a node in a [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    slot: u32,
    generation: u32,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// A preferences tree: a root group and everything below it.
#[derive(Debug)]
pub struct Tree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
}

impl Tree {
    /// A tree holding only an empty root group.
    pub fn new() -> Self {
        let mut tree = Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId {
                slot: 0,
                generation: 0,
            },
        };
        tree.root = tree.alloc(Node::new("", None));
        tree
    }

    /// The root group.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live groups, root included.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.node.is_some()).count()
    }

    /// Always false: the root cannot be removed.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether `id` still refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Borrow a node.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        let slot = self.slots.get(id.slot as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_ref()
    }

    /// Mutably borrow a node.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let slot = self.slots.get_mut(id.slot as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_mut()
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        if let Some(slot) = self.free.pop() {
            let entry = &mut self.slots[slot as usize];
            entry.node = Some(node);
            return NodeId {
                slot,
                generation: entry.generation,
            };
        }
        let slot = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId {
            slot,
            generation: 0,
        }
    }

    /// Names from the root down to `id`, root excluded.
    pub fn segments(&self, id: NodeId) -> Option<Vec<String>> {
        let mut names = Vec::new();
        let mut current = self.node(id)?;
        while let Some(parent) = current.parent() {
            names.push(current.name().to_string());
            current = self.node(parent)?;
        }
        names.reverse();
        Some(names)
    }

    /// Full slash path of `id`; the root is `/`.
    pub fn path(&self, id: NodeId) -> Option<String> {
        Some(format!("/{}", self.segments(id)?.join("/")))
    }

    /// Child of `parent` called `name`, without creating it.
    pub fn child_by_name(&mut self, parent: NodeId, name: &str) -> Option<NodeId> {
        let node = self.node(parent)?;
        if node.children.len() < INDEX_THRESHOLD {
            return node
                .children
                .iter()
                .copied()
                .find(|c| self.node(*c).is_some_and(|n| n.name() == name));
        }
        if node.child_index.is_none() {
            let index: BTreeMap<String, NodeId> = node
                .children
                .iter()
                .filter_map(|c| self.node(*c).map(|n| (n.name().to_string(), *c)))
                .collect();
            self.node_mut(parent)?.child_index = Some(index);
        }
        self.node(parent)?.child_index.as_ref()?.get(name).copied()
    }

    /// Child of `parent` called `name`, created if missing. A new child
    /// makes the parent dirty.
    pub fn add_child(&mut self, parent: NodeId, name: &str) -> Option<NodeId> {
        if name.is_empty() {
            return None;
        }
        if let Some(existing) = self.child_by_name(parent, name) {
            return Some(existing);
        }
        // Check before allocating so a stale parent leaks nothing.
        self.node(parent)?;
        let child = self.alloc(Node::new(name, Some(parent)));
        let node = self.node_mut(parent)?;
        node.children.push(child);
        node.child_index = None;
        node.mark_dirty();
        Some(child)
    }

    /// Resolve `path` from `from`, creating missing groups.
    ///
    /// A leading `/` starts at the root. Empty and `.` segments are ignored;
    /// `..` moves to the parent (and stays put at the root).
    pub fn find(&mut self, from: NodeId, path: &str) -> Option<NodeId> {
        self.walk(from, path, true)
    }

    /// Resolve `path[offset..]` from `from` without creating anything.
    pub fn search(&mut self, from: NodeId, path: &str, offset: usize) -> Option<NodeId> {
        self.walk(from, path.get(offset..)?, false)
    }

    fn walk(&mut self, from: NodeId, path: &str, create: bool) -> Option<NodeId> {
        let mut current = if path.starts_with('/') { self.root } else { from };
        self.node(current)?;
        for segment in path.split('/') {
            current = match segment {
                "" | "." => current,
                ".." => self.node(current)?.parent().unwrap_or(current),
                name if create => self.add_child(current, name)?,
                name => self.child_by_name(current, name)?,
            };
        }
        Some(current)
    }

    /// Walk literal segments from the root, creating missing groups. Used by
    /// the file reader, where `.` and `..` are ordinary names.
    pub(crate) fn find_segments(&mut self, segments: &[String]) -> NodeId {
        let mut current = self.root;
        for segment in segments {
            match self.add_child(current, segment) {
                Some(child) => current = child,
                None => break,
            }
        }
        current
    }

    /// Number of children of `parent`.
    pub fn n_children(&self, parent: NodeId) -> usize {
        self.node(parent).map_or(0, Node::n_children)
    }

    /// Child of `parent` by ordinal position.
    pub fn child_node(&self, parent: NodeId, ix: usize) -> Option<NodeId> {
        self.node(parent)?.child_node(ix)
    }

    /// Name of the child of `parent` at ordinal position `ix`.
    pub fn child(&self, parent: NodeId, ix: usize) -> Option<&str> {
        let child = self.child_node(parent, ix)?;
        self.node(child).map(Node::name)
    }

    /// Detach `id` from its parent and free its whole subtree. The parent
    /// becomes dirty. The root cannot be removed.
    pub fn remove(&mut self, id: NodeId) -> bool {
        let Some(parent) = self.node(id).and_then(Node::parent) else {
            return false;
        };
        if let Some(node) = self.node_mut(parent) {
            node.children.retain(|c| *c != id);
            node.child_index = None;
            node.mark_dirty();
        }
        self.free_subtree(id);
        true
    }

    /// Remove every child group of `id`. Returns false for a stale id.
    pub fn delete_all_children(&mut self, id: NodeId) -> bool {
        let Some(node) = self.node_mut(id) else {
            return false;
        };
        let children = std::mem::take(&mut node.children);
        node.child_index = None;
        if !children.is_empty() {
            node.mark_dirty();
        }
        for child in children {
            self.free_subtree(child);
        }
        true
    }

    fn free_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            let Some(slot) = self.slots.get_mut(id.slot as usize) else {
                continue;
            };
            if slot.generation != id.generation {
                continue;
            }
            if let Some(node) = slot.node.take() {
                stack.extend(node.children);
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(id.slot);
            }
        }
    }

    /// Whether any node changed since the last successful write.
    pub fn is_dirty(&self) -> bool {
        self.slots
            .iter()
            .filter_map(|s| s.node.as_ref())
            .any(Node::is_dirty)
    }

    /// Mark every node clean.
    pub fn clear_dirty_flags(&mut self) {
        for node in self.slots.iter_mut().filter_map(|s| s.node.as_mut()) {
            node.clear_dirty();
        }
    }

    /// Serialize the whole tree.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from `out`.
    pub fn write<W: Write>(&self, out: &mut W) -> io::Result<()> {
        self.write_node(self.root, out)
    }

    /// Serialize `id`'s entries and comments, then its children depth first.
    ///
    /// Every group except the root gets a `[path]` header, even when empty.
    /// The one exception is a group with nothing of its own but child groups:
    /// its header is implied by its children's headers and is left out.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from `out`.
    pub fn write_node<W: Write>(&self, id: NodeId, out: &mut W) -> io::Result<()> {
        let (Some(node), Some(mut path)) = (self.node(id), self.segments(id)) else {
            return Ok(());
        };
        write_body(node, id == self.root, &path, out)?;

        // Explicit stack: nesting depth comes from the file and is unbounded.
        let mut stack: Vec<(NodeId, usize)> = Vec::new();
        let depth = path.len() + 1;
        stack.extend(node.children().iter().rev().map(|c| (*c, depth)));
        while let Some((id, depth)) = stack.pop() {
            let Some(node) = self.node(id) else {
                continue;
            };
            path.truncate(depth - 1);
            path.push(node.name().to_string());
            write_body(node, false, &path, out)?;
            stack.extend(node.children().iter().rev().map(|c| (*c, depth + 1)));
        }
        Ok(())
    }
}

fn write_body<W: Write>(
    node: &Node,
    is_root: bool,
    path: &[String],
    out: &mut W,
) -> io::Result<()> {
    let implied =
        node.n_entries() == 0 && node.trailing_comments().is_empty() && node.n_children() > 0;
    if !is_root && !implied {
        writeln!(out)?;
        line::write_group(out, path)?;
    }
    for entry in node.entries() {
        for comment in entry.comments() {
            line::write_comment(out, comment)?;
        }
        line::write_entry(out, entry.name(), entry.value())?;
    }
    for comment in node.trailing_comments() {
        line::write_comment(out, comment)?;
    }
    Ok(())
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(tree: &Tree) -> String {
        let mut out = Vec::new();
        tree.write(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn find_creates_and_search_does_not() {
        let mut tree = Tree::new();
        let root = tree.root();
        assert_eq!(tree.search(root, "a/b", 0), None);
        assert_eq!(tree.len(), 1);

        let b = tree.find(root, "a/b").unwrap();
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.search(root, "a/b", 0), Some(b));
        assert_eq!(tree.search(root, "/a//b/", 0), Some(b));
        assert_eq!(tree.path(b).as_deref(), Some("/a/b"));
        assert_eq!(tree.path(root).as_deref(), Some("/"));
    }

    #[test]
    fn search_offset_skips_prefix() {
        let mut tree = Tree::new();
        let root = tree.root();
        let b = tree.find(root, "a/b").unwrap();
        let a = tree.search(root, "a", 0).unwrap();
        assert_eq!(tree.search(a, "a/b", 2), Some(b));
        assert_eq!(tree.search(a, "a/b", 99), None);
    }

    #[test]
    fn relative_and_dot_segments() {
        let mut tree = Tree::new();
        let root = tree.root();
        let a = tree.find(root, "a").unwrap();
        let c = tree.find(a, "./b/../c").unwrap();
        assert_eq!(tree.path(c).as_deref(), Some("/a/c"));
        assert_eq!(tree.search(root, "..", 0), Some(root));
        assert_eq!(tree.search(c, "/a", 0), Some(a));
    }

    #[test]
    fn names_are_case_sensitive() {
        let mut tree = Tree::new();
        let root = tree.root();
        tree.find(root, "Window").unwrap();
        assert_eq!(tree.search(root, "window", 0), None);
    }

    #[test]
    fn children_keep_insertion_order_past_threshold() {
        let mut tree = Tree::new();
        let root = tree.root();
        let names: Vec<String> = (0..INDEX_THRESHOLD * 2)
            .map(|i| format!("g{}", INDEX_THRESHOLD * 2 - i))
            .collect();
        for name in &names {
            tree.add_child(root, name).unwrap();
        }
        // Build the index, then check ordinals.
        assert!(tree.child_by_name(root, &names[3]).is_some());
        assert!(tree.node(root).unwrap().child_index.is_some());
        for (i, name) in names.iter().enumerate() {
            assert_eq!(tree.child(root, i), Some(name.as_str()));
        }
        assert_eq!(tree.n_children(root), names.len());
    }

    #[test]
    fn remove_frees_subtree_and_invalidates_ids() {
        let mut tree = Tree::new();
        let root = tree.root();
        let a = tree.find(root, "a").unwrap();
        let deep = tree.find(root, "a/b/c").unwrap();
        tree.clear_dirty_flags();

        assert!(tree.remove(a));
        assert!(tree.is_dirty());
        assert!(!tree.contains(a));
        assert!(!tree.contains(deep));
        assert_eq!(tree.search(root, "a/b/c", 0), None);
        assert_eq!(tree.len(), 1);

        // Reused slots do not resurrect old ids.
        let x = tree.find(root, "x/y/z").unwrap();
        assert!(tree.contains(x));
        assert!(!tree.contains(a));
        assert!(!tree.contains(deep));
    }

    #[test]
    fn root_cannot_be_removed() {
        let mut tree = Tree::new();
        let root = tree.root();
        assert!(!tree.remove(root));
        assert!(tree.contains(root));
    }

    #[test]
    fn delete_all_children_keeps_entries() {
        let mut tree = Tree::new();
        let root = tree.root();
        tree.node_mut(root).unwrap().set("k", "v");
        tree.find(root, "a/b").unwrap();
        assert!(tree.delete_all_children(root));
        assert_eq!(tree.n_children(root), 0);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.node_mut(root).unwrap().get("k"), Some("v"));
    }

    #[test]
    fn writes_preorder_with_headers() {
        let mut tree = Tree::new();
        let root = tree.root();
        tree.node_mut(root).unwrap().set("top", "1");
        let window = tree.find(root, "Window").unwrap();
        tree.node_mut(window).unwrap().set("width", "800");
        tree.find(root, "Window/Empty").unwrap();
        tree.find(root, "Other").unwrap();

        assert_eq!(
            render(&tree),
            "top=1\n\n[Window]\nwidth=800\n\n[Window/Empty]\n\n[Other]\n"
        );
    }

    #[test]
    fn bare_parent_headers_are_implied() {
        let mut tree = Tree::new();
        let root = tree.root();
        let leaf = tree.find(root, "a/b/c").unwrap();
        tree.node_mut(leaf).unwrap().set("k", "v");
        tree.find(root, "a/b/d").unwrap();
        assert_eq!(render(&tree), "\n[a/b/c]\nk=v\n\n[a/b/d]\n");
    }

    #[test]
    fn deep_nesting_writes_without_recursion() {
        let depth = 50_000;
        let mut tree = Tree::new();
        let segments = vec!["a".to_string(); depth];
        let leaf = tree.find_segments(&segments);
        tree.node_mut(leaf).unwrap().set("k", "v");
        let root = tree.root();
        tree.node_mut(root).unwrap().set("top", "1");

        let text = render(&tree);
        let headers: Vec<&str> = text.lines().filter(|l| l.starts_with('[')).collect();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers[0].len(), depth * 2 + 1);
        assert!(text.starts_with("top=1\n"));
        assert!(text.ends_with("]\nk=v\n"));
    }
}
