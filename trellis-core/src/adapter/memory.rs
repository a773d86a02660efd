//! In-memory node adapter.
//!
//! Keeps a plain node tree and counts purge calls. Handles are shared: clone
//! the adapter, give one clone to the [`crate::Renderer`] and keep the other
//! to inspect what the engine did.
//!
//! A purged node stays readable while it is still attached; it is dropped
//! from the tree, together with its subtree, once it is detached.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use serde_json::Value;

use super::{NodeAdapter, NodeHandle, TEXT_ATTR, TEXT_TAG};
use crate::element::Props;

#[derive(Debug, Clone)]
struct MemoryNode {
    tag: String,
    attrs: Props,
    children: Vec<NodeHandle>,
    parent: Option<NodeHandle>,
}

#[derive(Debug, Default)]
struct MemoryTree {
    next_handle: u64,
    nodes: HashMap<NodeHandle, MemoryNode>,
    /// Purged nodes still attached to a parent.
    purged: HashSet<NodeHandle>,
    purges: usize,
    patches: usize,
}

impl MemoryTree {
    fn alloc(&mut self, tag: &str, attrs: Props) -> NodeHandle {
        self.next_handle += 1;
        let handle = NodeHandle::from_raw(self.next_handle);
        self.nodes.insert(
            handle,
            MemoryNode {
                tag: tag.to_owned(),
                attrs,
                children: Vec::new(),
                parent: None,
            },
        );
        handle
    }

    fn detach(&mut self, handle: NodeHandle) -> Option<(NodeHandle, usize)> {
        let parent = self.nodes.get_mut(&handle)?.parent.take()?;
        let siblings = &mut self.nodes.get_mut(&parent)?.children;
        let index = siblings.iter().position(|child| *child == handle)?;
        siblings.remove(index);
        Some((parent, index))
    }

    /// Detach `handle`, dropping it if it was already purged.
    fn release(&mut self, handle: NodeHandle) -> Option<(NodeHandle, usize)> {
        let position = self.detach(handle);
        if self.purged.contains(&handle) {
            self.drop_subtree(handle);
        }
        position
    }

    fn drop_subtree(&mut self, handle: NodeHandle) {
        let mut stack = vec![handle];
        while let Some(current) = stack.pop() {
            self.purged.remove(&current);
            if let Some(node) = self.nodes.remove(&current) {
                stack.extend(node.children);
            }
        }
    }

    fn insert(&mut self, handle: NodeHandle, parent: NodeHandle, index: usize) {
        let Some(parent_node) = self.nodes.get_mut(&parent) else {
            return;
        };
        let index = index.min(parent_node.children.len());
        parent_node.children.insert(index, handle);
        if let Some(node) = self.nodes.get_mut(&handle) {
            node.parent = Some(parent);
        }
    }
}

/// Shared in-memory implementation of [`NodeAdapter`].
#[derive(Debug, Clone, Default)]
pub struct MemoryAdapter {
    tree: Rc<RefCell<MemoryTree>>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a container node to render roots into.
    pub fn create_container(&self) -> NodeHandle {
        self.tree.borrow_mut().alloc("#container", Props::new())
    }

    pub fn exists(&self, handle: NodeHandle) -> bool {
        self.tree.borrow().nodes.contains_key(&handle)
    }

    pub fn tag(&self, handle: NodeHandle) -> Option<String> {
        self.tree.borrow().nodes.get(&handle).map(|node| node.tag.clone())
    }

    pub fn attr(&self, handle: NodeHandle, name: &str) -> Option<Value> {
        self.tree
            .borrow()
            .nodes
            .get(&handle)
            .and_then(|node| node.attrs.get(name).cloned())
    }

    /// Set an attribute directly, bypassing the engine.
    pub fn set_attr(&self, handle: NodeHandle, name: &str, value: impl Into<Value>) {
        if let Some(node) = self.tree.borrow_mut().nodes.get_mut(&handle) {
            node.attrs.set(name, value);
        }
    }

    pub fn children(&self, handle: NodeHandle) -> Vec<NodeHandle> {
        self.tree
            .borrow()
            .nodes
            .get(&handle)
            .map(|node| node.children.clone())
            .unwrap_or_default()
    }

    pub fn parent(&self, handle: NodeHandle) -> Option<NodeHandle> {
        self.tree.borrow().nodes.get(&handle).and_then(|node| node.parent)
    }

    /// Concatenated text of `handle` and its descendants.
    pub fn text_content(&self, handle: NodeHandle) -> String {
        let tree = self.tree.borrow();
        let mut out = String::new();
        let mut stack = vec![handle];
        while let Some(current) = stack.pop() {
            let Some(node) = tree.nodes.get(&current) else {
                continue;
            };
            if node.tag == TEXT_TAG {
                if let Some(Value::String(text)) = node.attrs.get(TEXT_ATTR) {
                    out.push_str(text);
                }
            }
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    /// Number of `purge_cache` calls so far.
    pub fn purge_count(&self) -> usize {
        self.tree.borrow().purges
    }

    pub fn is_purged(&self, handle: NodeHandle) -> bool {
        let tree = self.tree.borrow();
        tree.purged.contains(&handle)
            || (handle.raw() <= tree.next_handle && !tree.nodes.contains_key(&handle))
    }

    /// Number of nodes still held, containers included.
    pub fn node_count(&self) -> usize {
        self.tree.borrow().nodes.len()
    }

    /// Number of `patch_node` calls so far.
    pub fn patch_count(&self) -> usize {
        self.tree.borrow().patches
    }
}

impl NodeAdapter for MemoryAdapter {
    fn create_node(&mut self, tag: &str, attrs: &Props) -> NodeHandle {
        let handle = self.tree.borrow_mut().alloc(tag, attrs.clone());
        tracing::trace!(handle = handle.raw(), tag, "create node");
        handle
    }

    fn mount_node(&mut self, handle: NodeHandle, parent: NodeHandle) {
        let mut tree = self.tree.borrow_mut();
        tree.detach(handle);
        tree.insert(handle, parent, usize::MAX);
    }

    fn unmount_node(&mut self, handle: NodeHandle) {
        self.tree.borrow_mut().release(handle);
    }

    fn patch_node(&mut self, handle: NodeHandle, old: &Props, new: &Props) {
        let mut tree = self.tree.borrow_mut();
        tree.patches += 1;
        let Some(node) = tree.nodes.get_mut(&handle) else {
            return;
        };
        for (key, _) in old.iter() {
            if !new.contains(key) {
                node.attrs.remove(key);
            }
        }
        for (key, value) in new.iter() {
            if old.get(key) != Some(value) {
                node.attrs.set(key, value.clone());
            }
        }
    }

    fn purge_cache(&mut self, handle: NodeHandle) {
        tracing::trace!(handle = handle.raw(), "purge node cache");
        let mut tree = self.tree.borrow_mut();
        tree.purges += 1;
        let attached = match tree.nodes.get(&handle) {
            Some(node) => node.parent.is_some(),
            None => return,
        };
        if attached {
            tree.purged.insert(handle);
        } else {
            tree.drop_subtree(handle);
        }
    }

    fn move_node(&mut self, handle: NodeHandle, parent: NodeHandle, index: usize) {
        let mut tree = self.tree.borrow_mut();
        let in_place = tree
            .nodes
            .get(&parent)
            .and_then(|node| node.children.get(index))
            .is_some_and(|child| *child == handle);
        if in_place {
            return;
        }
        tracing::trace!(handle = handle.raw(), parent = parent.raw(), index, "move node");
        tree.detach(handle);
        tree.insert(handle, parent, index);
    }

    fn replace_node(&mut self, old: NodeHandle, new: NodeHandle) {
        let mut tree = self.tree.borrow_mut();
        tree.detach(new);
        if let Some((parent, index)) = tree.release(old) {
            tree.insert(new, parent, index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(adapter: &mut MemoryAdapter, content: &str) -> NodeHandle {
        adapter.create_node(TEXT_TAG, &Props::new().with(TEXT_ATTR, content))
    }

    #[test]
    fn builds_and_reads_tree() {
        let mut adapter = MemoryAdapter::new();
        let container = adapter.create_container();
        let div = adapter.create_node("div", &Props::new());
        let a = text(&mut adapter, "A");
        let b = text(&mut adapter, "B");

        adapter.mount_node(a, div);
        adapter.mount_node(b, div);
        adapter.mount_node(div, container);

        assert_eq!(adapter.children(container), vec![div]);
        assert_eq!(adapter.text_content(container), "AB");
        assert_eq!(adapter.parent(a), Some(div));
    }

    #[test]
    fn move_and_replace_keep_positions() {
        let mut adapter = MemoryAdapter::new();
        let div = adapter.create_node("div", &Props::new());
        let a = text(&mut adapter, "A");
        let b = text(&mut adapter, "B");
        let c = text(&mut adapter, "C");
        adapter.mount_node(a, div);
        adapter.mount_node(b, div);

        adapter.move_node(b, div, 0);
        assert_eq!(adapter.text_content(div), "BA");

        adapter.replace_node(b, c);
        assert_eq!(adapter.text_content(div), "CA");
        assert!(adapter.parent(b).is_none());
    }

    #[test]
    fn patch_applies_difference() {
        let mut adapter = MemoryAdapter::new();
        let old = Props::new().with("className", "x").with("title", "t");
        let node = adapter.create_node("a", &old);
        adapter.set_attr(node, "id", "kept");

        adapter.patch_node(node, &old, &Props::new().with("className", ""));

        assert_eq!(adapter.attr(node, "className"), Some(Value::from("")));
        assert_eq!(adapter.attr(node, "title"), None);
        assert_eq!(adapter.attr(node, "id"), Some(Value::from("kept")));
        assert_eq!(adapter.patch_count(), 1);
    }

    #[test]
    fn purged_nodes_are_dropped_once_detached() {
        let mut adapter = MemoryAdapter::new();
        let container = adapter.create_container();
        let div = adapter.create_node("div", &Props::new());
        let a = text(&mut adapter, "A");
        adapter.mount_node(a, div);
        adapter.mount_node(div, container);
        assert_eq!(adapter.node_count(), 3);

        adapter.purge_cache(a);
        assert!(adapter.is_purged(a));
        assert_eq!(adapter.text_content(div), "A");

        adapter.unmount_node(div);
        adapter.purge_cache(div);

        assert_eq!(adapter.node_count(), 1);
        assert_eq!(adapter.purge_count(), 2);
        assert!(adapter.is_purged(div));
        assert!(!adapter.is_purged(container));
    }

    #[test]
    fn replaced_purged_node_is_dropped() {
        let mut adapter = MemoryAdapter::new();
        let div = adapter.create_node("div", &Props::new());
        let old = text(&mut adapter, "old");
        let new = text(&mut adapter, "new");
        adapter.mount_node(old, div);

        adapter.purge_cache(old);
        adapter.replace_node(old, new);

        assert_eq!(adapter.children(div), vec![new]);
        assert!(!adapter.exists(old));
    }
}
