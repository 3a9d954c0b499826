use tracing::debug;

use crate::consistency::{self, ConsistencyReport};
use crate::error::{Error, Result};
use crate::ids::{NodeId, ROOT_LEFT};
use crate::mutator;
use crate::node::Node;
use crate::predicate::KeyPredicate;
use crate::traits::{with_transaction, Store};

/// Nested-set tree facade over a transactional store.
///
/// The only in-process state is a cached copy of the root row. It is filled lazily, dropped
/// after every mutation and can be dropped explicitly with `invalidate_root`.
pub struct NestedSetTree<S: Store> {
    store: S,
    root: Option<Node>,
}

impl<S: Store> NestedSetTree<S> {
    pub fn new(store: S) -> Self {
        Self { store, root: None }
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn invalidate_root(&mut self) {
        self.root = None;
    }

    /// Whether a root exists. A successful lookup is cached.
    pub fn is_populated(&mut self) -> Result<bool> {
        if self.root.is_some() {
            return Ok(true);
        }
        self.root = self.store.fetch_root()?;
        Ok(self.root.is_some())
    }

    /// Create the root node. Returns the existing root when the tree is already planted.
    pub fn plant(&mut self, value: &str) -> Result<Node> {
        if self.is_populated()? {
            return self.root();
        }
        let id = with_transaction(&mut self.store, |s| s.insert(ROOT_LEFT, ROOT_LEFT + 1, 0, value))?;
        let root = Node::new(id, ROOT_LEFT, ROOT_LEFT + 1, 0, value);
        debug!(node = %id, value, "planted root");
        self.root = Some(root.clone());
        Ok(root)
    }

    pub fn root(&mut self) -> Result<Node> {
        if let Some(root) = &self.root {
            return Ok(root.clone());
        }
        let root = self
            .store
            .fetch_root()?
            .ok_or_else(|| Error::NotFound("tree has no root".into()))?;
        self.root = Some(root.clone());
        Ok(root)
    }

    /// Every node, ordered by left key.
    pub fn all_nodes(&mut self) -> Result<Vec<Node>> {
        self.store.fetch_all()
    }

    pub fn node(&mut self, id: NodeId) -> Result<Node> {
        self.store
            .fetch_by_id(id)?
            .ok_or_else(|| Error::NotFound(format!("node {id} does not exist")))
    }

    /// First node (by left key) carrying `value`.
    pub fn node_by_value(&mut self, value: &str) -> Result<Node> {
        self.store
            .fetch_by_value(value)?
            .ok_or_else(|| Error::NotFound(format!("no node with value {value:?}")))
    }

    /// Parent of `node`. `NotFound` for the root as well as for a detached node, so callers
    /// that care must tell the two apart themselves.
    pub fn parent(&mut self, node: &Node) -> Result<Node> {
        self.store
            .fetch_containing_ancestor(node.left, node.right)?
            .ok_or_else(|| Error::NotFound(format!("node {} has no parent", node.id)))
    }

    /// Path from the root down to the parent of `node`.
    pub fn ancestors(&mut self, node: &Node) -> Result<Vec<Node>> {
        self.store.fetch_where(KeyPredicate::Encloses {
            left: node.left,
            right: node.right,
        })
    }

    /// Strict descendants of `node` in pre-order.
    pub fn descendants(&mut self, node: &Node) -> Result<Vec<Node>> {
        let mut nodes = self.store.fetch_where(KeyPredicate::Within {
            left: node.left,
            right: node.right,
        })?;
        nodes.retain(|n| n.id != node.id);
        Ok(nodes)
    }

    pub fn children(&mut self, node: &Node) -> Result<Vec<Node>> {
        let mut nodes = self.descendants(node)?;
        nodes.retain(|n| n.level == node.level + 1);
        Ok(nodes)
    }

    /// Keys of `parent` held by the caller are stale afterwards; re-read it with `node`.
    pub fn insert_child(&mut self, parent: &Node, value: &str) -> Result<Node> {
        let res = mutator::insert_child(&mut self.store, parent, value);
        self.invalidate_root();
        res
    }

    pub fn delete_node(&mut self, node: &Node) -> Result<()> {
        let res = mutator::delete_node(&mut self.store, node);
        self.invalidate_root();
        res
    }

    pub fn move_node(&mut self, node: &Node, new_parent: &Node) -> Result<()> {
        let res = mutator::move_node(&mut self.store, node, new_parent);
        self.invalidate_root();
        res
    }

    pub fn rename_node(&mut self, node: &Node, value: &str) -> Result<()> {
        let res = mutator::rename_node(&mut self.store, node, value);
        self.invalidate_root();
        res
    }

    pub fn check_consistency(&mut self) -> Result<ConsistencyReport> {
        Ok(consistency::check_consistency(&self.store.fetch_all()?))
    }

    pub fn validate_invariants(&mut self) -> Result<()> {
        consistency::validate_invariants(&self.store.fetch_all()?)
    }

    /// Dump every node as a debug event, in key order.
    pub fn log_snapshot(&mut self) -> Result<()> {
        for n in self.store.fetch_all()? {
            debug!(
                node = %n.id,
                left = n.left,
                right = n.right,
                level = n.level,
                value = %n.value,
                "tree node"
            );
        }
        Ok(())
    }
}
