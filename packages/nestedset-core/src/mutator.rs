//! Structural mutations of the nested-set table.
//!
//! Each operation runs inside exactly one transaction on the given store. Nodes handed in by
//! the caller are only used for their id: keys are re-read inside the transaction, so a
//! stale copy (e.g. a parent whose right key moved after an earlier insert) is harmless.

use tracing::debug;

use crate::error::{Error, Result};
use crate::ids::NodeId;
use crate::node::Node;
use crate::predicate::KeyPredicate;
use crate::traits::{with_transaction, Repository, Store};

fn fresh<R: Repository + ?Sized>(repo: &mut R, id: NodeId) -> Result<Node> {
    repo.fetch_by_id(id)?
        .ok_or_else(|| Error::NotFound(format!("node {id} does not exist")))
}

/// Close the gap left by the subtree `[left, right]` once its rows are gone (deleted or
/// parked): ancestors shrink, everything positioned after it slides left.
fn close_gap<R: Repository + ?Sized>(repo: &mut R, removed: &Node) -> Result<()> {
    let width = removed.width();
    repo.shift_keys_where(
        KeyPredicate::Encloses {
            left: removed.left,
            right: removed.right,
        },
        0,
        -width,
    )?;
    repo.shift_keys_where(KeyPredicate::LeftAbove(removed.right), -width, -width)?;
    Ok(())
}

/// Insert `value` as the rightmost child of `parent`.
pub fn insert_child<S: Store + ?Sized>(store: &mut S, parent: &Node, value: &str) -> Result<Node> {
    with_transaction(store, |s| {
        let parent = fresh(s, parent.id)?;
        let insert_at = parent.right;

        s.shift_keys_where(KeyPredicate::LeftAbove(insert_at), 2, 2)?;
        s.shift_keys_where(KeyPredicate::Spans(insert_at), 0, 2)?;

        let level = parent.level + 1;
        let id = s.insert(insert_at, insert_at + 1, level, value)?;
        debug!(parent = %parent.id, node = %id, left = insert_at, "inserted child");
        Ok(Node::new(id, insert_at, insert_at + 1, level, value))
    })
}

/// Delete `node` together with its whole subtree.
pub fn delete_node<S: Store + ?Sized>(store: &mut S, node: &Node) -> Result<()> {
    with_transaction(store, |s| {
        let node = fresh(s, node.id)?;
        if s.fetch_containing_ancestor(node.left, node.right)?.is_none() {
            return Err(Error::InvalidOperation("the root node cannot be deleted".into()));
        }

        let deleted = s.delete_where(KeyPredicate::Within {
            left: node.left,
            right: node.right,
        })?;
        close_gap(s, &node)?;
        debug!(node = %node.id, width = node.width(), deleted, "deleted subtree");
        Ok(())
    })
}

/// Move `node` and its subtree under `new_parent`, as its rightmost child.
///
/// Moving a node onto itself or onto its current parent changes nothing. Moving the root, or
/// moving a node below one of its own descendants, fails with `InvalidOperation` before any
/// row is touched.
pub fn move_node<S: Store + ?Sized>(store: &mut S, node: &Node, new_parent: &Node) -> Result<()> {
    if node.id == new_parent.id {
        return Ok(());
    }

    with_transaction(store, |s| {
        let node = fresh(s, node.id)?;
        let target = fresh(s, new_parent.id)?;

        if node.contains(&target) {
            return Err(Error::InvalidOperation(format!(
                "cannot move {} below its own descendant {}",
                node.id, target.id
            )));
        }
        let Some(current_parent) = s.fetch_containing_ancestor(node.left, node.right)? else {
            return Err(Error::InvalidOperation("the root node cannot be moved".into()));
        };
        if current_parent.id == target.id {
            return Ok(());
        }

        let width = node.width();
        s.park_where(KeyPredicate::Within {
            left: node.left,
            right: node.right,
        })?;
        close_gap(s, &node)?;

        let target = fresh(s, target.id)?;
        let boundary = target.right;
        s.shift_keys_where(KeyPredicate::RightAtLeast(boundary), 0, width)?;
        s.shift_keys_where(KeyPredicate::LeftAbove(boundary), width, 0)?;

        let level_delta = target.level + 1 - node.level;
        let moved = s.unpark(boundary - node.left, level_delta)?;
        debug!(
            node = %node.id,
            new_parent = %target.id,
            width,
            boundary,
            moved,
            "moved subtree"
        );
        Ok(())
    })
}

/// Replace the value of `node`; keys and level are untouched.
pub fn rename_node<S: Store + ?Sized>(store: &mut S, node: &Node, value: &str) -> Result<()> {
    with_transaction(store, |s| {
        if s.update_value(node.id, value)? == 0 {
            return Err(Error::NotFound(format!("node {} does not exist", node.id)));
        }
        debug!(node = %node.id, "renamed node");
        Ok(())
    })
}
