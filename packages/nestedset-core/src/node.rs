use crate::ids::{Key, Level, NodeId, ROOT_LEFT};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A persisted tree node: its interval, its depth and its payload.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Node {
    pub id: NodeId,
    pub left: Key,
    pub right: Key,
    pub level: Level,
    pub value: String,
}

impl Node {
    pub fn new(id: NodeId, left: Key, right: Key, level: Level, value: impl Into<String>) -> Self {
        Self {
            id,
            left,
            right,
            level,
            value: value.into(),
        }
    }

    /// Number of keys occupied by this node and its subtree (`right - left + 1`).
    pub fn width(&self) -> Key {
        self.right - self.left + 1
    }

    pub fn descendant_count(&self) -> Key {
        (self.right - self.left - 1) / 2
    }

    pub fn is_leaf(&self) -> bool {
        self.right - self.left == 1
    }

    pub fn is_root(&self) -> bool {
        self.left == ROOT_LEFT
    }

    /// Strict interval containment: `self` is an ancestor of `other`.
    pub fn contains(&self, other: &Node) -> bool {
        self.left < other.left && self.right > other.right
    }

    pub fn same_interval(&self, other: &Node) -> bool {
        self.left == other.left && self.right == other.right
    }
}
