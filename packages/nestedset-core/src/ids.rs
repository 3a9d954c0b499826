#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Left or right boundary of a node interval.
pub type Key = i64;

/// Depth of a node below the root (root = 0).
pub type Level = i64;

/// Store-assigned surrogate identifier of a node row.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct NodeId(pub i64);

impl NodeId {
    pub fn get(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Left key of the root node.
pub const ROOT_LEFT: Key = 1;
