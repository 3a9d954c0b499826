use crate::error::{Error, Result};
use crate::ids::{Key, NodeId, ROOT_LEFT};
use crate::node::Node;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Violation {
    /// `left_key >= right_key`
    InvertedInterval { id: NodeId, left: Key, right: Key },
    /// `right_key - left_key` is even, which no subtree can produce.
    EvenWidth { id: NodeId, left: Key, right: Key },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConsistencyReport {
    pub scanned: usize,
    pub violations: Vec<Violation>,
}

impl ConsistencyReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Per-row sanity scan.
///
/// Partially overlapping intervals are not detected here; see `validate_invariants` for the
/// full structural check.
pub fn check_consistency(nodes: &[Node]) -> ConsistencyReport {
    let mut violations = Vec::new();
    for n in nodes {
        if n.left >= n.right {
            violations.push(Violation::InvertedInterval {
                id: n.id,
                left: n.left,
                right: n.right,
            });
        } else if (n.right - n.left) % 2 == 0 {
            violations.push(Violation::EvenWidth {
                id: n.id,
                left: n.left,
                right: n.right,
            });
        }
    }
    ConsistencyReport {
        scanned: nodes.len(),
        violations,
    }
}

/// Full structural validation of a tree snapshot. Intended for tests and debugging.
///
/// Checks that there is exactly one root at key 1, that the keys cover `1..=2N` with no
/// duplicates, that intervals are strictly nested (never partially overlapping) and that
/// every level equals its parent's level plus one.
pub fn validate_invariants(nodes: &[Node]) -> Result<()> {
    if nodes.is_empty() {
        return Ok(());
    }

    let mut sorted: Vec<&Node> = nodes.iter().collect();
    sorted.sort_by_key(|n| n.left);

    let mut keys: Vec<Key> = nodes.iter().flat_map(|n| [n.left, n.right]).collect();
    keys.sort_unstable();
    for (i, k) in keys.iter().enumerate() {
        let expected = i as Key + 1;
        if *k != expected {
            return Err(Error::InconsistentState(format!(
                "keys are not contiguous: expected {expected}, found {k}"
            )));
        }
    }

    let root = sorted[0];
    if root.left != ROOT_LEFT || root.level != 0 {
        return Err(Error::InconsistentState(format!(
            "root must start at key {ROOT_LEFT} with level 0, found {root:?}"
        )));
    }

    // Open intervals, innermost last.
    let mut stack: Vec<&Node> = Vec::new();
    for n in sorted {
        if n.left >= n.right {
            return Err(Error::InconsistentState(format!("inverted interval {n:?}")));
        }
        while stack.last().is_some_and(|open| open.right < n.left) {
            stack.pop();
        }
        match stack.last() {
            None if n.left != ROOT_LEFT => {
                return Err(Error::InconsistentState(format!(
                    "node {} lies outside the root",
                    n.id
                )));
            }
            Some(parent) if parent.right < n.right => {
                return Err(Error::InconsistentState(format!(
                    "node {} partially overlaps {}",
                    n.id, parent.id
                )));
            }
            Some(parent) if n.level != parent.level + 1 => {
                return Err(Error::InconsistentState(format!(
                    "node {} has level {}, parent {} has level {}",
                    n.id, n.level, parent.id, parent.level
                )));
            }
            _ => {}
        }
        stack.push(n);
    }
    Ok(())
}
