#![forbid(unsafe_code)]
//! Core of a nested-set tree persisted in a relational table.
//! Every node carries a `[left, right]` key interval and ancestry is interval containment.
//! This crate holds the mutation engine and stays independent of concrete SQL engines: any
//! host that can satisfy `Store` (begin/commit/rollback plus the `Repository` primitives)
//! can carry a tree.

pub mod config;
pub mod consistency;
pub mod error;
pub mod ids;
pub mod mutator;
pub mod node;
pub mod predicate;
pub mod traits;
pub mod tree;

pub use config::TableName;
pub use consistency::{check_consistency, validate_invariants, ConsistencyReport, Violation};
pub use error::{Error, Result};
pub use ids::{Key, Level, NodeId, ROOT_LEFT};
pub use mutator::{delete_node, insert_child, move_node, rename_node};
pub use node::Node;
pub use predicate::{dollar_placeholder, question_placeholder, KeyPredicate};
pub use traits::{with_transaction, MemoryStore, Repository, Store};
pub use tree::NestedSetTree;
