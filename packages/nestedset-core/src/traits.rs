use tracing::warn;

use crate::error::{Error, Result};
use crate::ids::{Key, Level, NodeId, ROOT_LEFT};
use crate::node::Node;
use crate::predicate::KeyPredicate;

/// Primitive row operations against the tree table.
///
/// Implementations hold no transaction state of their own: whatever transaction the owning
/// `Store` has open is the one every call runs in. Every read returns rows ordered by
/// `left_key`.
pub trait Repository {
    fn fetch_where(&mut self, predicate: KeyPredicate) -> Result<Vec<Node>>;

    fn fetch_by_id(&mut self, id: NodeId) -> Result<Option<Node>>;

    /// The node with the smallest `left_key` among those whose value equals `value`.
    fn fetch_by_value(&mut self, value: &str) -> Result<Option<Node>>;

    /// The tightest interval strictly containing `[left, right]`, i.e. the parent.
    fn fetch_containing_ancestor(&mut self, left: Key, right: Key) -> Result<Option<Node>>;

    fn insert(&mut self, left: Key, right: Key, level: Level, value: &str) -> Result<NodeId>;

    fn update_value(&mut self, id: NodeId, value: &str) -> Result<u64>;

    /// Add `left_delta` / `right_delta` to the keys of every row matching `predicate`.
    fn shift_keys_where(
        &mut self,
        predicate: KeyPredicate,
        left_delta: Key,
        right_delta: Key,
    ) -> Result<u64>;

    fn delete_where(&mut self, predicate: KeyPredicate) -> Result<u64>;

    /// Negate both keys of every matching row, taking it out of all positive ranges.
    fn park_where(&mut self, predicate: KeyPredicate) -> Result<u64>;

    /// Bring parked rows back: `key = -key + offset` for both keys, `level += level_delta`.
    fn unpark(&mut self, offset: Key, level_delta: Level) -> Result<u64>;

    fn fetch_all(&mut self) -> Result<Vec<Node>> {
        self.fetch_where(KeyPredicate::All)
    }

    fn fetch_root(&mut self) -> Result<Option<Node>> {
        Ok(self
            .fetch_where(KeyPredicate::LeftEquals(ROOT_LEFT))?
            .into_iter()
            .next())
    }
}

/// A repository that can group its statements into a transaction.
pub trait Store: Repository {
    fn begin(&mut self) -> Result<()>;
    fn commit(&mut self) -> Result<()>;
    fn rollback(&mut self) -> Result<()>;
}

/// Run `f` inside one transaction: commit when it succeeds, roll back when it (or the
/// commit itself) fails. The original error is returned unchanged.
pub fn with_transaction<S, T, F>(store: &mut S, f: F) -> Result<T>
where
    S: Store + ?Sized,
    F: FnOnce(&mut S) -> Result<T>,
{
    store.begin()?;

    let res = f(store).and_then(|v| store.commit().map(|_| v));

    match res {
        Ok(v) => Ok(v),
        Err(e) => {
            warn!(error = %e, "rolling back transaction");
            let _ = store.rollback();
            Err(e)
        }
    }
}

/// In-memory vector-backed store for tests, benchmarks and prototyping.
///
/// Transactions snapshot the rows on `begin` and restore them on `rollback`. A failure can
/// be injected on the n-th mutating statement to exercise rollback paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Vec<Node>,
    next_id: i64,
    snapshot: Option<(Vec<Node>, i64)>,
    fail_after: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from existing rows (ids are kept, new ids continue after the maximum).
    pub fn from_rows(rows: Vec<Node>) -> Self {
        let next_id = rows.iter().map(|n| n.id.0).max().unwrap_or(0);
        Self {
            rows,
            next_id,
            snapshot: None,
            fail_after: None,
        }
    }

    /// Make the mutating statement after the next `statements` ones fail with a storage error.
    pub fn fail_after(&mut self, statements: usize) {
        self.fail_after = Some(statements);
    }

    pub fn rows(&self) -> &[Node] {
        &self.rows
    }

    pub fn in_transaction(&self) -> bool {
        self.snapshot.is_some()
    }

    fn tick(&mut self) -> Result<()> {
        match self.fail_after {
            Some(0) => {
                self.fail_after = None;
                Err(Error::Storage("injected failure".into()))
            }
            Some(n) => {
                self.fail_after = Some(n - 1);
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn sorted(mut nodes: Vec<Node>) -> Vec<Node> {
        nodes.sort_by_key(|n| (n.left, n.id));
        nodes
    }
}

impl Repository for MemoryStore {
    fn fetch_where(&mut self, predicate: KeyPredicate) -> Result<Vec<Node>> {
        Ok(Self::sorted(
            self.rows.iter().filter(|n| predicate.matches(n)).cloned().collect(),
        ))
    }

    fn fetch_by_id(&mut self, id: NodeId) -> Result<Option<Node>> {
        Ok(self.rows.iter().find(|n| n.id == id).cloned())
    }

    fn fetch_by_value(&mut self, value: &str) -> Result<Option<Node>> {
        Ok(self
            .rows
            .iter()
            .filter(|n| n.value == value)
            .min_by_key(|n| n.left)
            .cloned())
    }

    fn fetch_containing_ancestor(&mut self, left: Key, right: Key) -> Result<Option<Node>> {
        Ok(self
            .rows
            .iter()
            .filter(|n| n.left < left && n.right > right)
            .max_by_key(|n| n.left)
            .cloned())
    }

    fn insert(&mut self, left: Key, right: Key, level: Level, value: &str) -> Result<NodeId> {
        self.tick()?;
        self.next_id += 1;
        let id = NodeId(self.next_id);
        self.rows.push(Node::new(id, left, right, level, value));
        Ok(id)
    }

    fn update_value(&mut self, id: NodeId, value: &str) -> Result<u64> {
        self.tick()?;
        let mut changed = 0;
        for n in self.rows.iter_mut().filter(|n| n.id == id) {
            n.value = value.to_string();
            changed += 1;
        }
        Ok(changed)
    }

    fn shift_keys_where(
        &mut self,
        predicate: KeyPredicate,
        left_delta: Key,
        right_delta: Key,
    ) -> Result<u64> {
        self.tick()?;
        let mut changed = 0;
        for n in self.rows.iter_mut().filter(|n| predicate.matches(n)) {
            n.left += left_delta;
            n.right += right_delta;
            changed += 1;
        }
        Ok(changed)
    }

    fn delete_where(&mut self, predicate: KeyPredicate) -> Result<u64> {
        self.tick()?;
        let before = self.rows.len();
        self.rows.retain(|n| !predicate.matches(n));
        Ok((before - self.rows.len()) as u64)
    }

    fn park_where(&mut self, predicate: KeyPredicate) -> Result<u64> {
        self.tick()?;
        let mut changed = 0;
        for n in self.rows.iter_mut().filter(|n| predicate.matches(n)) {
            n.left = -n.left;
            n.right = -n.right;
            changed += 1;
        }
        Ok(changed)
    }

    fn unpark(&mut self, offset: Key, level_delta: Level) -> Result<u64> {
        self.tick()?;
        let mut changed = 0;
        for n in self
            .rows
            .iter_mut()
            .filter(|n| KeyPredicate::Parked.matches(n))
        {
            n.left = -n.left + offset;
            n.right = -n.right + offset;
            n.level += level_delta;
            changed += 1;
        }
        Ok(changed)
    }
}

impl Store for MemoryStore {
    fn begin(&mut self) -> Result<()> {
        if self.snapshot.is_some() {
            return Err(Error::Storage("transaction already in progress".into()));
        }
        self.snapshot = Some((self.rows.clone(), self.next_id));
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.snapshot
            .take()
            .map(|_| ())
            .ok_or_else(|| Error::Storage("commit without transaction".into()))
    }

    fn rollback(&mut self) -> Result<()> {
        let (rows, next_id) = self
            .snapshot
            .take()
            .ok_or_else(|| Error::Storage("rollback without transaction".into()))?;
        self.rows = rows;
        self.next_id = next_id;
        Ok(())
    }
}
