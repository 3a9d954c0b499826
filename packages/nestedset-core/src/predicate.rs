use crate::ids::Key;
use crate::node::Node;

/// Range predicate over the `(left_key, right_key)` columns of the tree table.
///
/// Parked rows (negated keys, see `Repository::park_where`) never satisfy a predicate with
/// positive bounds, with one exception worth keeping in mind: `Encloses` compares `left`
/// with `<`, so it relies on the `right > r` half to exclude them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyPredicate {
    All,
    /// `left_key = k`
    LeftEquals(Key),
    /// `left_key > k`
    LeftAbove(Key),
    /// `right_key >= k`
    RightAtLeast(Key),
    /// `left_key < k AND right_key >= k`: every interval still open at position `k`.
    Spans(Key),
    /// `left_key >= l AND right_key <= r`: the node `[l, r]` and its subtree.
    Within { left: Key, right: Key },
    /// `left_key < l AND right_key > r`: proper ancestors of `[l, r]`.
    Encloses { left: Key, right: Key },
    /// `left_key < 0`
    Parked,
}

impl KeyPredicate {
    pub fn matches(&self, node: &Node) -> bool {
        match *self {
            KeyPredicate::All => true,
            KeyPredicate::LeftEquals(k) => node.left == k,
            KeyPredicate::LeftAbove(k) => node.left > k,
            KeyPredicate::RightAtLeast(k) => node.right >= k,
            KeyPredicate::Spans(k) => node.left < k && node.right >= k,
            KeyPredicate::Within { left, right } => node.left >= left && node.right <= right,
            KeyPredicate::Encloses { left, right } => node.left < left && node.right > right,
            KeyPredicate::Parked => node.left < 0,
        }
    }

    /// Render the predicate as a SQL condition.
    ///
    /// `placeholder` maps a 1-based parameter index to the backend's syntax (`$3`, `?3`);
    /// numbering starts at `first_param`. Returns the clause and its bound values in order.
    pub fn to_sql(&self, first_param: usize, placeholder: fn(usize) -> String) -> (String, Vec<Key>) {
        let p1 = placeholder(first_param);
        let p2 = placeholder(first_param + 1);
        match *self {
            KeyPredicate::All => ("1 = 1".to_string(), Vec::new()),
            KeyPredicate::LeftEquals(k) => (format!("left_key = {p1}"), vec![k]),
            KeyPredicate::LeftAbove(k) => (format!("left_key > {p1}"), vec![k]),
            KeyPredicate::RightAtLeast(k) => (format!("right_key >= {p1}"), vec![k]),
            KeyPredicate::Spans(k) => (
                format!("left_key < {p1} AND right_key >= {p1}"),
                vec![k],
            ),
            KeyPredicate::Within { left, right } => (
                format!("left_key >= {p1} AND right_key <= {p2}"),
                vec![left, right],
            ),
            KeyPredicate::Encloses { left, right } => (
                format!("left_key < {p1} AND right_key > {p2}"),
                vec![left, right],
            ),
            KeyPredicate::Parked => ("left_key < 0".to_string(), Vec::new()),
        }
    }
}

/// `$n` placeholders (PostgreSQL).
pub fn dollar_placeholder(index: usize) -> String {
    format!("${index}")
}

/// `?n` placeholders (SQLite).
pub fn question_placeholder(index: usize) -> String {
    format!("?{index}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::NodeId;

    fn node(left: Key, right: Key) -> Node {
        Node::new(NodeId(0), left, right, 0, "n")
    }

    #[test]
    fn spans_includes_the_node_closing_at_k() {
        let p = KeyPredicate::Spans(9);
        assert!(p.matches(&node(2, 9)));
        assert!(p.matches(&node(1, 20)));
        assert!(!p.matches(&node(3, 4)));
        assert!(!p.matches(&node(9, 10)));
    }

    #[test]
    fn parked_rows_are_invisible_to_positive_ranges() {
        let parked = node(-11, -12);
        assert!(!KeyPredicate::LeftAbove(3).matches(&parked));
        assert!(!KeyPredicate::RightAtLeast(3).matches(&parked));
        assert!(!KeyPredicate::Spans(3).matches(&parked));
        assert!(!KeyPredicate::Encloses { left: 11, right: 12 }.matches(&parked));
        assert!(KeyPredicate::Parked.matches(&parked));
    }

    #[test]
    fn renders_numbered_placeholders() {
        let (sql, params) =
            KeyPredicate::Within { left: 3, right: 8 }.to_sql(3, dollar_placeholder);
        assert_eq!(sql, "left_key >= $3 AND right_key <= $4");
        assert_eq!(params, vec![3, 8]);

        let (sql, params) = KeyPredicate::Spans(5).to_sql(1, question_placeholder);
        assert_eq!(sql, "left_key < ?1 AND right_key >= ?1");
        assert_eq!(params, vec![5]);

        let (sql, params) = KeyPredicate::Parked.to_sql(1, question_placeholder);
        assert_eq!(sql, "left_key < 0");
        assert!(params.is_empty());
    }
}
