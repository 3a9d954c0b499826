#![cfg(feature = "serde")]

use nestedset_core::{check_consistency, Node, NodeId};

#[test]
fn node_serializes_with_plain_id() {
    let node = Node::new(NodeId(7), 3, 4, 2, "dogs");
    let json = serde_json::to_value(&node).unwrap();
    assert_eq!(
        json,
        serde_json::json!({"id": 7, "left": 3, "right": 4, "level": 2, "value": "dogs"})
    );
    let back: Node = serde_json::from_value(json).unwrap();
    assert_eq!(back, node);
}

#[test]
fn consistency_report_serializes_violations() {
    let report = check_consistency(&[Node::new(NodeId(1), 4, 2, 0, "bad")]);
    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("InvertedInterval"));
}
