//! Fixtures and a backend-agnostic conformance suite.
//!
//! Every scenario takes an empty tree, seeds the animals fixture and asserts exact keys,
//! so any `Store` implementation can be checked against the same expectations:
//!
//! ```text
//! animals[1,20]
//!   mammals[2,9]: dogs[3,4] cats[5,6] horses[7,8]
//!   fish[10,15]: sharks[11,12] salmon[13,14]
//!   insects[16,19]: flies[17,18]
//! ```

use std::sync::Once;

use nestedset_core::{Key, Level, NestedSetTree, Node, Result, Store};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// `(parent, child)` pairs in insertion order; the first entry's parent is the root value.
pub const ANIMALS: &[(&str, &str)] = &[
    ("animals", "mammals"),
    ("mammals", "dogs"),
    ("mammals", "cats"),
    ("mammals", "horses"),
    ("animals", "fish"),
    ("fish", "sharks"),
    ("fish", "salmon"),
    ("animals", "insects"),
    ("insects", "flies"),
];

/// Route `tracing` output to the test harness, filtered by `RUST_LOG` (default `warn`).
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_test_writer())
            .try_init();
    });
}

/// Build the animals fixture in an empty tree through the public mutation API.
pub fn seed_animals<S: Store>(tree: &mut NestedSetTree<S>) -> Result<()> {
    tree.plant("animals")?;
    for (parent, child) in ANIMALS {
        let parent = tree.node_by_value(parent)?;
        tree.insert_child(&parent, child)?;
    }
    Ok(())
}

/// `(value, left, right, level)` of every node in key order.
pub fn snapshot<S: Store>(tree: &mut NestedSetTree<S>) -> Vec<(String, Key, Key, Level)> {
    tree.all_nodes()
        .expect("fetch all nodes")
        .into_iter()
        .map(|n| (n.value, n.left, n.right, n.level))
        .collect()
}

pub fn lookup<S: Store>(tree: &mut NestedSetTree<S>, value: &str) -> Node {
    tree.node_by_value(value)
        .unwrap_or_else(|e| panic!("lookup {value:?}: {e}"))
}

#[track_caller]
pub fn assert_keys<S: Store>(tree: &mut NestedSetTree<S>, value: &str, left: Key, right: Key) {
    let n = lookup(tree, value);
    assert_eq!((n.left, n.right), (left, right), "keys of {value}");
}

#[track_caller]
pub fn assert_level<S: Store>(tree: &mut NestedSetTree<S>, value: &str, level: Level) {
    assert_eq!(lookup(tree, value).level, level, "level of {value}");
}

#[track_caller]
pub fn assert_parent<S: Store>(tree: &mut NestedSetTree<S>, value: &str, parent: &str) {
    let n = lookup(tree, value);
    let p = tree.parent(&n).expect("parent");
    assert_eq!(p.value, parent, "parent of {value}");
}

/// Seeding through inserts reproduces the documented keys.
pub fn scenario_seed<S: Store>(mut tree: NestedSetTree<S>) {
    seed_animals(&mut tree).unwrap();
    let expected = [
        ("animals", 1, 20, 0),
        ("mammals", 2, 9, 1),
        ("dogs", 3, 4, 2),
        ("cats", 5, 6, 2),
        ("horses", 7, 8, 2),
        ("fish", 10, 15, 1),
        ("sharks", 11, 12, 2),
        ("salmon", 13, 14, 2),
        ("insects", 16, 19, 1),
        ("flies", 17, 18, 2),
    ];
    let expected: Vec<_> = expected
        .iter()
        .map(|(v, l, r, lv)| (v.to_string(), *l, *r, *lv))
        .collect();
    assert_eq!(snapshot(&mut tree), expected);
    tree.validate_invariants().unwrap();
}

pub fn scenario_insert<S: Store>(mut tree: NestedSetTree<S>) {
    seed_animals(&mut tree).unwrap();
    let mammals = lookup(&mut tree, "mammals");

    let sheep = tree.insert_child(&mammals, "sheep").unwrap();
    assert_eq!((sheep.left, sheep.right, sheep.level), (9, 10, 2));

    assert_keys(&mut tree, "mammals", 2, 11);
    assert_keys(&mut tree, "horses", 7, 8);
    assert_keys(&mut tree, "fish", 12, 17);
    assert_keys(&mut tree, "flies", 19, 20);
    assert_keys(&mut tree, "animals", 1, 22);
    assert_parent(&mut tree, "sheep", "mammals");
    tree.validate_invariants().unwrap();
}

pub fn scenario_delete_subtree<S: Store>(mut tree: NestedSetTree<S>) {
    seed_animals(&mut tree).unwrap();
    let fish = lookup(&mut tree, "fish");

    tree.delete_node(&fish).unwrap();

    assert!(tree.node_by_value("sharks").unwrap_err().is_not_found());
    assert!(tree.node_by_value("salmon").unwrap_err().is_not_found());
    assert_keys(&mut tree, "insects", 10, 13);
    assert_keys(&mut tree, "flies", 11, 12);
    assert_keys(&mut tree, "animals", 1, 14);
    assert_eq!(tree.all_nodes().unwrap().len(), 7);
    tree.validate_invariants().unwrap();
}

/// Leaf moved to a later sibling subtree.
pub fn scenario_move_leaf_right<S: Store>(mut tree: NestedSetTree<S>) {
    seed_animals(&mut tree).unwrap();
    let sharks = lookup(&mut tree, "sharks");
    let insects = lookup(&mut tree, "insects");

    tree.move_node(&sharks, &insects).unwrap();

    assert_keys(&mut tree, "fish", 10, 13);
    assert_keys(&mut tree, "salmon", 11, 12);
    assert_keys(&mut tree, "insects", 14, 19);
    assert_keys(&mut tree, "flies", 15, 16);
    assert_keys(&mut tree, "sharks", 17, 18);
    assert_level(&mut tree, "sharks", 2);
    assert_keys(&mut tree, "animals", 1, 20);
    assert_parent(&mut tree, "sharks", "insects");
    tree.validate_invariants().unwrap();
}

/// Leaf moved to an earlier subtree.
pub fn scenario_move_leaf_left<S: Store>(mut tree: NestedSetTree<S>) {
    seed_animals(&mut tree).unwrap();
    let flies = lookup(&mut tree, "flies");
    let mammals = lookup(&mut tree, "mammals");

    tree.move_node(&flies, &mammals).unwrap();

    assert_keys(&mut tree, "mammals", 2, 11);
    assert_keys(&mut tree, "flies", 9, 10);
    assert_keys(&mut tree, "fish", 12, 17);
    assert_keys(&mut tree, "insects", 18, 19);
    assert_level(&mut tree, "flies", 2);
    assert_parent(&mut tree, "flies", "mammals");
    tree.validate_invariants().unwrap();
}

/// Whole subtree moved one level down.
pub fn scenario_move_subtree_down<S: Store>(mut tree: NestedSetTree<S>) {
    seed_animals(&mut tree).unwrap();
    let mammals = lookup(&mut tree, "mammals");
    let insects = lookup(&mut tree, "insects");

    tree.move_node(&mammals, &insects).unwrap();

    assert_keys(&mut tree, "fish", 2, 7);
    assert_keys(&mut tree, "insects", 8, 19);
    assert_keys(&mut tree, "flies", 9, 10);
    assert_keys(&mut tree, "mammals", 11, 18);
    assert_keys(&mut tree, "dogs", 12, 13);
    assert_keys(&mut tree, "horses", 16, 17);
    assert_level(&mut tree, "mammals", 2);
    assert_level(&mut tree, "dogs", 3);
    assert_parent(&mut tree, "dogs", "mammals");
    tree.validate_invariants().unwrap();
}

pub fn scenario_invalid_moves<S: Store>(mut tree: NestedSetTree<S>) {
    seed_animals(&mut tree).unwrap();
    let before = snapshot(&mut tree);
    let animals = lookup(&mut tree, "animals");
    let mammals = lookup(&mut tree, "mammals");
    let dogs = lookup(&mut tree, "dogs");

    let err = tree.move_node(&mammals, &dogs).unwrap_err();
    assert!(err.is_invalid_operation(), "{err}");
    let err = tree.move_node(&animals, &mammals).unwrap_err();
    assert!(err.is_invalid_operation(), "{err}");

    assert_eq!(snapshot(&mut tree), before);
}

pub fn scenario_noop_moves<S: Store>(mut tree: NestedSetTree<S>) {
    seed_animals(&mut tree).unwrap();
    let before = snapshot(&mut tree);
    let cats = lookup(&mut tree, "cats");
    let mammals = lookup(&mut tree, "mammals");

    tree.move_node(&cats, &cats).unwrap();
    tree.move_node(&cats, &mammals).unwrap();

    assert_eq!(snapshot(&mut tree), before);
}

pub fn scenario_delete_root_rejected<S: Store>(mut tree: NestedSetTree<S>) {
    seed_animals(&mut tree).unwrap();
    let before = snapshot(&mut tree);
    let root = tree.root().unwrap();

    let err = tree.delete_node(&root).unwrap_err();
    assert!(err.is_invalid_operation(), "{err}");
    assert_eq!(snapshot(&mut tree), before);
}

pub fn scenario_rename<S: Store>(mut tree: NestedSetTree<S>) {
    seed_animals(&mut tree).unwrap();
    let cats = lookup(&mut tree, "cats");

    tree.rename_node(&cats, "felines").unwrap();

    let felines = lookup(&mut tree, "felines");
    assert_eq!(felines.id, cats.id);
    assert_eq!((felines.left, felines.right, felines.level), (5, 6, 2));
    assert!(tree.node_by_value("cats").unwrap_err().is_not_found());
}

/// Operations on a node that is gone report `NotFound` and leave the tree alone.
pub fn scenario_vanished_node<S: Store>(mut tree: NestedSetTree<S>) {
    seed_animals(&mut tree).unwrap();
    let salmon = lookup(&mut tree, "salmon");
    let insects = lookup(&mut tree, "insects");
    tree.delete_node(&salmon).unwrap();
    let before = snapshot(&mut tree);

    assert!(tree.delete_node(&salmon).unwrap_err().is_not_found());
    assert!(tree.move_node(&salmon, &insects).unwrap_err().is_not_found());
    assert!(tree.insert_child(&salmon, "roe").unwrap_err().is_not_found());
    assert!(tree.rename_node(&salmon, "trout").unwrap_err().is_not_found());
    assert!(tree.node(salmon.id).unwrap_err().is_not_found());

    assert_eq!(snapshot(&mut tree), before);
}

/// An insert followed by deleting the new node restores every key.
pub fn scenario_insert_delete_round_trip<S: Store>(mut tree: NestedSetTree<S>) {
    seed_animals(&mut tree).unwrap();
    let before = snapshot(&mut tree);
    let fish = lookup(&mut tree, "fish");

    let eel = tree.insert_child(&fish, "eel").unwrap();
    tree.delete_node(&eel).unwrap();

    assert_eq!(snapshot(&mut tree), before);
}

pub fn scenario_queries<S: Store>(mut tree: NestedSetTree<S>) {
    seed_animals(&mut tree).unwrap();
    let root = tree.root().unwrap();
    assert_eq!(root.value, "animals");
    let fish = lookup(&mut tree, "fish");
    let salmon = lookup(&mut tree, "salmon");

    let children: Vec<_> = tree
        .children(&root)
        .unwrap()
        .into_iter()
        .map(|n| n.value)
        .collect();
    assert_eq!(children, ["mammals", "fish", "insects"]);

    let descendants: Vec<_> = tree
        .descendants(&fish)
        .unwrap()
        .into_iter()
        .map(|n| n.value)
        .collect();
    assert_eq!(descendants, ["sharks", "salmon"]);

    let ancestors: Vec<_> = tree
        .ancestors(&salmon)
        .unwrap()
        .into_iter()
        .map(|n| n.value)
        .collect();
    assert_eq!(ancestors, ["animals", "fish"]);

    assert!(tree.parent(&root).unwrap_err().is_not_found());
    assert!(tree.check_consistency().unwrap().is_valid());
}

/// Run every scenario, each against a fresh empty tree from `make`.
pub fn run_conformance<S, F>(mut make: F)
where
    S: Store,
    F: FnMut() -> NestedSetTree<S>,
{
    init_tracing();
    scenario_seed(make());
    scenario_insert(make());
    scenario_delete_subtree(make());
    scenario_move_leaf_right(make());
    scenario_move_leaf_left(make());
    scenario_move_subtree_down(make());
    scenario_invalid_moves(make());
    scenario_noop_moves(make());
    scenario_delete_root_rejected(make());
    scenario_rename(make());
    scenario_vanished_node(make());
    scenario_insert_delete_round_trip(make());
    scenario_queries(make());
}
