use std::collections::HashMap;

use nestedset_core::{check_consistency, Key, MemoryStore, NestedSetTree, NodeId};
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Op {
    Insert(usize),
    Delete(usize),
    Move(usize, usize),
    Rename(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => any::<usize>().prop_map(Op::Insert),
        1 => any::<usize>().prop_map(Op::Delete),
        2 => (any::<usize>(), any::<usize>()).prop_map(|(a, b)| Op::Move(a, b)),
        1 => any::<usize>().prop_map(Op::Rename),
    ]
}

/// Parent/children reference model of the same tree.
#[derive(Default)]
struct Model {
    root: Option<NodeId>,
    children: HashMap<NodeId, Vec<NodeId>>,
    parent: HashMap<NodeId, NodeId>,
    values: HashMap<NodeId, String>,
}

impl Model {
    fn subtree(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = vec![node];
        let mut i = 0;
        while i < out.len() {
            out.extend(self.children[&out[i]].iter().copied());
            i += 1;
        }
        out
    }

    fn detach(&mut self, node: NodeId) {
        if let Some(p) = self.parent.remove(&node) {
            self.children.get_mut(&p).unwrap().retain(|c| *c != node);
        }
    }

    fn attach(&mut self, node: NodeId, parent: NodeId) {
        self.children.get_mut(&parent).unwrap().push(node);
        self.parent.insert(node, parent);
    }

    /// Nested-set rows the model implies: id -> (left, right, level, value).
    fn expected(&self) -> HashMap<NodeId, (Key, Key, i64, String)> {
        fn walk(
            m: &Model,
            node: NodeId,
            level: i64,
            next: &mut Key,
            out: &mut HashMap<NodeId, (Key, Key, i64, String)>,
        ) {
            let left = *next;
            *next += 1;
            for child in &m.children[&node] {
                walk(m, *child, level + 1, next, out);
            }
            let right = *next;
            *next += 1;
            out.insert(node, (left, right, level, m.values[&node].clone()));
        }
        let mut out = HashMap::new();
        if let Some(root) = self.root {
            let mut next = 1;
            walk(self, root, 0, &mut next, &mut out);
        }
        out
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn random_mutations_match_reference_model(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let mut tree = NestedSetTree::new(MemoryStore::new());
        let mut model = Model::default();

        let root = tree.plant("root").unwrap();
        model.root = Some(root.id);
        model.children.insert(root.id, Vec::new());
        model.values.insert(root.id, "root".into());

        for (step, op) in ops.into_iter().enumerate() {
            let nodes = tree.all_nodes().unwrap();
            let pick = |i: usize| nodes[i % nodes.len()].clone();

            match op {
                Op::Insert(p) => {
                    let parent = pick(p);
                    let value = format!("n{step}");
                    let child = tree.insert_child(&parent, &value).unwrap();
                    model.children.insert(child.id, Vec::new());
                    model.values.insert(child.id, value);
                    model.attach(child.id, parent.id);
                }
                Op::Delete(i) => {
                    let node = pick(i);
                    let res = tree.delete_node(&node);
                    if Some(node.id) == model.root {
                        prop_assert!(res.unwrap_err().is_invalid_operation());
                    } else {
                        res.unwrap();
                        for gone in model.subtree(node.id) {
                            model.children.remove(&gone);
                            model.values.remove(&gone);
                        }
                        model.detach(node.id);
                    }
                }
                Op::Move(a, b) => {
                    let node = pick(a);
                    let target = pick(b);
                    let res = tree.move_node(&node, &target);
                    if node.id == target.id || model.parent.get(&node.id) == Some(&target.id) {
                        res.unwrap();
                    } else if Some(node.id) == model.root || model.subtree(node.id).contains(&target.id) {
                        prop_assert!(res.unwrap_err().is_invalid_operation());
                    } else {
                        res.unwrap();
                        model.detach(node.id);
                        model.attach(node.id, target.id);
                    }
                }
                Op::Rename(i) => {
                    let node = pick(i);
                    let value = format!("r{step}");
                    tree.rename_node(&node, &value).unwrap();
                    model.values.insert(node.id, value);
                }
            }

            let nodes = tree.all_nodes().unwrap();
            prop_assert!(check_consistency(&nodes).is_valid());
            tree.validate_invariants().unwrap();

            let expected = model.expected();
            prop_assert_eq!(nodes.len(), expected.len());
            for n in &nodes {
                prop_assert_eq!(
                    Some(&(n.left, n.right, n.level, n.value.clone())),
                    expected.get(&n.id)
                );
            }
        }
    }

    #[test]
    fn intervals_never_partially_overlap(parents in prop::collection::vec(any::<usize>(), 1..30)) {
        let mut tree = NestedSetTree::new(MemoryStore::new());
        tree.plant("root").unwrap();
        for (i, p) in parents.iter().enumerate() {
            let nodes = tree.all_nodes().unwrap();
            let parent = nodes[p % nodes.len()].clone();
            tree.insert_child(&parent, &format!("n{i}")).unwrap();
        }

        let nodes = tree.all_nodes().unwrap();
        for a in &nodes {
            for b in &nodes {
                let disjoint = a.right < b.left || b.right < a.left;
                let nested = a.contains(b) || b.contains(a) || a.id == b.id;
                prop_assert!(disjoint || nested, "{:?} overlaps {:?}", a, b);
            }
        }
    }
}
