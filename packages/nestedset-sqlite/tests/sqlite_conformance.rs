use nestedset_core::{NestedSetTree, Repository};
use nestedset_sqlite::{SqliteConfig, SqliteStore};
use nestedset_test_support::{init_tracing, run_conformance, seed_animals, snapshot};

#[test]
fn in_memory_store_conforms() {
    run_conformance(|| NestedSetTree::new(SqliteStore::in_memory().unwrap()));
}

#[test]
fn file_store_conforms() {
    let dir = tempfile::tempdir().unwrap();
    let mut n = 0;
    run_conformance(|| {
        n += 1;
        let path = dir.path().join(format!("tree-{n}.db"));
        NestedSetTree::new(SqliteStore::new(path).unwrap())
    });
}

#[test]
fn tree_survives_reopen() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tree.db");

    let before = {
        let mut tree = NestedSetTree::new(SqliteStore::new(&path).unwrap());
        seed_animals(&mut tree).unwrap();
        let fish = tree.node_by_value("fish").unwrap();
        let mammals = tree.node_by_value("mammals").unwrap();
        tree.move_node(&fish, &mammals).unwrap();
        snapshot(&mut tree)
    };

    let mut reopened = NestedSetTree::new(SqliteStore::new(&path).unwrap());
    assert_eq!(snapshot(&mut reopened), before);
    reopened.validate_invariants().unwrap();
    assert_eq!(reopened.root().unwrap().value, "animals");
    let fish = reopened.node_by_value("fish").unwrap();
    assert_eq!(reopened.parent(&fish).unwrap().value, "mammals");
}

#[test]
fn file_store_uses_wal_journal() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::with_config(SqliteConfig {
        path: dir.path().join("wal.db").to_string_lossy().to_string(),
        ..Default::default()
    })
    .unwrap();
    let mode: String = store
        .connection()
        .query_row("PRAGMA journal_mode", [], |r| r.get(0))
        .unwrap();
    assert_eq!(mode.to_lowercase(), "wal");
}

#[test]
fn two_trees_share_a_database_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shared.db").to_string_lossy().to_string();
    let config = |table: &str| SqliteConfig {
        path: path.clone(),
        table: nestedset_core::TableName::new(table).unwrap(),
        ..Default::default()
    };

    let mut animals = NestedSetTree::new(SqliteStore::with_config(config("animals")).unwrap());
    let mut plants = NestedSetTree::new(SqliteStore::with_config(config("plants")).unwrap());
    seed_animals(&mut animals).unwrap();
    let flora = plants.plant("flora").unwrap();
    plants.insert_child(&flora, "ferns").unwrap();

    assert_eq!(animals.store_mut().fetch_all().unwrap().len(), 10);
    assert_eq!(plants.store_mut().fetch_all().unwrap().len(), 2);
    plants.validate_invariants().unwrap();
}
