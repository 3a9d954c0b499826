use postgres::{Client, NoTls};
use uuid::Uuid;

use nestedset_core::{with_transaction, NestedSetTree, Repository, TableName};
use nestedset_postgres::{drop_table_for_tests, IsolationLevel, PgConfig, PgStore};
use nestedset_test_support::{init_tracing, run_conformance, seed_animals, snapshot};

fn connect() -> Option<Client> {
    let url = std::env::var("NESTEDSET_POSTGRES_URL").ok()?;
    Client::connect(&url, NoTls).ok()
}

fn unique_config() -> PgConfig {
    let table = format!("tree_{}", Uuid::new_v4().simple());
    PgConfig::with_table(&table).unwrap()
}

fn open_tree(client: Client, config: PgConfig) -> NestedSetTree<PgStore> {
    NestedSetTree::new(PgStore::open(client, config).unwrap())
}

fn drop_tree(tree: NestedSetTree<PgStore>) {
    let mut store = tree.into_store();
    let table = store.config().table.clone();
    drop_table_for_tests(store.client_mut(), &table).unwrap();
}

#[test]
fn postgres_store_conforms() {
    if connect().is_none() {
        return;
    }
    init_tracing();

    let mut tables: Vec<TableName> = Vec::new();
    run_conformance(|| {
        let config = unique_config();
        tables.push(config.table.clone());
        open_tree(connect().unwrap(), config)
    });

    let mut client = connect().unwrap();
    for table in &tables {
        drop_table_for_tests(&mut client, table).unwrap();
    }
}

#[test]
fn postgres_rollback_leaves_table_untouched() {
    let Some(client) = connect() else {
        return;
    };
    let mut tree = open_tree(client, unique_config());
    seed_animals(&mut tree).unwrap();
    let before = snapshot(&mut tree);

    let res: nestedset_core::Result<()> = with_transaction(tree.store_mut(), |s| {
        s.shift_keys_where(nestedset_core::KeyPredicate::All, 100, 100)?;
        s.insert(500, 501, 1, "ghost")?;
        Err(nestedset_core::Error::InvalidOperation("abort".into()))
    });
    assert!(res.unwrap_err().is_invalid_operation());
    assert_eq!(snapshot(&mut tree), before);

    drop_tree(tree);
}

#[test]
fn postgres_state_survives_reconnect() {
    let Some(client) = connect() else {
        return;
    };
    let config = PgConfig {
        isolation: IsolationLevel::RepeatableRead,
        ..unique_config()
    };
    let mut tree = open_tree(client, config.clone());
    seed_animals(&mut tree).unwrap();
    let before = snapshot(&mut tree);
    drop(tree);

    let mut reopened = open_tree(connect().unwrap(), config);
    assert_eq!(snapshot(&mut reopened), before);
    reopened.validate_invariants().unwrap();
    assert_eq!(
        reopened.store_mut().fetch_root().unwrap().unwrap().value,
        "animals"
    );

    drop_tree(reopened);
}
