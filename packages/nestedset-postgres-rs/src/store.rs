use std::collections::HashMap;

use postgres::types::ToSql;
use postgres::{Client, Row, Statement};
use tracing::{debug, trace};

use nestedset_core::{
    dollar_placeholder, Error, Key, KeyPredicate, Level, Node, NodeId, Repository, Result, Store,
};

use crate::config::PgConfig;
use crate::schema::ensure_schema;

type Param<'a> = &'a (dyn ToSql + Sync);

fn storage_debug<E: std::fmt::Debug>(e: E) -> Error {
    Error::Storage(format!("{e:?}"))
}

fn row_to_node(row: &Row) -> Result<Node> {
    let id: i64 = row.try_get(0).map_err(storage_debug)?;
    let left: i64 = row.try_get(1).map_err(storage_debug)?;
    let right: i64 = row.try_get(2).map_err(storage_debug)?;
    let level: i64 = row.try_get(3).map_err(storage_debug)?;
    let value: String = row.try_get(4).map_err(storage_debug)?;
    Ok(Node::new(NodeId(id), left, right, level, value))
}

/// Fixed statement texts, rendered once for the configured table.
#[derive(Clone, Debug)]
struct Queries {
    select: String,
    by_id: String,
    by_value: String,
    containing_ancestor: String,
    insert: String,
    update_value: String,
}

impl Queries {
    fn new(config: &PgConfig) -> Self {
        let t = &config.table;
        let select = format!("SELECT id, left_key, right_key, level, value FROM {t}");
        Self {
            by_id: format!("{select} WHERE id = $1"),
            by_value: format!("{select} WHERE value = $1 ORDER BY left_key LIMIT 1"),
            containing_ancestor: format!(
                "{select} WHERE left_key < $1 AND right_key > $2 ORDER BY left_key DESC LIMIT 1"
            ),
            insert: format!(
                "INSERT INTO {t} (left_key, right_key, level, value) VALUES ($1, $2, $3, $4) RETURNING id"
            ),
            update_value: format!("UPDATE {t} SET value = $2 WHERE id = $1"),
            select,
        }
    }
}

/// Tree table in a PostgreSQL database.
///
/// Owns its connection. Transactions are opened with the configured isolation level
/// (`SERIALIZABLE` by default); a serialization failure surfaces as `Error::Storage` and the
/// caller decides whether to retry.
pub struct PgStore {
    client: Client,
    config: PgConfig,
    queries: Queries,
    stmts: HashMap<String, Statement>,
}

impl PgStore {
    pub fn new(client: Client, config: PgConfig) -> Self {
        let queries = Queries::new(&config);
        Self {
            client,
            config,
            queries,
            stmts: HashMap::new(),
        }
    }

    /// Like `new`, creating the table and its indexes first if they are missing.
    pub fn open(mut client: Client, config: PgConfig) -> Result<Self> {
        ensure_schema(&mut client, &config.table)?;
        debug!(table = %config.table, "postgres tree store ready");
        Ok(Self::new(client, config))
    }

    pub fn config(&self) -> &PgConfig {
        &self.config
    }

    pub fn client_mut(&mut self) -> &mut Client {
        &mut self.client
    }

    pub fn into_client(self) -> Client {
        self.client
    }

    fn stmt(&mut self, sql: &str) -> Result<Statement> {
        if let Some(stmt) = self.stmts.get(sql) {
            return Ok(stmt.clone());
        }
        let stmt = self.client.prepare(sql).map_err(storage_debug)?;
        self.stmts.insert(sql.to_string(), stmt.clone());
        Ok(stmt)
    }

    fn query_nodes(&mut self, sql: &str, params: &[Param<'_>]) -> Result<Vec<Node>> {
        let stmt = self.stmt(sql)?;
        trace!(sql = %sql, "query");
        let rows = self.client.query(&stmt, params).map_err(storage_debug)?;
        rows.iter().map(row_to_node).collect()
    }

    fn query_node(&mut self, sql: &str, params: &[Param<'_>]) -> Result<Option<Node>> {
        let stmt = self.stmt(sql)?;
        trace!(sql = %sql, "query");
        let row = self.client.query_opt(&stmt, params).map_err(storage_debug)?;
        row.as_ref().map(row_to_node).transpose()
    }

    fn execute(&mut self, sql: &str, params: &[Param<'_>]) -> Result<u64> {
        let stmt = self.stmt(sql)?;
        trace!(sql = %sql, "execute");
        self.client.execute(&stmt, params).map_err(storage_debug)
    }
}

impl Repository for PgStore {
    fn fetch_where(&mut self, predicate: KeyPredicate) -> Result<Vec<Node>> {
        let (cond, keys) = predicate.to_sql(1, dollar_placeholder);
        let sql = format!("{} WHERE {cond} ORDER BY left_key", self.queries.select);
        let params: Vec<Param<'_>> = keys.iter().map(|k| k as Param<'_>).collect();
        self.query_nodes(&sql, &params)
    }

    fn fetch_by_id(&mut self, id: NodeId) -> Result<Option<Node>> {
        let sql = self.queries.by_id.clone();
        self.query_node(&sql, &[&id.0])
    }

    fn fetch_by_value(&mut self, value: &str) -> Result<Option<Node>> {
        let sql = self.queries.by_value.clone();
        self.query_node(&sql, &[&value])
    }

    fn fetch_containing_ancestor(&mut self, left: Key, right: Key) -> Result<Option<Node>> {
        let sql = self.queries.containing_ancestor.clone();
        self.query_node(&sql, &[&left, &right])
    }

    fn insert(&mut self, left: Key, right: Key, level: Level, value: &str) -> Result<NodeId> {
        let sql = self.queries.insert.clone();
        let stmt = self.stmt(&sql)?;
        trace!(sql = %sql, "query");
        let row = self
            .client
            .query_one(&stmt, &[&left, &right, &level, &value])
            .map_err(storage_debug)?;
        let id: i64 = row.try_get(0).map_err(storage_debug)?;
        Ok(NodeId(id))
    }

    fn update_value(&mut self, id: NodeId, value: &str) -> Result<u64> {
        let sql = self.queries.update_value.clone();
        self.execute(&sql, &[&id.0, &value])
    }

    fn shift_keys_where(
        &mut self,
        predicate: KeyPredicate,
        left_delta: Key,
        right_delta: Key,
    ) -> Result<u64> {
        let (cond, keys) = predicate.to_sql(3, dollar_placeholder);
        let sql = format!(
            "UPDATE {} SET left_key = left_key + $1, right_key = right_key + $2 WHERE {cond}",
            self.config.table
        );
        let mut params: Vec<Param<'_>> = Vec::with_capacity(2 + keys.len());
        params.push(&left_delta);
        params.push(&right_delta);
        params.extend(keys.iter().map(|k| k as Param<'_>));
        self.execute(&sql, &params)
    }

    fn delete_where(&mut self, predicate: KeyPredicate) -> Result<u64> {
        let (cond, keys) = predicate.to_sql(1, dollar_placeholder);
        let sql = format!("DELETE FROM {} WHERE {cond}", self.config.table);
        let params: Vec<Param<'_>> = keys.iter().map(|k| k as Param<'_>).collect();
        self.execute(&sql, &params)
    }

    fn park_where(&mut self, predicate: KeyPredicate) -> Result<u64> {
        let (cond, keys) = predicate.to_sql(1, dollar_placeholder);
        let sql = format!(
            "UPDATE {} SET left_key = -left_key, right_key = -right_key WHERE {cond}",
            self.config.table
        );
        let params: Vec<Param<'_>> = keys.iter().map(|k| k as Param<'_>).collect();
        self.execute(&sql, &params)
    }

    fn unpark(&mut self, offset: Key, level_delta: Level) -> Result<u64> {
        let (cond, _) = KeyPredicate::Parked.to_sql(3, dollar_placeholder);
        let sql = format!(
            "UPDATE {} SET left_key = -left_key + $1, right_key = -right_key + $1, \
             level = level + $2 WHERE {cond}",
            self.config.table
        );
        self.execute(&sql, &[&offset, &level_delta])
    }
}

impl Store for PgStore {
    fn begin(&mut self) -> Result<()> {
        let sql = format!("BEGIN ISOLATION LEVEL {}", self.config.isolation.as_sql());
        self.client.batch_execute(&sql).map_err(|e| Error::Storage(e.to_string()))
    }

    fn commit(&mut self) -> Result<()> {
        self.client
            .batch_execute("COMMIT")
            .map_err(|e| Error::Storage(e.to_string()))
    }

    fn rollback(&mut self) -> Result<()> {
        self.client
            .batch_execute("ROLLBACK")
            .map_err(|e| Error::Storage(e.to_string()))
    }
}
