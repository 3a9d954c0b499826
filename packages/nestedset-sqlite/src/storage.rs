use std::path::Path;

use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use tracing::{debug, trace};

use nestedset_core::{
    question_placeholder, Error, Key, KeyPredicate, Level, Node, NodeId, Repository, Result,
    Store, TableName,
};

use crate::config::SqliteConfig;

fn storage_err(e: rusqlite::Error) -> Error {
    Error::Storage(e.to_string())
}

fn row_to_node(row: &Row<'_>) -> rusqlite::Result<Node> {
    Ok(Node::new(
        NodeId(row.get(0)?),
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get::<_, String>(4)?,
    ))
}

/// Tree table in a SQLite database.
///
/// Mutation transactions use `BEGIN IMMEDIATE`, so the write lock is taken up front and a
/// concurrent writer waits (up to the busy timeout) instead of failing halfway through.
pub struct SqliteStore {
    conn: Connection,
    config: SqliteConfig,
    select: String,
}

impl SqliteStore {
    /// Open (and create if needed) the database file at `path` with default settings.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = SqliteConfig {
            path: path.as_ref().to_string_lossy().to_string(),
            ..Default::default()
        };
        Self::with_config(config)
    }

    pub fn in_memory() -> Result<Self> {
        Self::with_config(SqliteConfig::in_memory())
    }

    pub fn with_config(config: SqliteConfig) -> Result<Self> {
        let conn = Connection::open(&config.path).map_err(storage_err)?;
        Self::configure_connection(&conn, &config)?;
        Self::ensure_schema(&conn, &config.table)?;
        debug!(path = %config.path, table = %config.table, "sqlite tree store ready");

        let select = format!(
            "SELECT id, left_key, right_key, level, value FROM {}",
            config.table
        );
        Ok(Self {
            conn,
            config,
            select,
        })
    }

    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn configure_connection(conn: &Connection, config: &SqliteConfig) -> Result<()> {
        if config.wal_mode && !config.is_in_memory() {
            let mode: String = conn
                .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
                .map_err(storage_err)?;
            debug!(mode = %mode, "journal mode");
        }
        conn.pragma_update(None, "busy_timeout", config.busy_timeout_ms)
            .map_err(storage_err)?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .map_err(storage_err)?;
        Ok(())
    }

    fn ensure_schema(conn: &Connection, table: &TableName) -> Result<()> {
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                left_key INTEGER NOT NULL,
                right_key INTEGER NOT NULL,
                level INTEGER NOT NULL DEFAULT 0,
                value TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_{table}_keys ON {table}(left_key, right_key);
            CREATE INDEX IF NOT EXISTS idx_{table}_value ON {table}(value, left_key);"
        ))
        .map_err(storage_err)
    }

    fn query_nodes(&self, sql: &str, keys: &[Key]) -> Result<Vec<Node>> {
        trace!(sql, "query");
        let mut stmt = self.conn.prepare_cached(sql).map_err(storage_err)?;
        let rows = stmt
            .query_map(params_from_iter(keys.iter()), row_to_node)
            .map_err(storage_err)?;
        let nodes = rows.collect::<rusqlite::Result<Vec<_>>>();
        nodes.map_err(storage_err)
    }

    fn query_node<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Option<Node>> {
        trace!(sql, "query");
        let mut stmt = self.conn.prepare_cached(sql).map_err(storage_err)?;
        stmt.query_row(params, row_to_node)
            .optional()
            .map_err(storage_err)
    }

    fn execute<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<u64> {
        trace!(sql, "execute");
        let mut stmt = self.conn.prepare_cached(sql).map_err(storage_err)?;
        let changed = stmt.execute(params).map_err(storage_err)?;
        Ok(changed as u64)
    }
}

impl Repository for SqliteStore {
    fn fetch_where(&mut self, predicate: KeyPredicate) -> Result<Vec<Node>> {
        let (cond, keys) = predicate.to_sql(1, question_placeholder);
        let sql = format!("{} WHERE {cond} ORDER BY left_key", self.select);
        self.query_nodes(&sql, &keys)
    }

    fn fetch_by_id(&mut self, id: NodeId) -> Result<Option<Node>> {
        let sql = format!("{} WHERE id = ?1", self.select);
        self.query_node(&sql, params![id.0])
    }

    fn fetch_by_value(&mut self, value: &str) -> Result<Option<Node>> {
        let sql = format!("{} WHERE value = ?1 ORDER BY left_key LIMIT 1", self.select);
        self.query_node(&sql, params![value])
    }

    fn fetch_containing_ancestor(&mut self, left: Key, right: Key) -> Result<Option<Node>> {
        let sql = format!(
            "{} WHERE left_key < ?1 AND right_key > ?2 ORDER BY left_key DESC LIMIT 1",
            self.select
        );
        self.query_node(&sql, params![left, right])
    }

    fn insert(&mut self, left: Key, right: Key, level: Level, value: &str) -> Result<NodeId> {
        let sql = format!(
            "INSERT INTO {} (left_key, right_key, level, value) VALUES (?1, ?2, ?3, ?4)",
            self.config.table
        );
        self.execute(&sql, params![left, right, level, value])?;
        Ok(NodeId(self.conn.last_insert_rowid()))
    }

    fn update_value(&mut self, id: NodeId, value: &str) -> Result<u64> {
        let sql = format!("UPDATE {} SET value = ?2 WHERE id = ?1", self.config.table);
        self.execute(&sql, params![id.0, value])
    }

    fn shift_keys_where(
        &mut self,
        predicate: KeyPredicate,
        left_delta: Key,
        right_delta: Key,
    ) -> Result<u64> {
        let (cond, keys) = predicate.to_sql(3, question_placeholder);
        let sql = format!(
            "UPDATE {} SET left_key = left_key + ?1, right_key = right_key + ?2 WHERE {cond}",
            self.config.table
        );
        let mut values = vec![left_delta, right_delta];
        values.extend(keys);
        self.execute(&sql, params_from_iter(values))
    }

    fn delete_where(&mut self, predicate: KeyPredicate) -> Result<u64> {
        let (cond, keys) = predicate.to_sql(1, question_placeholder);
        let sql = format!("DELETE FROM {} WHERE {cond}", self.config.table);
        self.execute(&sql, params_from_iter(keys))
    }

    fn park_where(&mut self, predicate: KeyPredicate) -> Result<u64> {
        let (cond, keys) = predicate.to_sql(1, question_placeholder);
        let sql = format!(
            "UPDATE {} SET left_key = -left_key, right_key = -right_key WHERE {cond}",
            self.config.table
        );
        self.execute(&sql, params_from_iter(keys))
    }

    fn unpark(&mut self, offset: Key, level_delta: Level) -> Result<u64> {
        let (cond, _) = KeyPredicate::Parked.to_sql(3, question_placeholder);
        let sql = format!(
            "UPDATE {} SET left_key = -left_key + ?1, right_key = -right_key + ?1, \
             level = level + ?2 WHERE {cond}",
            self.config.table
        );
        self.execute(&sql, params![offset, level_delta])
    }
}

impl Store for SqliteStore {
    fn begin(&mut self) -> Result<()> {
        self.conn.execute_batch("BEGIN IMMEDIATE").map_err(storage_err)
    }

    fn commit(&mut self) -> Result<()> {
        self.conn.execute_batch("COMMIT").map_err(storage_err)
    }

    fn rollback(&mut self) -> Result<()> {
        self.conn.execute_batch("ROLLBACK").map_err(storage_err)
    }
}
