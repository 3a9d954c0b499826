use postgres::Client;
use nestedset_core::{Error, Result, TableName};

const SCHEMA_LOCK_KEY: i64 = 0x6e65737465647365; // "nestedse"

fn schema_sql(table: &TableName) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {table} (
  id BIGSERIAL PRIMARY KEY,
  left_key BIGINT NOT NULL,
  right_key BIGINT NOT NULL,
  level BIGINT NOT NULL DEFAULT 0,
  value TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_{table}_keys
  ON {table} (left_key, right_key);

CREATE INDEX IF NOT EXISTS idx_{table}_value
  ON {table} (value, left_key);
"#
    )
}

pub fn ensure_schema(client: &mut Client, table: &TableName) -> Result<()> {
    // `CREATE TABLE IF NOT EXISTS` is not fully concurrency-safe in Postgres; concurrent calls can
    // still fail with catalog uniqueness violations. Serialize schema creation across processes.
    client
        .query_one("SELECT pg_advisory_lock($1)", &[&SCHEMA_LOCK_KEY])
        .map_err(|e| Error::Storage(format!("{e:?}")))?;

    let res = client
        .batch_execute(&schema_sql(table))
        .map_err(|e| Error::Storage(format!("{e:?}")));

    // Best-effort unlock. Locks are also released when the connection is dropped.
    let _ = client.query_one("SELECT pg_advisory_unlock($1)", &[&SCHEMA_LOCK_KEY]);

    res
}

pub fn drop_table_for_tests(client: &mut Client, table: &TableName) -> Result<()> {
    client
        .batch_execute(&format!("DROP TABLE IF EXISTS {table}"))
        .map_err(|e| Error::Storage(format!("{e:?}")))
}
