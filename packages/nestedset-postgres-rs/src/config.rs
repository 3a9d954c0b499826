use std::str::FromStr;

use nestedset_core::{Error, Result, TableName};

pub const TABLE_ENV: &str = "NESTEDSET_TABLE";
pub const ISOLATION_ENV: &str = "NESTEDSET_ISOLATION";

/// Isolation level every mutation transaction is opened with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadCommitted,
    RepeatableRead,
    /// Guarantees two structural mutations never interleave their range shifts.
    #[default]
    Serializable,
}

impl IsolationLevel {
    pub fn as_sql(self) -> &'static str {
        match self {
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

impl FromStr for IsolationLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace(['-', '_'], " ").as_str() {
            "read committed" => Ok(IsolationLevel::ReadCommitted),
            "repeatable read" => Ok(IsolationLevel::RepeatableRead),
            "serializable" => Ok(IsolationLevel::Serializable),
            other => Err(Error::InvalidOperation(format!(
                "unknown isolation level {other:?}"
            ))),
        }
    }
}

/// PostgreSQL store configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PgConfig {
    /// Table holding the tree.
    pub table: TableName,

    /// Isolation level for mutation transactions.
    pub isolation: IsolationLevel,
}

impl PgConfig {
    pub fn with_table(table: &str) -> Result<Self> {
        Ok(Self {
            table: TableName::new(table)?,
            ..Default::default()
        })
    }

    /// Defaults overridden by `NESTEDSET_TABLE` / `NESTEDSET_ISOLATION` when set.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(table) = std::env::var(TABLE_ENV) {
            config.table = TableName::new(table)?;
        }
        if let Ok(isolation) = std::env::var(ISOLATION_ENV) {
            config.isolation = isolation.parse()?;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_isolation_levels() {
        assert_eq!(
            "read_committed".parse::<IsolationLevel>().unwrap(),
            IsolationLevel::ReadCommitted
        );
        assert_eq!(
            "Repeatable Read".parse::<IsolationLevel>().unwrap(),
            IsolationLevel::RepeatableRead
        );
        assert_eq!(
            "SERIALIZABLE".parse::<IsolationLevel>().unwrap(),
            IsolationLevel::Serializable
        );
        assert!("snapshot".parse::<IsolationLevel>().is_err());
    }

    #[test]
    fn defaults_to_serializable_tree_table() {
        let config = PgConfig::default();
        assert_eq!(config.table.as_str(), "tree");
        assert_eq!(config.isolation.as_sql(), "SERIALIZABLE");
        assert!(PgConfig::with_table("bad name").is_err());
    }
}
