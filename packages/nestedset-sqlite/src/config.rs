use nestedset_core::TableName;

/// SQLite store configuration.
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Path to database file (or ":memory:" for in-memory)
    pub path: String,

    /// Table holding the tree.
    pub table: TableName,

    /// Enable WAL mode so readers are not blocked by a running mutation
    pub wal_mode: bool,

    /// Busy timeout in milliseconds
    pub busy_timeout_ms: u32,
}

impl SqliteConfig {
    pub const MEMORY_PATH: &'static str = ":memory:";

    pub fn in_memory() -> Self {
        Self {
            path: Self::MEMORY_PATH.to_string(),
            wal_mode: false,
            ..Default::default()
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.path == Self::MEMORY_PATH
    }
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: "nestedset.db".to_string(),
            table: TableName::default(),
            wal_mode: true,
            busy_timeout_ms: 5000,
        }
    }
}
