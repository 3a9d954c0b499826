use crate::error::{Error, Result};

/// PostgreSQL truncates identifiers beyond this length.
const MAX_TABLE_NAME_LEN: usize = 63;

/// Name of the table holding the tree.
///
/// Table names cannot be bound as statement parameters, so they are restricted to plain
/// identifiers before being spliced into SQL text.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TableName(String);

impl TableName {
    pub const DEFAULT: &'static str = "tree";

    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let mut chars = name.chars();
        let valid_head = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        let valid_tail = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid_head || !valid_tail || name.len() > MAX_TABLE_NAME_LEN {
            return Err(Error::InvalidOperation(format!(
                "invalid table name {name:?}"
            )));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TableName {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl std::fmt::Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
