//! Statement table loading and validation.
//!
//! # Responsibility
//! - Parse the statements resource into the engine's operation table.
//! - Reject malformed tables before the engine is put into service.
//!
//! # Invariants
//! - Operation ids are unique within one table.
//! - Every statement carries non-blank SQL text.

use crate::engine::ValueKind;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// One named operation backed by a SQL statement.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Statement {
    /// Operation id, conventionally `<contract name>.<method name>`.
    pub id: String,
    /// SQL text executed for this operation.
    pub sql: String,
    /// Declared kind of the single result column.
    pub result: ValueKind,
}

#[derive(Debug, Deserialize)]
struct StatementDocument {
    statements: Vec<Statement>,
}

/// Immutable operation-id lookup table for one engine.
#[derive(Debug, Clone, Default)]
pub struct StatementTable {
    statements: BTreeMap<String, Statement>,
}

impl StatementTable {
    /// Parses a statements resource from a reader.
    pub fn from_reader(reader: impl Read) -> Result<Self, StatementLoadError> {
        let document: StatementDocument =
            serde_json::from_reader(reader).map_err(StatementLoadError::Parse)?;

        let mut statements = BTreeMap::new();
        for statement in document.statements {
            if statement.id.trim().is_empty() {
                return Err(StatementLoadError::EmptyStatementId);
            }
            if statement.sql.trim().is_empty() {
                return Err(StatementLoadError::EmptySql(statement.id));
            }
            let id = statement.id.clone();
            if statements.insert(id.clone(), statement).is_some() {
                return Err(StatementLoadError::DuplicateStatementId(id));
            }
        }

        Ok(Self { statements })
    }

    /// Parses a statements resource from a file path.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, StatementLoadError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| StatementLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn get(&self, operation_id: &str) -> Option<&Statement> {
        self.statements.get(operation_id)
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// Statement resource loading errors.
#[derive(Debug)]
pub enum StatementLoadError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
    EmptyStatementId,
    EmptySql(String),
    DuplicateStatementId(String),
}

impl Display for StatementLoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "cannot read statements resource `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid statements resource: {err}"),
            Self::EmptyStatementId => write!(f, "statement id must not be empty"),
            Self::EmptySql(id) => write!(f, "statement {id} has empty sql text"),
            Self::DuplicateStatementId(id) => {
                write!(f, "statement id registered twice: {id}")
            }
        }
    }
}

impl Error for StatementLoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{StatementLoadError, StatementTable};
    use crate::engine::ValueKind;

    #[test]
    fn parses_table_and_indexes_by_id() {
        let table = StatementTable::from_reader(
            r#"{
                "statements": [
                    {
                        "id": "app.dao.IUserDao.queryUserInfoById",
                        "sql": "SELECT name FROM users WHERE id = ?1",
                        "result": "text"
                    }
                ]
            }"#
            .as_bytes(),
        )
        .expect("table should parse");

        assert_eq!(table.len(), 1);
        let statement = table
            .get("app.dao.IUserDao.queryUserInfoById")
            .expect("statement should be indexed");
        assert_eq!(statement.result, ValueKind::Text);
    }

    #[test]
    fn rejects_duplicate_operation_ids() {
        let err = StatementTable::from_reader(
            r#"{
                "statements": [
                    {"id": "a.B.m", "sql": "SELECT 1", "result": "integer"},
                    {"id": "a.B.m", "sql": "SELECT 2", "result": "integer"}
                ]
            }"#
            .as_bytes(),
        )
        .expect_err("duplicate ids must fail");
        assert!(matches!(err, StatementLoadError::DuplicateStatementId(id) if id == "a.B.m"));
    }

    #[test]
    fn rejects_blank_sql() {
        let err = StatementTable::from_reader(
            r#"{"statements": [{"id": "a.B.m", "sql": "   ", "result": "unit"}]}"#.as_bytes(),
        )
        .expect_err("blank sql must fail");
        assert!(matches!(err, StatementLoadError::EmptySql(id) if id == "a.B.m"));
    }

    #[test]
    fn empty_table_is_valid() {
        let table = StatementTable::from_reader(r#"{"statements": []}"#.as_bytes())
            .expect("empty table should parse");
        assert!(table.is_empty());
    }
}
