//! Operation engine boundary and uniform value model.
//!
//! # Responsibility
//! - Define the engine seam every generated proxy dispatches through.
//! - Provide the runtime value model shared by parameters and results.
//!
//! # Invariants
//! - A session is scoped to exactly one fetch and released by drop.
//! - `ValueKind` defaults are total: every declared kind has a zero value.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub mod sqlite;
pub mod statements;

pub use sqlite::{open_database, open_database_in_memory, SqliteOperationEngine};
pub use statements::{Statement, StatementLoadError, StatementTable};

pub type EngineResult<T> = Result<T, EngineError>;

/// Shared, read-only handle to an operation engine.
///
/// One handle is cloned into every registration record and proxy; each
/// dispatch opens its own short-lived session against it.
pub type EngineHandle = Arc<dyn OperationEngine + Send + Sync>;

/// Executes named operations. The sole seam between generated proxies and
/// whatever actually runs statements.
pub trait OperationEngine {
    /// Opens a working session scoped to a single fetch.
    fn open_session(&self) -> EngineResult<Box<dyn OperationSession + '_>>;
}

/// One call-scoped working session.
///
/// Sessions are released deterministically when dropped; they must never be
/// cached or shared across dispatches.
pub trait OperationSession {
    /// Fetches exactly zero or one result for a named operation.
    ///
    /// # Errors
    /// - `EngineError::UnknownOperation` when no statement is registered
    ///   under `operation_id`.
    /// - `EngineError::NonUniqueResult` when the statement yields more than
    ///   one row.
    fn fetch_one(
        &mut self,
        operation_id: &str,
        param: &DataValue,
    ) -> EngineResult<Option<DataValue>>;
}

/// Runtime value passed to and returned from the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Display for DataValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Boolean(value) => write!(f, "{value}"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Real(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "{value}"),
        }
    }
}

/// Declared value kind for method parameters, return types and statement
/// results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Unit,
    Boolean,
    Integer,
    Real,
    Text,
}

impl ValueKind {
    /// Returns the zero value for this kind.
    ///
    /// Generated methods resolve to this value when a fetch yields no row
    /// or the engine fails.
    pub fn default_value(self) -> DataValue {
        match self {
            Self::Unit => DataValue::Null,
            Self::Boolean => DataValue::Boolean(false),
            Self::Integer => DataValue::Integer(0),
            Self::Real => DataValue::Real(0.0),
            Self::Text => DataValue::Text(String::new()),
        }
    }

    /// Coerces an engine result into this declared kind.
    ///
    /// Exact matches pass through. Integers widen to reals, `0`/`1` narrow
    /// to booleans, and numeric values format into text. Anything else
    /// resolves to the kind's zero value so dispatch stays total.
    pub fn coerce(self, value: DataValue) -> DataValue {
        match (self, value) {
            (Self::Unit, _) => DataValue::Null,
            (Self::Boolean, DataValue::Boolean(v)) => DataValue::Boolean(v),
            (Self::Boolean, DataValue::Integer(v)) => DataValue::Boolean(v != 0),
            (Self::Integer, DataValue::Integer(v)) => DataValue::Integer(v),
            (Self::Real, DataValue::Real(v)) => DataValue::Real(v),
            (Self::Real, DataValue::Integer(v)) => DataValue::Real(v as f64),
            (Self::Text, DataValue::Text(v)) => DataValue::Text(v),
            (Self::Text, DataValue::Integer(v)) => DataValue::Text(v.to_string()),
            (Self::Text, DataValue::Real(v)) => DataValue::Text(v.to_string()),
            (kind, _) => kind.default_value(),
        }
    }
}

/// Engine-side failures.
///
/// These never escape a generated method: proxy dispatch logs and downgrades
/// them to the declared kind's default value.
#[derive(Debug)]
pub enum EngineError {
    /// No statement is registered under the requested operation id.
    UnknownOperation(String),
    /// A zero-or-one fetch matched more than one row.
    NonUniqueResult(String),
    /// Underlying SQLite failure.
    Sqlite(rusqlite::Error),
    /// The engine cannot serve sessions right now.
    Unavailable(String),
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownOperation(id) => write!(f, "unknown operation id: {id}"),
            Self::NonUniqueResult(id) => {
                write!(f, "operation {id} returned more than one row")
            }
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Unavailable(message) => write!(f, "engine unavailable: {message}"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for EngineError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
