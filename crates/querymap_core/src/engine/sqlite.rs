//! SQLite-backed operation engine.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the operation engine.
//! - Execute named statements with zero-or-one-row fetch semantics.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON`.
//! - Each session holds the connection for exactly one fetch; concurrent
//!   dispatchers serialize on the connection mutex.

use crate::engine::{
    DataValue, EngineError, EngineResult, OperationEngine, OperationSession, StatementTable,
};
use log::{error, info};
use rusqlite::types::Value;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

/// Opens a SQLite database file configured for engine use.
///
/// # Side effects
/// - Emits `engine_open` logging events with duration and status.
pub fn open_database(path: impl AsRef<Path>) -> EngineResult<Connection> {
    let started_at = Instant::now();
    info!("event=engine_open module=engine status=start mode=file");

    match Connection::open(path).and_then(configure_connection) {
        Ok(conn) => {
            info!(
                "event=engine_open module=engine status=ok mode=file duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=engine_open module=engine status=error mode=file duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err.into())
        }
    }
}

/// Opens an in-memory SQLite database configured for engine use.
pub fn open_database_in_memory() -> EngineResult<Connection> {
    let started_at = Instant::now();
    info!("event=engine_open module=engine status=start mode=memory");

    match Connection::open_in_memory().and_then(configure_connection) {
        Ok(conn) => {
            info!(
                "event=engine_open module=engine status=ok mode=memory duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=engine_open module=engine status=error mode=memory duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err.into())
        }
    }
}

fn configure_connection(conn: Connection) -> Result<Connection, rusqlite::Error> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    Ok(conn)
}

/// Operation engine executing named statements over one SQLite connection.
pub struct SqliteOperationEngine {
    conn: Mutex<Connection>,
    statements: StatementTable,
}

impl SqliteOperationEngine {
    pub fn new(conn: Connection, statements: StatementTable) -> Self {
        Self {
            conn: Mutex::new(conn),
            statements,
        }
    }

    pub fn statement_count(&self) -> usize {
        self.statements.len()
    }
}

impl OperationEngine for SqliteOperationEngine {
    fn open_session(&self) -> EngineResult<Box<dyn OperationSession + '_>> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| EngineError::Unavailable("connection mutex poisoned".to_string()))?;
        Ok(Box::new(SqliteSession {
            conn,
            statements: &self.statements,
        }))
    }
}

struct SqliteSession<'engine> {
    conn: MutexGuard<'engine, Connection>,
    statements: &'engine StatementTable,
}

impl OperationSession for SqliteSession<'_> {
    fn fetch_one(
        &mut self,
        operation_id: &str,
        param: &DataValue,
    ) -> EngineResult<Option<DataValue>> {
        let statement = self
            .statements
            .get(operation_id)
            .ok_or_else(|| EngineError::UnknownOperation(operation_id.to_string()))?;

        let mut prepared = self.conn.prepare(&statement.sql)?;
        let mut rows = if prepared.parameter_count() == 0 {
            prepared.query([])?
        } else {
            prepared.query(params![to_sql_value(param)])?
        };

        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let value = from_sql_value(row.get::<_, Value>(0)?);

        if rows.next()?.is_some() {
            return Err(EngineError::NonUniqueResult(operation_id.to_string()));
        }

        Ok(Some(statement.result.coerce(value)))
    }
}

fn to_sql_value(value: &DataValue) -> Value {
    match value {
        DataValue::Null => Value::Null,
        DataValue::Boolean(v) => Value::Integer(i64::from(*v)),
        DataValue::Integer(v) => Value::Integer(*v),
        DataValue::Real(v) => Value::Real(*v),
        DataValue::Text(v) => Value::Text(v.clone()),
    }
}

fn from_sql_value(value: Value) -> DataValue {
    match value {
        Value::Null => DataValue::Null,
        Value::Integer(v) => DataValue::Integer(v),
        Value::Real(v) => DataValue::Real(v),
        Value::Text(v) => DataValue::Text(v),
        // Blob columns are outside the declared value model.
        Value::Blob(_) => DataValue::Null,
    }
}
