//! One-call wiring from a bootstrap resource to a serving registry.
//!
//! # Responsibility
//! - Open the database, load the statement table, build the engine.
//! - Run the discovery scan into a fresh binding registry.
//!
//! # Invariants
//! - Bootstrap runs once, before the registry is put into service.

use crate::config::BootConfig;
use crate::engine::{
    open_database, open_database_in_memory, EngineError, EngineHandle, SqliteOperationEngine,
    StatementLoadError, StatementTable,
};
use crate::registry::{BindingRegistry, DuplicatePolicy};
use crate::scan::{scan_contracts, ScanError, ScanReport};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// A bootstrapped registry together with its discovery report.
pub struct Bootstrapped {
    pub registry: BindingRegistry,
    pub report: ScanReport,
    pub engine: EngineHandle,
}

impl std::fmt::Debug for Bootstrapped {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bootstrapped")
            .field("registry", &self.registry.component_ids())
            .field("report", &self.report)
            .finish()
    }
}

/// Builds a serving registry from one bootstrap configuration with the
/// default duplicate policy.
pub fn bootstrap(config: &BootConfig) -> Result<Bootstrapped, BootstrapError> {
    bootstrap_with_policy(config, DuplicatePolicy::default())
}

/// Builds a serving registry from one bootstrap configuration.
pub fn bootstrap_with_policy(
    config: &BootConfig,
    policy: DuplicatePolicy,
) -> Result<Bootstrapped, BootstrapError> {
    let conn = if config.uses_memory_database() {
        open_database_in_memory()?
    } else {
        open_database(&config.database)?
    };

    let statements = StatementTable::from_path(&config.statements)?;
    let engine: EngineHandle = Arc::new(SqliteOperationEngine::new(conn, statements));

    let mut registry = BindingRegistry::with_policy(policy);
    let report = scan_contracts(
        &config.contracts_root,
        &config.base_namespace,
        engine.clone(),
        &mut registry,
    )?;

    info!(
        "event=bootstrap module=bootstrap status=ok namespace={} components={}",
        config.base_namespace,
        report.component_ids.len()
    );

    Ok(Bootstrapped {
        registry,
        report,
        engine,
    })
}

/// Startup wiring errors.
#[derive(Debug)]
pub enum BootstrapError {
    Engine(EngineError),
    Statements(StatementLoadError),
    Scan(ScanError),
}

impl Display for BootstrapError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Engine(err) => write!(f, "{err}"),
            Self::Statements(err) => write!(f, "{err}"),
            Self::Scan(err) => write!(f, "{err}"),
        }
    }
}

impl Error for BootstrapError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Engine(err) => Some(err),
            Self::Statements(err) => Some(err),
            Self::Scan(err) => Some(err),
        }
    }
}

impl From<EngineError> for BootstrapError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl From<StatementLoadError> for BootstrapError {
    fn from(value: StatementLoadError) -> Self {
        Self::Statements(value)
    }
}

impl From<ScanError> for BootstrapError {
    fn from(value: ScanError) -> Self {
        Self::Scan(value)
    }
}
