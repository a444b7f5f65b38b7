//! Convention-based binding of data-access contracts to named statements.
//!
//! Contracts are declared, never implemented: discovery finds every
//! declaration under a namespace, the registry holds a deferred construction
//! record per contract, and the first lookup materializes a dispatching
//! proxy whose methods fetch named operations from the engine.

pub mod bootstrap;
pub mod config;
pub mod contract;
pub mod engine;
pub mod logging;
pub mod proxy;
pub mod registry;
pub mod scan;

pub use bootstrap::{bootstrap, bootstrap_with_policy, Bootstrapped, BootstrapError};
pub use config::{BootConfig, ConfigError};
pub use contract::{
    load_descriptor, ContractDescriptor, ContractValidationError, DeclarationKind,
    DescriptorLoadError, MethodDescriptor,
};
pub use engine::{
    open_database, open_database_in_memory, DataValue, EngineError, EngineHandle, EngineResult,
    OperationEngine, OperationSession, SqliteOperationEngine, Statement, StatementLoadError,
    StatementTable, ValueKind,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use proxy::{FetchPolicy, MapperProxy, MapperProxyFactory, ProxyCreationError};
pub use registry::{
    BindingRegistry, ComponentScope, DuplicatePolicy, Registration, RegistrationRecord,
    RegistryError, RegistryResult,
};
pub use scan::{component_id_for, scan_contracts, ScanError, ScanReport, CONTRACT_SUFFIX};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
