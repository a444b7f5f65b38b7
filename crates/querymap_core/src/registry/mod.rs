//! Binding registry: deferred construction records and singleton proxies.
//!
//! # Responsibility
//! - Own registration records produced by discovery.
//! - Materialize and cache one proxy per component on first lookup.
//!
//! # Invariants
//! - A materialization failure is fatal to that component only.
//! - Cached instances live for the registry's lifetime.

use crate::contract::{load_descriptor, DescriptorLoadError};
use crate::engine::EngineHandle;
use crate::proxy::{MapperProxy, MapperProxyFactory, ProxyCreationError};
use log::{info, warn};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Lifecycle scope for a registered component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentScope {
    Singleton,
}

/// Duplicate component-id policy at the registry boundary.
///
/// `WarnOverwrite` matches the compatible last-write-wins behavior but logs
/// every overwrite; `Reject` turns a collision into a hard error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    Reject,
    #[default]
    WarnOverwrite,
}

/// Deferred construction instruction for one component.
///
/// Carries the constructor arguments the materialization pass needs: the
/// contract's fully-qualified name, its declaration resource, and the shared
/// engine handle.
#[derive(Clone)]
pub struct RegistrationRecord {
    pub component_id: String,
    pub contract_name: String,
    pub resource: PathBuf,
    pub scope: ComponentScope,
    pub engine: EngineHandle,
}

impl std::fmt::Debug for RegistrationRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationRecord")
            .field("component_id", &self.component_id)
            .field("contract_name", &self.contract_name)
            .field("resource", &self.resource)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Outcome of one registration submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    Fresh,
    /// An earlier record held the id; its contract name is reported.
    Overwrote { previous_contract: String },
}

/// Registry owning registration records and materialized singleton proxies.
pub struct BindingRegistry {
    policy: DuplicatePolicy,
    factory: MapperProxyFactory,
    records: BTreeMap<String, RegistrationRecord>,
    // Dispatch may be concurrent after registration completes; records are
    // only written during the single-threaded scan.
    instances: Mutex<BTreeMap<String, Arc<MapperProxy>>>,
}

impl Default for BindingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self::with_policy(DuplicatePolicy::default())
    }

    pub fn with_policy(policy: DuplicatePolicy) -> Self {
        Self {
            policy,
            factory: MapperProxyFactory::new(),
            records: BTreeMap::new(),
            instances: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Submits one registration record under its component id.
    ///
    /// Duplicate ids follow the registry policy: `Reject` fails, while
    /// `WarnOverwrite` replaces the record (and evicts any materialized
    /// instance) with a logged warning.
    pub fn register(&mut self, record: RegistrationRecord) -> RegistryResult<Registration> {
        let id = record.component_id.clone();
        let previous_contract = self
            .records
            .get(&id)
            .map(|existing| existing.contract_name.clone());

        match previous_contract {
            None => {
                info!(
                    "event=registry_register module=registry status=ok component={} contract={}",
                    id, record.contract_name
                );
                self.records.insert(id, record);
                Ok(Registration::Fresh)
            }
            Some(previous_contract) => match self.policy {
                DuplicatePolicy::Reject => Err(RegistryError::DuplicateComponentId(id)),
                DuplicatePolicy::WarnOverwrite => {
                    warn!(
                        "event=registry_register module=registry status=warn component={} \
                         overwrote={} with={}",
                        id, previous_contract, record.contract_name
                    );
                    self.records.insert(id.clone(), record);
                    self.evict_instance(&id);
                    Ok(Registration::Overwrote { previous_contract })
                }
            },
        }
    }

    /// Returns the materialized proxy for a component id, building and
    /// caching it on first lookup.
    pub fn get(&self, component_id: &str) -> RegistryResult<Arc<MapperProxy>> {
        let mut instances = self
            .instances
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(proxy) = instances.get(component_id) {
            return Ok(Arc::clone(proxy));
        }

        let record = self
            .records
            .get(component_id)
            .ok_or_else(|| RegistryError::UnknownComponent(component_id.to_string()))?;

        let descriptor =
            load_descriptor(&record.resource).map_err(|source| RegistryError::Descriptor {
                component_id: component_id.to_string(),
                source,
            })?;

        // The full declaration must agree with the name captured by the
        // discovery metadata pass.
        if descriptor.name != record.contract_name {
            return Err(RegistryError::ContractMismatch {
                component_id: component_id.to_string(),
                registered: record.contract_name.clone(),
                loaded: descriptor.name,
            });
        }

        let proxy = self
            .factory
            .create_proxy(descriptor, record.engine.clone())
            .map_err(|source| RegistryError::Proxy {
                component_id: component_id.to_string(),
                source,
            })?;

        let proxy = Arc::new(proxy);
        instances.insert(component_id.to_string(), Arc::clone(&proxy));
        info!(
            "event=registry_materialize module=registry status=ok component={component_id}"
        );
        Ok(proxy)
    }

    pub fn record(&self, component_id: &str) -> Option<&RegistrationRecord> {
        self.records.get(component_id)
    }

    /// Registered component ids in sorted order.
    pub fn component_ids(&self) -> Vec<String> {
        self.records.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn evict_instance(&self, component_id: &str) {
        let mut instances = self
            .instances
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        instances.remove(component_id);
    }
}

/// Registry-side errors.
#[derive(Debug)]
pub enum RegistryError {
    DuplicateComponentId(String),
    UnknownComponent(String),
    Descriptor {
        component_id: String,
        source: DescriptorLoadError,
    },
    ContractMismatch {
        component_id: String,
        registered: String,
        loaded: String,
    },
    Proxy {
        component_id: String,
        source: ProxyCreationError,
    },
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateComponentId(id) => {
                write!(f, "component id already registered: {id}")
            }
            Self::UnknownComponent(id) => write!(f, "unknown component id: {id}"),
            Self::Descriptor {
                component_id,
                source,
            } => write!(f, "cannot load declaration for {component_id}: {source}"),
            Self::ContractMismatch {
                component_id,
                registered,
                loaded,
            } => write!(
                f,
                "declaration for {component_id} names {loaded}, but {registered} was registered"
            ),
            Self::Proxy {
                component_id,
                source,
            } => write!(f, "cannot create proxy for {component_id}: {source}"),
        }
    }
}

impl Error for RegistryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Descriptor { source, .. } => Some(source),
            Self::Proxy { source, .. } => Some(source),
            _ => None,
        }
    }
}
