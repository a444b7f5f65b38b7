//! Contract discovery and bulk registration.
//!
//! # Responsibility
//! - Enumerate contract declarations under a namespace, any depth.
//! - Read declaration names without deserializing declarations.
//! - Register one deferred construction record per discovered contract.
//!
//! # Invariants
//! - Discovery is all-or-nothing: any I/O or metadata fault aborts the scan.
//! - Enumeration order is unspecified and never observable through the
//!   report, which is sorted.

use crate::contract::descriptor::short_name_of;
use crate::engine::EngineHandle;
use crate::registry::{
    BindingRegistry, ComponentScope, Registration, RegistrationRecord, RegistryError,
};
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// File suffix marking a contract declaration resource.
pub const CONTRACT_SUFFIX: &str = ".contract.json";

// Metadata-only pass: the declaration's name field is captured from raw
// text, the declaration itself stays unparsed until materialization.
static CONTRACT_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""name"\s*:\s*"([^"]+)""#).expect("valid contract name regex"));

/// Derives a component id from a contract's short name.
///
/// Exactly the first character is lowercased: `IUserDao` -> `iUserDao`.
pub fn component_id_for(short_name: &str) -> String {
    let mut chars = short_name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Summary of one discovery run, sorted for deterministic reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Component ids registered by this run.
    pub component_ids: Vec<String>,
    /// Component ids whose earlier registrations were overwritten.
    pub overwritten: Vec<String>,
}

impl ScanReport {
    pub fn len(&self) -> usize {
        self.component_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.component_ids.is_empty()
    }
}

/// Discovers every contract declaration under `base_namespace` and registers
/// a deferred construction record for each into `registry`.
///
/// The namespace is resolved as a directory path beneath `contracts_root`
/// (dots become path separators) and walked recursively. Each declaration
/// contributes one record whose constructor arguments are its contract name
/// and the shared `engine` handle, singleton scoped.
///
/// # Errors
/// Any I/O failure, unreadable metadata, or id conflict under the registry's
/// `Reject` policy aborts the whole scan. A declaration's *shape* is not
/// inspected here; unsuitable contracts fail later, at materialization, one
/// component at a time.
pub fn scan_contracts(
    contracts_root: &Path,
    base_namespace: &str,
    engine: EngineHandle,
    registry: &mut BindingRegistry,
) -> Result<ScanReport, ScanError> {
    let namespace = base_namespace.trim();
    if namespace.is_empty() || !namespace.split('.').all(is_valid_segment) {
        return Err(ScanError::InvalidNamespace(base_namespace.to_string()));
    }

    let namespace_dir = contracts_root.join(namespace.replace('.', "/"));
    if !namespace_dir.is_dir() {
        return Err(ScanError::NamespaceNotFound(namespace_dir));
    }

    info!(
        "event=scan module=scan status=start namespace={} root={}",
        namespace,
        contracts_root.display()
    );

    let mut resources = Vec::new();
    collect_contract_resources(&namespace_dir, &mut resources)?;

    let mut component_ids = BTreeSet::new();
    let mut overwritten = BTreeSet::new();

    for resource in resources {
        let contract_name = read_contract_name(&resource)?;
        let component_id = component_id_for(short_name_of(&contract_name));

        let record = RegistrationRecord {
            component_id: component_id.clone(),
            contract_name,
            resource,
            scope: ComponentScope::Singleton,
            engine: engine.clone(),
        };

        match registry.register(record) {
            Ok(Registration::Fresh) => {}
            // The registry already warns on overwrite; the report carries it.
            Ok(Registration::Overwrote { .. }) => {
                overwritten.insert(component_id.clone());
            }
            Err(source) => {
                return Err(ScanError::Registration {
                    component_id,
                    source,
                });
            }
        }
        component_ids.insert(component_id);
    }

    let report = ScanReport {
        component_ids: component_ids.into_iter().collect(),
        overwritten: overwritten.into_iter().collect(),
    };
    info!(
        "event=scan module=scan status=ok namespace={} registered={} overwritten={}",
        namespace,
        report.component_ids.len(),
        report.overwritten.len()
    );
    Ok(report)
}

fn collect_contract_resources(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), ScanError> {
    let entries = std::fs::read_dir(dir).map_err(|source| ScanError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    for entry in entries {
        let entry = entry.map_err(|source| ScanError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            collect_contract_resources(&path, out)?;
            continue;
        }
        let is_declaration = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(CONTRACT_SUFFIX));
        if is_declaration {
            out.push(path);
        }
    }
    Ok(())
}

fn read_contract_name(resource: &Path) -> Result<String, ScanError> {
    let raw = std::fs::read_to_string(resource).map_err(|source| ScanError::Io {
        path: resource.to_path_buf(),
        source,
    })?;
    let name = CONTRACT_NAME_RE
        .captures(&raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| ScanError::MissingContractName(resource.to_path_buf()))?;

    if !name.split('.').all(is_valid_segment) {
        return Err(ScanError::InvalidContractName {
            path: resource.to_path_buf(),
            name,
        });
    }
    Ok(name)
}

fn is_valid_segment(value: &str) -> bool {
    let mut chars = value.chars();
    let first = match chars.next() {
        Some(c) => c,
        None => return false,
    };
    if !first.is_ascii_alphabetic() && first != '_' {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Discovery faults. All are fatal to the whole scan call.
#[derive(Debug)]
pub enum ScanError {
    InvalidNamespace(String),
    NamespaceNotFound(PathBuf),
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    MissingContractName(PathBuf),
    InvalidContractName {
        path: PathBuf,
        name: String,
    },
    Registration {
        component_id: String,
        source: RegistryError,
    },
}

impl Display for ScanError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidNamespace(value) => write!(f, "invalid base namespace: {value}"),
            Self::NamespaceNotFound(path) => {
                write!(f, "namespace directory not found: {}", path.display())
            }
            Self::Io { path, source } => {
                write!(f, "cannot read `{}`: {source}", path.display())
            }
            Self::MissingContractName(path) => {
                write!(f, "declaration `{}` has no readable name", path.display())
            }
            Self::InvalidContractName { path, name } => {
                write!(f, "declaration `{}` names invalid contract {name}", path.display())
            }
            Self::Registration {
                component_id,
                source,
            } => write!(f, "cannot register {component_id}: {source}"),
        }
    }
}

impl Error for ScanError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Registration { source, .. } => Some(source),
            _ => None,
        }
    }
}
