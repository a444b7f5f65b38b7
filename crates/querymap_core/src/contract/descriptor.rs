//! Contract descriptor model, validation and full-load pass.

use crate::engine::ValueKind;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Declaration kind for one descriptor resource.
///
/// Only `contract` declarations are eligible for proxying; `record` marks a
/// concrete data shape that happens to live in the same namespace tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationKind {
    Contract,
    Record,
}

/// One declared method: a name, at most one parameter, and a return kind.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MethodDescriptor {
    pub name: String,
    /// Declared parameter kind. Dispatch forwards at most one argument, so
    /// the declaration format does not admit more.
    #[serde(default)]
    pub param: Option<ValueKind>,
    pub returns: ValueKind,
}

/// Deserialized contract declaration.
///
/// Identity is the fully-qualified `name`. Declarations are immutable once
/// loaded.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContractDescriptor {
    /// Fully-qualified, dot-separated contract name, e.g. `app.dao.IUserDao`.
    pub name: String,
    #[serde(default = "default_kind")]
    pub kind: DeclarationKind,
    /// Generic type parameters. Must be empty for a proxyable contract.
    #[serde(default)]
    pub type_params: Vec<String>,
    /// Declared state fields. Must be empty for a proxyable contract.
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub methods: Vec<MethodDescriptor>,
}

fn default_kind() -> DeclarationKind {
    DeclarationKind::Contract
}

impl ContractDescriptor {
    /// Validates declaration-level invariants: a well-formed qualified name
    /// and unique, well-formed method names.
    pub fn validate(&self) -> Result<(), ContractValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ContractValidationError::EmptyName);
        }
        if !is_valid_qualified_name(name) {
            return Err(ContractValidationError::InvalidName(self.name.clone()));
        }

        let mut seen = BTreeSet::new();
        for method in &self.methods {
            let method_name = method.name.trim();
            if method_name.is_empty() {
                return Err(ContractValidationError::EmptyMethodName);
            }
            if !is_valid_identifier(method_name) {
                return Err(ContractValidationError::InvalidMethodName(
                    method.name.clone(),
                ));
            }
            if !seen.insert(method_name.to_string()) {
                return Err(ContractValidationError::DuplicateMethodName(
                    method_name.to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Returns the unqualified short name (the segment after the last dot).
    pub fn short_name(&self) -> &str {
        short_name_of(&self.name)
    }
}

/// Returns the unqualified short name of a fully-qualified contract name.
pub(crate) fn short_name_of(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

fn is_valid_qualified_name(value: &str) -> bool {
    let mut segments = value.split('.').peekable();
    if segments.peek().is_none() {
        return false;
    }
    segments.all(is_valid_identifier)
}

fn is_valid_identifier(value: &str) -> bool {
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

/// Declaration-level validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractValidationError {
    EmptyName,
    InvalidName(String),
    EmptyMethodName,
    InvalidMethodName(String),
    DuplicateMethodName(String),
}

impl Display for ContractValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "contract name must not be empty"),
            Self::InvalidName(value) => write!(f, "contract name is invalid: {value}"),
            Self::EmptyMethodName => write!(f, "contract method name must not be empty"),
            Self::InvalidMethodName(value) => {
                write!(f, "contract method name is invalid: {value}")
            }
            Self::DuplicateMethodName(value) => {
                write!(f, "contract method declared twice: {value}")
            }
        }
    }
}

impl Error for ContractValidationError {}

/// Loads and validates a full contract declaration.
///
/// This is the deferred materialization pass; discovery itself only reads
/// the declaration's name.
pub fn load_descriptor(path: impl AsRef<Path>) -> Result<ContractDescriptor, DescriptorLoadError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| DescriptorLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let descriptor: ContractDescriptor =
        serde_json::from_str(&raw).map_err(|source| DescriptorLoadError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    descriptor
        .validate()
        .map_err(DescriptorLoadError::Validation)?;
    Ok(descriptor)
}

/// Full-load errors for contract declarations.
#[derive(Debug)]
pub enum DescriptorLoadError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    Validation(ContractValidationError),
}

impl Display for DescriptorLoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "cannot read declaration `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "invalid declaration `{}`: {source}", path.display())
            }
            Self::Validation(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DescriptorLoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Validation(err) => Some(err),
        }
    }
}
