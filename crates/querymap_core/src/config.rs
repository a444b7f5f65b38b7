//! Bootstrap configuration resource.
//!
//! # Responsibility
//! - Parse the startup resource naming the namespace, contracts root,
//!   statements resource and database location.
//! - Resolve relative paths against the resource's own directory.

use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

fn default_database() -> String {
    ":memory:".to_string()
}

/// Startup configuration for one bootstrap run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BootConfig {
    /// Dot-separated namespace scanned for contract declarations.
    pub base_namespace: String,
    /// Directory containing the namespace tree.
    pub contracts_root: PathBuf,
    /// Statements resource consumed by the operation engine.
    pub statements: PathBuf,
    /// SQLite database path, or `:memory:`.
    #[serde(default = "default_database")]
    pub database: String,
}

impl BootConfig {
    /// Loads a bootstrap resource and resolves its relative paths against
    /// the resource's parent directory.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: BootConfig =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        if config.base_namespace.trim().is_empty() {
            return Err(ConfigError::EmptyNamespace);
        }

        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        config.contracts_root = resolve(base_dir, &config.contracts_root);
        config.statements = resolve(base_dir, &config.statements);
        Ok(config)
    }

    pub fn uses_memory_database(&self) -> bool {
        self.database == ":memory:"
    }
}

fn resolve(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// Bootstrap resource errors.
#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    EmptyNamespace,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "cannot read config `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "invalid config `{}`: {source}", path.display())
            }
            Self::EmptyNamespace => write!(f, "config base_namespace must not be empty"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::EmptyNamespace => None,
        }
    }
}
