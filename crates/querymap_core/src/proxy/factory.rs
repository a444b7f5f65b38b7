//! Proxy factory and generated-dispatch runtime.

use crate::contract::{ContractDescriptor, ContractValidationError, DeclarationKind, MethodDescriptor};
use crate::engine::{DataValue, EngineHandle, EngineResult};
use log::{error, info, warn};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Method names resolved locally by every proxy, never routed through the
/// engine. Routing them would fail against an engine that has no matching
/// operation.
pub const INTROSPECTION_METHODS: &[&str] = &["to_string", "type_name"];

/// Policy applied when a fetch yields no row or the engine fails.
///
/// `DefaultOnMiss` is the only supported policy: missing rows and engine
/// failures both resolve to the declared return kind's zero value, so
/// generated methods are total and callers never observe an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchPolicy {
    #[default]
    DefaultOnMiss,
}

/// Builds dispatching proxies from validated contract declarations.
#[derive(Debug, Clone, Copy, Default)]
pub struct MapperProxyFactory {
    policy: FetchPolicy,
}

impl MapperProxyFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a proxy for `descriptor` dispatching through `engine`.
    ///
    /// Only pure contract declarations are eligible: a record kind, declared
    /// state fields or type parameters reject the whole declaration rather
    /// than producing a partially-working instance.
    pub fn create_proxy(
        &self,
        descriptor: ContractDescriptor,
        engine: EngineHandle,
    ) -> Result<MapperProxy, ProxyCreationError> {
        descriptor
            .validate()
            .map_err(ProxyCreationError::InvalidDeclaration)?;

        if descriptor.kind != DeclarationKind::Contract {
            return Err(ProxyCreationError::NotAContract {
                name: descriptor.name,
                kind: descriptor.kind,
            });
        }
        if !descriptor.fields.is_empty() {
            return Err(ProxyCreationError::StatefulContract {
                name: descriptor.name,
                field_count: descriptor.fields.len(),
            });
        }
        if !descriptor.type_params.is_empty() {
            return Err(ProxyCreationError::GenericContract {
                name: descriptor.name,
            });
        }

        // The operation table is built once per contract; dispatch is a
        // name lookup from here on.
        let mut methods = BTreeMap::new();
        for method in descriptor.methods {
            methods.insert(method.name.clone(), method);
        }

        info!(
            "event=proxy_create module=proxy status=ok contract={} methods={}",
            descriptor.name,
            methods.len()
        );

        Ok(MapperProxy {
            contract_name: descriptor.name,
            methods,
            engine,
            policy: self.policy,
        })
    }
}

/// Generated implementation of one contract.
///
/// Owns nothing beyond the descriptor-derived method table and the shared
/// engine handle. One singleton per contract, held by the registry.
pub struct MapperProxy {
    contract_name: String,
    methods: BTreeMap<String, MethodDescriptor>,
    engine: EngineHandle,
    policy: FetchPolicy,
}

impl MapperProxy {
    pub fn contract_name(&self) -> &str {
        &self.contract_name
    }

    pub fn method_names(&self) -> Vec<&str> {
        self.methods.keys().map(String::as_str).collect()
    }

    pub fn policy(&self) -> FetchPolicy {
        self.policy
    }

    /// Derives the operation id for one of this contract's methods.
    pub fn operation_id(&self, method: &str) -> String {
        format!("{}.{}", self.contract_name, method)
    }

    /// Invokes a contract method by name.
    ///
    /// Total by contract: introspection names resolve locally, misses and
    /// engine failures resolve to the declared return kind's default value.
    /// Only the first argument is forwarded to the engine.
    pub fn invoke(&self, method: &str, args: &[DataValue]) -> DataValue {
        if let Some(value) = self.introspect(method) {
            return value;
        }

        if args.len() > 1 {
            // Single-parameter dispatch policy: surplus arguments are not
            // forwarded, and never silently.
            warn!(
                "event=proxy_dispatch module=proxy status=warn contract={} method={} \
                 ignored_args={}",
                self.contract_name,
                method,
                args.len() - 1
            );
        }

        let operation_id = self.operation_id(method);
        let declared = self.methods.get(method);
        if declared.is_none() {
            warn!(
                "event=proxy_dispatch module=proxy status=warn contract={} method={} \
                 undeclared_method=true",
                self.contract_name, method
            );
        }
        let param = args.first().cloned().unwrap_or(DataValue::Null);

        match self.fetch(&operation_id, &param) {
            Ok(Some(value)) => match declared {
                Some(descriptor) => descriptor.returns.coerce(value),
                None => value,
            },
            Ok(None) => {
                info!(
                    "event=proxy_dispatch module=proxy status=miss operation={operation_id}"
                );
                self.default_for(declared)
            }
            Err(err) => {
                // FetchPolicy::DefaultOnMiss: engine failures are downgraded
                // to the declared default; callers never observe them.
                error!(
                    "event=proxy_dispatch module=proxy status=error operation={operation_id} \
                     error={err}"
                );
                self.default_for(declared)
            }
        }
    }

    fn introspect(&self, method: &str) -> Option<DataValue> {
        match method {
            "to_string" => Some(DataValue::Text(self.to_string())),
            "type_name" => Some(DataValue::Text(self.contract_name.clone())),
            _ => None,
        }
    }

    fn fetch(&self, operation_id: &str, param: &DataValue) -> EngineResult<Option<DataValue>> {
        let mut session = self.engine.open_session()?;
        session.fetch_one(operation_id, param)
        // Session dropped here, releasing it on every exit path.
    }

    fn default_for(&self, declared: Option<&MethodDescriptor>) -> DataValue {
        match self.policy {
            FetchPolicy::DefaultOnMiss => declared
                .map(|descriptor| descriptor.returns.default_value())
                .unwrap_or(DataValue::Null),
        }
    }
}

impl Display for MapperProxy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "proxy for {}", self.contract_name)
    }
}

impl std::fmt::Debug for MapperProxy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapperProxy")
            .field("contract_name", &self.contract_name)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("policy", &self.policy)
            .finish()
    }
}

/// Contract declarations unsuitable for proxying.
///
/// Fatal to the single component being materialized; never aborts a
/// discovery run.
#[derive(Debug)]
pub enum ProxyCreationError {
    InvalidDeclaration(ContractValidationError),
    NotAContract {
        name: String,
        kind: DeclarationKind,
    },
    StatefulContract {
        name: String,
        field_count: usize,
    },
    GenericContract {
        name: String,
    },
}

impl Display for ProxyCreationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidDeclaration(err) => write!(f, "{err}"),
            Self::NotAContract { name, kind } => {
                write!(f, "{name} is not a pure contract declaration (kind {kind:?})")
            }
            Self::StatefulContract { name, field_count } => {
                write!(f, "{name} declares {field_count} state field(s) and cannot be proxied")
            }
            Self::GenericContract { name } => {
                write!(f, "{name} declares type parameters and cannot be proxied")
            }
        }
    }
}

impl Error for ProxyCreationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidDeclaration(err) => Some(err),
            _ => None,
        }
    }
}
