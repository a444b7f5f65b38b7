//! Dynamic contract-to-operation dispatch.
//!
//! # Responsibility
//! - Synthesize working contract implementations from declarations.
//! - Route every method invocation to a named operation on the engine.
//!
//! # Invariants
//! - `MapperProxy::invoke` is total: it never returns an error and never
//!   panics, whatever the engine does.
//! - A session is opened per invocation and released before the call
//!   returns, on every exit path.

pub mod factory;

pub use factory::{
    FetchPolicy, MapperProxy, MapperProxyFactory, ProxyCreationError, INTROSPECTION_METHODS,
};
