//! Contract declaration contracts.
//!
//! Declarations are on-disk JSON resources describing a data-access
//! contract's fully-qualified name and method shapes. Discovery reads only
//! the name; full deserialization is deferred to proxy materialization.

pub mod descriptor;

pub use descriptor::{
    load_descriptor, ContractDescriptor, ContractValidationError, DeclarationKind,
    DescriptorLoadError, MethodDescriptor,
};
