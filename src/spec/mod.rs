//! # Operation Index
//!
//! Flattens an OpenAPI description into immutable [`OperationDescriptor`]s,
//! one per path/method pair, in document encounter order. Built once at
//! startup; a malformed description (unparseable operation id, unsupported
//! parameter) is fatal and aborts startup.

mod build;
mod load;
mod types;

pub use build::build_operations;
pub use load::{load_spec, load_spec_from_spec};
pub use types::{
    OperationDescriptor, ParamKind, ParameterDescriptor, ParameterLocation, DEFAULT_TIMEOUT_MS,
};
