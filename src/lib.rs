//! # specbind
//!
//! **specbind** is a schema-driven request binding, marshalling, authorization,
//! and dispatch engine for Rust, driven by an
//! [OpenAPI 3.1.0](https://spec.openapis.org/oas/v3.1.0) description and
//! running handlers on the `may` coroutine runtime.
//!
//! ## Overview
//!
//! An API description is flattened into an operation index where each
//! operation id names a handler as `Group.method`. For every request the
//! dispatcher authorizes the caller against the operation's declared role
//! requirement, binds and coerces path and query parameters, decodes the JSON
//! body against the handler's registered shape, invokes the handler inside a
//! supervised coroutine with a per-operation deadline, and encodes the result
//! back to JSON. Each failure class maps to exactly one status code.
//!
//! ## Architecture
//!
//! - **[`spec`]** - OpenAPI description loading and the operation index
//! - **[`marshal`]** - type-directed JSON decoding and infallible encoding
//! - **[`binding`]** - path and query parameter binding and coercion
//! - **[`auth`]** - role-requirement evaluation
//! - **[`dispatcher`]** - the phased dispatch pipeline with deadline racing
//! - **[`registry`]** - handler registration keyed by operation id
//! - **[`snapshot`]** - immutable copy-on-write views of JSON objects
//! - **[`presence`]** - three-state field presence tracking
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use specbind::dispatcher::Dispatcher;
//! use specbind::registry::HandlerRegistry;
//! use specbind::spec::load_spec;
//! use std::collections::HashMap;
//!
//! fn main() -> anyhow::Result<()> {
//!     let operations = load_spec("api.yaml")?;
//!
//!     let mut registry = HandlerRegistry::new();
//!     registry.register("Inventory", "get", None, |inv| {
//!         let _id = inv.args.get_str("id");
//!         Ok(None)
//!     })?;
//!
//!     let dispatcher = Dispatcher::new(operations, registry)?;
//!     let reply = dispatcher.dispatch(
//!         "Inventory.get",
//!         HashMap::from([("id".to_string(), "42".to_string())]),
//!         Vec::new(),
//!         None,
//!         vec!["user".to_string()],
//!     );
//!     println!("{} {:?}", reply.status, reply.body);
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod binding;
pub mod dispatcher;
pub mod errors;
pub mod ids;
pub mod marshal;
pub mod presence;
pub mod registry;
pub mod snapshot;
pub mod spec;
pub mod validator;

pub use errors::DispatchError;
pub use ids::RequestId;
pub use presence::Presence;
pub use snapshot::{Snapshot, SnapshotList};
