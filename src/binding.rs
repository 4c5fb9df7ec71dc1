//! Path and query parameter binding.
//!
//! The external router hands over captured path segments and a query
//! multimap; this module coerces them to the declared parameter kinds and
//! collects the results into [`BoundArgs`]. A missing parameter is never an
//! error here; required-ness surfaces later when the handler fails to find
//! the argument it needs. Only an uncoercible value (e.g. `"abc"` declared as
//! int) terminates the request with a binding error.

use crate::errors::DispatchError;
use crate::spec::{ParamKind, ParameterDescriptor, ParameterLocation};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// Arguments bound for one handler invocation, keyed by parameter name.
/// Unbound parameters simply have no entry.
#[derive(Debug, Clone, Default)]
pub struct BoundArgs {
    args: HashMap<String, Value>,
}

impl BoundArgs {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.args.get(name)
    }

    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.args.get(name).and_then(Value::as_str)
    }

    #[must_use]
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.args.get(name).and_then(Value::as_i64)
    }

    #[must_use]
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.args.get(name).and_then(Value::as_bool)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.args.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.args.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    fn insert(&mut self, name: &str, value: Value) {
        self.args.insert(name.to_string(), value);
    }
}

/// Bind every declared parameter from the matched route's captures and the
/// query multimap.
pub fn bind_parameters(
    descriptors: &[ParameterDescriptor],
    path_captures: &HashMap<String, String>,
    query_params: &[(String, String)],
) -> Result<BoundArgs, DispatchError> {
    let mut bound = BoundArgs::default();
    for desc in descriptors {
        match desc.location {
            ParameterLocation::Path => {
                if let Some(raw) = path_captures.get(&desc.name) {
                    bound.insert(&desc.name, coerce(&desc.name, raw, &desc.kind)?);
                }
            }
            ParameterLocation::Query => match &desc.kind {
                // List-kinded query parameters always bind the full
                // repeated-value list, even when empty.
                ParamKind::List(element) => {
                    let mut items = Vec::new();
                    for (_, raw) in query_params.iter().filter(|(k, _)| k == &desc.name) {
                        items.push(coerce(&desc.name, raw, element)?);
                    }
                    bound.insert(&desc.name, Value::Array(items));
                }
                kind => {
                    if let Some((_, raw)) =
                        query_params.iter().find(|(k, _)| k == &desc.name)
                    {
                        bound.insert(&desc.name, coerce(&desc.name, raw, kind)?);
                    }
                }
            },
        }
    }
    debug!(bound_count = bound.len(), "Parameters bound");
    Ok(bound)
}

fn coerce(name: &str, raw: &str, kind: &ParamKind) -> Result<Value, DispatchError> {
    match kind {
        ParamKind::Int => raw
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| bad_value(name, raw, "int")),
        ParamKind::Bool => raw
            .parse::<bool>()
            .map(Value::from)
            .map_err(|_| bad_value(name, raw, "bool")),
        ParamKind::Str => Ok(Value::String(raw.to_string())),
        // A list kind in a scalar position falls back to string, matching
        // the coercion rule for undeclared types.
        ParamKind::List(_) => Ok(Value::String(raw.to_string())),
    }
}

fn bad_value(name: &str, raw: &str, expected: &str) -> DispatchError {
    DispatchError::binding(format!(
        "invalid value '{raw}' for parameter '{name}' (expected {expected})"
    ))
}
