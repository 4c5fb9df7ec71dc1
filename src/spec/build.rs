use super::types::{
    OperationDescriptor, ParamKind, ParameterDescriptor, ParameterLocation, DEFAULT_TIMEOUT_MS,
};
use crate::auth::RoleRequirement;
use crate::validator::{fail_if_issues, ValidationIssue};
use oas3::spec::{ObjectOrReference, Parameter};
use oas3::OpenApiV3Spec;
use serde_json::Value;
use std::time::Duration;
use tracing::info;

/// Rewrite `{name}` placeholders into the external router's `:name` syntax,
/// preserving position and name.
fn convert_path(path: &str) -> String {
    path.replace('{', ":").replace('}', "")
}

/// Parse an operation id into its `(group, method)` pair. Exactly two
/// non-empty dot-separated segments are required.
fn parse_operation_id(op_id: &str) -> Option<(String, String)> {
    let mut segments = op_id.split('.');
    match (segments.next(), segments.next(), segments.next()) {
        (Some(group), Some(method), None) if !group.is_empty() && !method.is_empty() => {
            Some((group.to_string(), method.to_string()))
        }
        _ => None,
    }
}

fn extract_roles(
    operation: &oas3::spec::Operation,
    location: &str,
    issues: &mut Vec<ValidationIssue>,
) -> Option<RoleRequirement> {
    // Some parser versions strip the "x-" prefix from extension keys.
    let raw = operation
        .extensions
        .get("x-auth-roles")
        .or_else(|| operation.extensions.get("auth-roles"))?;
    match serde_json::from_value::<RoleRequirement>(raw.clone()) {
        Ok(req) if req.is_empty() => None,
        Ok(req) => Some(req),
        Err(e) => {
            issues.push(ValidationIssue::new(
                location,
                "BadRoleRequirement",
                format!("malformed x-auth-roles extension: {e}"),
            ));
            None
        }
    }
}

/// Per-operation timeout override from the `x-timeout-millis` extension,
/// accepting either a number or a numeric string.
fn extract_timeout(operation: &oas3::spec::Operation) -> Duration {
    let ms = operation
        .extensions
        .get("x-timeout-millis")
        .or_else(|| operation.extensions.get("timeout-millis"))
        .and_then(|v| v.as_u64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
        .unwrap_or(DEFAULT_TIMEOUT_MS);
    Duration::from_millis(ms)
}

fn param_kind(schema: Option<&Value>) -> ParamKind {
    match schema.and_then(|s| s.get("type")).and_then(Value::as_str) {
        Some("integer") => ParamKind::Int,
        Some("boolean") => ParamKind::Bool,
        Some("array") => {
            let items = schema.and_then(|s| s.get("items"));
            ParamKind::List(Box::new(param_kind(items)))
        }
        _ => ParamKind::Str,
    }
}

fn resolve_parameter_ref<'a>(
    spec: &'a OpenApiV3Spec,
    ref_path: &str,
) -> Option<&'a oas3::spec::Parameter> {
    if let Some(name) = ref_path.strip_prefix("#/components/parameters/") {
        spec.components
            .as_ref()?
            .parameters
            .get(name)
            .and_then(|param_ref| match param_ref {
                ObjectOrReference::Object(param) => Some(param),
                _ => None,
            })
    } else {
        None
    }
}

fn extract_parameters(
    spec: &OpenApiV3Spec,
    params: &[ObjectOrReference<Parameter>],
) -> Vec<ParameterDescriptor> {
    let mut out = Vec::new();
    for p in params {
        let param = match p {
            ObjectOrReference::Object(obj) => Some(obj),
            ObjectOrReference::Ref { ref_path, .. } => resolve_parameter_ref(spec, ref_path),
        };

        if let Some(param) = param {
            let location = match param.location {
                oas3::spec::ParameterIn::Path => ParameterLocation::Path,
                oas3::spec::ParameterIn::Query => ParameterLocation::Query,
                // Header/cookie parameters are the transport's concern.
                _ => continue,
            };
            let schema = param.schema.as_ref().and_then(|s| match s {
                ObjectOrReference::Object(obj) => serde_json::to_value(obj).ok(),
                ObjectOrReference::Ref { .. } => None,
            });

            out.push(ParameterDescriptor {
                name: param.name.clone(),
                location,
                kind: param_kind(schema.as_ref()),
            });
        }
    }
    out
}

/// Flatten every path/method pair of the description into an
/// [`OperationDescriptor`], in document encounter order.
///
/// # Errors
///
/// Any unparseable operation id or malformed role extension is collected and
/// aggregated into a single fatal error; startup must not proceed.
pub fn build_operations(spec: &OpenApiV3Spec) -> anyhow::Result<Vec<OperationDescriptor>> {
    let mut operations = Vec::new();
    let mut issues = Vec::new();

    if let Some(paths_map) = spec.paths.as_ref() {
        for (path, item) in paths_map {
            for (method, operation) in item.methods() {
                let location = format!("{method} {path}");

                let op_id = match operation.operation_id.clone() {
                    Some(id) => id,
                    None => {
                        issues.push(ValidationIssue::new(
                            &location,
                            "MissingOperationId",
                            "operation has no operationId",
                        ));
                        continue;
                    }
                };

                let (group, handler_method) = match parse_operation_id(&op_id) {
                    Some(pair) => pair,
                    None => {
                        issues.push(ValidationIssue::new(
                            &location,
                            "BadOperationId",
                            format!("unable to parse operation id '{op_id}' into group.method"),
                        ));
                        continue;
                    }
                };

                let roles = extract_roles(operation, &location, &mut issues);
                let timeout = extract_timeout(operation);

                let mut parameters = Vec::new();
                parameters.extend(extract_parameters(spec, &item.parameters));
                parameters.extend(extract_parameters(spec, &operation.parameters));

                operations.push(OperationDescriptor {
                    method: method.clone(),
                    path_pattern: path.clone(),
                    route_pattern: convert_path(path),
                    operation_id: op_id,
                    group,
                    handler_method,
                    parameters,
                    roles,
                    timeout,
                });
            }
        }
    }

    fail_if_issues(issues)?;

    info!(
        operation_count = operations.len(),
        "Operation index built from API description"
    );
    Ok(operations)
}
