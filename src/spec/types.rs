use crate::auth::RoleRequirement;
use http::Method;
use std::time::Duration;

/// Default per-operation handler timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Where a parameter is read from. Only path and query participate in
/// binding; header and cookie parameters belong to the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterLocation {
    Path,
    Query,
}

impl std::fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParameterLocation::Path => write!(f, "path"),
            ParameterLocation::Query => write!(f, "query"),
        }
    }
}

/// Declared scalar/list kind of a parameter, derived from its schema `type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamKind {
    Int,
    Bool,
    Str,
    List(Box<ParamKind>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDescriptor {
    pub name: String,
    pub location: ParameterLocation,
    pub kind: ParamKind,
}

/// One dispatchable operation flattened from the API description.
///
/// Owned by the dispatcher for the process lifetime and never mutated after
/// startup, so it is freely shared across concurrent requests.
#[derive(Debug, Clone)]
pub struct OperationDescriptor {
    pub method: Method,
    /// Path template as written in the description, `{name}` placeholders.
    pub path_pattern: String,
    /// Same template rewritten to the external router's `:name` placeholder
    /// syntax, position and name preserved.
    pub route_pattern: String,
    /// Raw operation id, `"<HandlerGroup>.<method>"`.
    pub operation_id: String,
    /// First dot segment of the operation id.
    pub group: String,
    /// Second dot segment of the operation id.
    pub handler_method: String,
    /// Ordered parameter descriptors (path-item level first, then operation
    /// level, in document order).
    pub parameters: Vec<ParameterDescriptor>,
    pub roles: Option<RoleRequirement>,
    pub timeout: Duration,
}

impl OperationDescriptor {
    #[must_use]
    pub fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }

    /// Whether this operation requires role evaluation at all.
    #[must_use]
    pub fn requires_roles(&self) -> bool {
        self.roles.as_ref().is_some_and(|r| !r.is_empty())
    }
}
