//! Request dispatch pipeline.
//!
//! Every request moves through a fixed sequence of phases:
//! authorization, parameter binding, body decoding, handler invocation,
//! and reply encoding. The pipeline runs in its own coroutine, raced
//! against a timer coroutine; whichever finishes first wins and the
//! loser is cancelled, so a stuck handler can never hold the caller past
//! the operation's deadline.

use crate::binding::{bind_parameters, BoundArgs};
use crate::errors::DispatchError;
use crate::ids::RequestId;
use crate::marshal::{decode, encode, Decoded};
use crate::registry::{HandlerRegistry, RegisteredHandler};
use crate::snapshot::Snapshot;
use crate::spec::OperationDescriptor;
use crate::validator::{fail_if_issues, ValidationIssue};
use may::coroutine;
use may::sync::mpsc;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Where a request currently is in the pipeline, for log correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Routed,
    Authorizing,
    Binding,
    Invoking,
    Encoding,
    Replied,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Routed => "routed",
            Phase::Authorizing => "authorizing",
            Phase::Binding => "binding",
            Phase::Invoking => "invoking",
            Phase::Encoding => "encoding",
            Phase::Replied => "replied",
            Phase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Final outcome of a dispatch: a status code and an optional JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub body: Option<Value>,
}

impl Reply {
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            body: Some(body),
        }
    }

    /// A reply with no body, for handlers that return nothing.
    #[must_use]
    pub fn empty(status: u16) -> Self {
        Self { status, body: None }
    }

    #[must_use]
    pub fn from_error(err: &DispatchError) -> Self {
        Self {
            status: err.status(),
            body: Some(err.to_body()),
        }
    }
}

/// Everything a handler sees for a single request.
#[derive(Clone)]
pub struct Invocation {
    pub operation_id: String,
    pub request_id: RequestId,
    /// Path and query parameters, already coerced to their declared kinds.
    pub args: BoundArgs,
    /// Request body decoded against the handler's registered shape.
    pub body: Option<Decoded>,
    /// Immutable view of the raw body object, for handlers that want
    /// field-presence checks beyond what the decoded shape captures.
    pub raw_body: Option<Snapshot>,
    /// Roles asserted for the caller by the transport layer.
    pub roles: Vec<String>,
}

/// Parse the coroutine stack size from `SPECBIND_STACK_SIZE`, accepting
/// decimal or `0x`-prefixed hex. Defaults to 64KB.
fn stack_size() -> usize {
    std::env::var("SPECBIND_STACK_SIZE")
        .ok()
        .and_then(|s| {
            if let Some(hex) = s.strip_prefix("0x") {
                usize::from_str_radix(hex, 16).ok()
            } else {
                s.parse().ok()
            }
        })
        .unwrap_or(0x10000)
}

/// Dispatches requests to registered handlers according to the operation
/// index.
///
/// Construction is eager: every operation in the index must already have a
/// handler registered under its `Group.method` id, and every missing handler
/// is reported before the first request is accepted.
#[derive(Clone)]
pub struct Dispatcher {
    operations: Vec<Arc<OperationDescriptor>>,
    index: HashMap<String, Arc<OperationDescriptor>>,
    registry: HandlerRegistry,
}

impl Dispatcher {
    /// Build a dispatcher over the given operations and handler registry.
    ///
    /// # Errors
    ///
    /// Fails with an aggregated report if any operation has no registered
    /// handler. Startup must not proceed on a partial registry.
    pub fn new(
        operations: Vec<OperationDescriptor>,
        registry: HandlerRegistry,
    ) -> anyhow::Result<Self> {
        let mut issues = Vec::new();
        for op in &operations {
            if !registry.contains(&op.operation_id) {
                issues.push(ValidationIssue::new(
                    &op.operation_id,
                    "UnregisteredHandler",
                    format!(
                        "no handler registered for '{}' ({} {})",
                        op.operation_id, op.method, op.path_pattern
                    ),
                ));
            }
        }
        fail_if_issues(issues)?;

        let operations: Vec<Arc<OperationDescriptor>> =
            operations.into_iter().map(Arc::new).collect();
        let index = operations
            .iter()
            .map(|op| (op.operation_id.clone(), Arc::clone(op)))
            .collect();

        info!(
            operation_count = operations.len(),
            handler_count = registry.len(),
            "Dispatcher ready"
        );

        Ok(Self {
            operations,
            index,
            registry,
        })
    }

    /// Operations in document order.
    #[must_use]
    pub fn operations(&self) -> &[Arc<OperationDescriptor>] {
        &self.operations
    }

    #[must_use]
    pub fn operation(&self, operation_id: &str) -> Option<&Arc<OperationDescriptor>> {
        self.index.get(operation_id)
    }

    /// Run one request through the full pipeline.
    ///
    /// The pipeline executes in a supervised coroutine raced against a timer
    /// for the operation's deadline. Whatever happens inside, exactly one
    /// reply comes back: handler panics become 500s and an exceeded deadline
    /// becomes 504.
    #[must_use]
    pub fn dispatch(
        &self,
        operation_id: &str,
        path_params: HashMap<String, String>,
        query_params: Vec<(String, String)>,
        body: Option<Value>,
        roles: Vec<String>,
    ) -> Reply {
        let request_id = RequestId::new();
        let start = Instant::now();

        let op = match self.index.get(operation_id) {
            Some(op) => Arc::clone(op),
            None => {
                let err = DispatchError::not_found(format!(
                    "no operation registered with id '{operation_id}'"
                ));
                error!(
                    request_id = %request_id,
                    operation_id = %operation_id,
                    phase = %Phase::Failed,
                    status = err.status(),
                    error = %err,
                    "Unknown operation"
                );
                return Reply::from_error(&err);
            }
        };

        debug!(
            request_id = %request_id,
            operation_id = %op.operation_id,
            method = %op.method,
            path = %op.path_pattern,
            phase = %Phase::Routed,
            "Request routed"
        );

        // Resolved eagerly in new(), so this only fails if the registry was
        // mutated out from under us.
        let handler = match self.registry.resolve(&op.operation_id) {
            Some(h) => h,
            None => {
                let err = DispatchError::internal(format!(
                    "handler for '{}' disappeared after startup validation",
                    op.operation_id
                ));
                error!(
                    request_id = %request_id,
                    operation_id = %op.operation_id,
                    phase = %Phase::Failed,
                    error = %err,
                    "Handler missing"
                );
                return Reply::from_error(&err);
            }
        };

        let outcome = run_with_deadline(&op, handler, request_id, path_params, query_params, body, roles);

        match outcome {
            Ok(reply) => {
                info!(
                    request_id = %request_id,
                    operation_id = %op.operation_id,
                    phase = %Phase::Replied,
                    status = reply.status,
                    latency_ms = start.elapsed().as_millis() as u64,
                    "Request replied"
                );
                reply
            }
            Err(err) => {
                let status = err.status();
                error!(
                    request_id = %request_id,
                    operation_id = %op.operation_id,
                    phase = %Phase::Failed,
                    status = status,
                    latency_ms = start.elapsed().as_millis() as u64,
                    error = %err,
                    "Request failed"
                );
                Reply::from_error(&err)
            }
        }
    }
}

/// Race the pipeline coroutine against a timer for the operation deadline.
///
/// Both coroutines send into the same channel; the first message wins and
/// the losing coroutine is cancelled so nothing outlives the request.
fn run_with_deadline(
    op: &Arc<OperationDescriptor>,
    handler: Arc<RegisteredHandler>,
    request_id: RequestId,
    path_params: HashMap<String, String>,
    query_params: Vec<(String, String)>,
    body: Option<Value>,
    roles: Vec<String>,
) -> Result<Reply, DispatchError> {
    let (tx, rx) = mpsc::channel::<Result<Reply, DispatchError>>();
    let timeout = op.timeout;
    let stack = stack_size();

    let work = {
        let tx = tx.clone();
        let op = Arc::clone(op);
        // SAFETY: may::coroutine::Builder::spawn() is marked unsafe by the
        // may runtime. The closure is Send + 'static, owns all of its data,
        // and communicates only through the reply channel. Cancellation is
        // handled below once the race is decided.
        unsafe {
            coroutine::Builder::new().stack_size(stack).spawn(move || {
                let result = run_pipeline(
                    &op,
                    &handler,
                    request_id,
                    &path_params,
                    &query_params,
                    body,
                    roles,
                );
                let _ = tx.send(result);
            })
        }
    };

    let work = match work {
        Ok(handle) => handle,
        Err(e) => {
            error!(
                request_id = %request_id,
                operation_id = %op.operation_id,
                stack_size = stack,
                error = %e,
                "Failed to spawn pipeline coroutine"
            );
            return Err(DispatchError::internal(format!(
                "failed to spawn pipeline coroutine: {e}"
            )));
        }
    };

    let timer = {
        let operation_id = op.operation_id.clone();
        // SAFETY: same spawn contract as above. The timer only sleeps and
        // sends one message; cancelling it mid-sleep is always sound.
        unsafe {
            coroutine::Builder::new().stack_size(0x4000).spawn(move || {
                coroutine::sleep(timeout);
                let _ = tx.send(Err(DispatchError::Timeout {
                    operation_id,
                    timeout_ms: timeout.as_millis() as u64,
                }));
            })
        }
    };

    let outcome = match rx.recv() {
        Ok(result) => result,
        Err(e) => Err(DispatchError::internal(format!(
            "pipeline channel closed without a reply: {e}"
        ))),
    };

    // Cancel the loser of the race. Cancelling an already finished
    // coroutine is a no-op in may.
    if matches!(outcome, Err(DispatchError::Timeout { .. })) {
        // SAFETY: the pipeline coroutine shares no mutable state with the
        // caller; its only side channel is tx, whose message we will never
        // read after this point.
        unsafe {
            work.coroutine().cancel();
        }
    } else if let Ok(timer) = timer {
        // SAFETY: the timer coroutine holds nothing but a sender clone.
        unsafe {
            timer.coroutine().cancel();
        }
    }

    outcome
}

/// Execute the pipeline phases in order. Each phase either advances the
/// request or produces the single error that maps to the reply status.
fn run_pipeline(
    op: &OperationDescriptor,
    handler: &RegisteredHandler,
    request_id: RequestId,
    path_params: &HashMap<String, String>,
    query_params: &[(String, String)],
    body: Option<Value>,
    roles: Vec<String>,
) -> Result<Reply, DispatchError> {
    if let Some(requirement) = &op.roles {
        debug!(
            request_id = %request_id,
            operation_id = %op.operation_id,
            phase = %Phase::Authorizing,
            caller_roles = ?roles,
            "Checking roles"
        );
        requirement.evaluate(&roles)?;
    }

    debug!(
        request_id = %request_id,
        operation_id = %op.operation_id,
        phase = %Phase::Binding,
        "Binding parameters"
    );
    let args = bind_parameters(&op.parameters, path_params, query_params)?;

    let (decoded_body, raw_body) = match (&handler.body_target, &body) {
        (Some(target), Some(value)) => {
            let decoded = decode(value, target)?;
            (Some(decoded), Some(Snapshot::new(value)))
        }
        (_, Some(value)) => (None, Some(Snapshot::new(value))),
        _ => (None, None),
    };

    debug!(
        request_id = %request_id,
        operation_id = %op.operation_id,
        phase = %Phase::Invoking,
        "Invoking handler"
    );

    let invocation = Invocation {
        operation_id: op.operation_id.clone(),
        request_id,
        args,
        body: decoded_body,
        raw_body,
        roles,
    };

    let func = Arc::clone(&handler.func);
    let invoked = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || func(invocation)));

    let result = match invoked {
        Ok(result) => result?,
        Err(panic) => {
            let panic_message = format!("{panic:?}");
            let backtrace = std::backtrace::Backtrace::capture();
            error!(
                request_id = %request_id,
                operation_id = %op.operation_id,
                panic_message = %panic_message,
                backtrace = %backtrace,
                "Handler panicked"
            );
            // The panic detail stays in the log; the caller gets a generic 500.
            return Err(DispatchError::internal(format!(
                "handler for '{}' panicked",
                op.operation_id
            )));
        }
    };

    debug!(
        request_id = %request_id,
        operation_id = %op.operation_id,
        phase = %Phase::Encoding,
        "Encoding reply"
    );

    Ok(match result {
        Some(value) => Reply::json(200, encode(&value)),
        None => Reply::empty(200),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Routed.to_string(), "routed");
        assert_eq!(Phase::Replied.to_string(), "replied");
        assert_eq!(Phase::Failed.to_string(), "failed");
    }

    #[test]
    fn test_reply_from_error_maps_status() {
        let err = DispatchError::binding("invalid value 'x' for parameter 'n' (expected integer)");
        let reply = Reply::from_error(&err);
        assert_eq!(reply.status, 400);
        assert!(reply.body.is_some());
    }

    #[test]
    fn test_stack_size_default() {
        // Env var unset in tests by default.
        assert_eq!(stack_size(), 0x10000);
    }
}
