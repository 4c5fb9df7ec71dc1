//! Registry of invokable handlers, keyed by `Group.method`.

use crate::dispatcher::Invocation;
use crate::errors::DispatchError;
use crate::marshal::{Decoded, MarshalTarget};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Boxed handler function. Returning `Ok(None)` produces an empty reply body.
pub type HandlerFn =
    Arc<dyn Fn(Invocation) -> Result<Option<Decoded>, DispatchError> + Send + Sync>;

/// A handler together with the shape its request body decodes into.
#[derive(Clone)]
pub struct RegisteredHandler {
    /// Shape of the request body, if the handler takes one.
    pub body_target: Option<MarshalTarget>,
    pub func: HandlerFn,
}

/// Maps operation ids to registered handlers.
///
/// Body targets are validated at registration time so that a malformed shape
/// surfaces at startup, never mid-request.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<RegisteredHandler>>,
}

impl HandlerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `group.method`.
    ///
    /// **IMPORTANT**: if a handler with the same key already exists, it is
    /// replaced.
    ///
    /// # Errors
    ///
    /// Fails if `body_target` is structurally invalid (for example a presence
    /// shape used anywhere other than a record field).
    pub fn register<F>(
        &mut self,
        group: &str,
        method: &str,
        body_target: Option<MarshalTarget>,
        func: F,
    ) -> Result<(), DispatchError>
    where
        F: Fn(Invocation) -> Result<Option<Decoded>, DispatchError> + Send + Sync + 'static,
    {
        if let Some(target) = &body_target {
            target.validate()?;
        }

        let key = format!("{group}.{method}");
        if self.handlers.contains_key(&key) {
            warn!(operation_id = %key, "Replaced existing handler");
        } else {
            info!(
                operation_id = %key,
                total_handlers = self.handlers.len() + 1,
                "Handler registered"
            );
        }

        self.handlers.insert(
            key,
            Arc::new(RegisteredHandler {
                body_target,
                func: Arc::new(func),
            }),
        );
        Ok(())
    }

    #[must_use]
    pub fn resolve(&self, operation_id: &str) -> Option<Arc<RegisteredHandler>> {
        self.handlers.get(operation_id).cloned()
    }

    #[must_use]
    pub fn contains(&self, operation_id: &str) -> bool {
        self.handlers.contains_key(operation_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}
