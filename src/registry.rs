//! Endpoint registry: declared name → variable schema + handler.
//! Registration happens before compile; the registry is immutable afterwards
//! (it is moved into shared router state).

use crate::error::{ConfigError, EndpointError};
use crate::schema::VariableRule;
use crate::session::Session;
use crate::validate::Args;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<serde_json::Value, EndpointError>> + Send>>;

/// Boxed endpoint handler. Invoked exactly once per matched request, after
/// every declared variable has been coerced successfully.
pub type Handler = Arc<dyn Fn(Args, Session) -> HandlerFuture + Send + Sync>;

/// Wrap an async closure into a [`Handler`].
pub fn handler<F, Fut>(f: F) -> Handler
where
    F: Fn(Args, Session) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<serde_json::Value, EndpointError>> + Send + 'static,
{
    Arc::new(move |args, session| Box::pin(f(args, session)))
}

pub struct EndpointSpec {
    pub name: String,
    /// Declaration order matters: variables are validated in this order and
    /// the pipeline short-circuits on the first failure.
    pub variables: Vec<(String, VariableRule)>,
    pub handler: Handler,
}

#[derive(Default)]
pub struct EndpointRegistry {
    endpoints: HashMap<String, Arc<EndpointSpec>>,
}

impl EndpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an endpoint under a unique name. Duplicates are rejected
    /// rather than silently overwritten.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        variables: Vec<(String, VariableRule)>,
        handler: Handler,
    ) -> Result<(), ConfigError> {
        let name = name.into();
        if self.endpoints.contains_key(&name) {
            return Err(ConfigError::DuplicateEndpoint(name));
        }
        let spec = EndpointSpec {
            name: name.clone(),
            variables,
            handler,
        };
        self.endpoints.insert(name, Arc::new(spec));
        Ok(())
    }

    /// Exact-equality lookup; no wildcards, no parameterized names.
    pub fn get(&self, name: &str) -> Option<Arc<EndpointSpec>> {
        self.endpoints.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}
