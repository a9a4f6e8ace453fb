//! App builder: register endpoints and tables, compile the schema, then turn
//! the whole thing into an axum `Router`.

use crate::config::AppConfig;
use crate::error::ConfigError;
use crate::registry::{EndpointRegistry, Handler};
use crate::routes::build_router;
use crate::schema::{FieldRule, TableSpec, VariableRule};
use crate::session::store::{MemoryStore, SessionStore};
use crate::sql::SqlExecutor;
use crate::state::AppState;
use axum::Router;
use std::collections::HashSet;
use std::sync::Arc;

pub struct App {
    config: AppConfig,
    registry: EndpointRegistry,
    tables: Vec<TableSpec>,
    table_names: HashSet<String>,
    store: Arc<dyn SessionStore>,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            registry: EndpointRegistry::new(),
            tables: Vec::new(),
            table_names: HashSet::new(),
            store: Arc::new(MemoryStore::new()),
        }
    }

    /// Replace the default in-memory session store with a custom adapter.
    pub fn with_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = store;
        self
    }

    /// Declare a query endpoint. Names are unique; duplicates are rejected.
    pub fn endpoint(
        &mut self,
        name: impl Into<String>,
        variables: Vec<(&str, VariableRule)>,
        handler: Handler,
    ) -> Result<(), ConfigError> {
        let variables = variables
            .into_iter()
            .map(|(n, r)| (n.to_string(), r))
            .collect();
        self.registry.register(name, variables, handler)
    }

    /// Declare a table. Declaration order is preserved through compilation.
    pub fn table(
        &mut self,
        name: impl Into<String>,
        fields: Vec<(&str, FieldRule)>,
    ) -> Result<(), ConfigError> {
        let spec = TableSpec::new(name, fields);
        if !self.table_names.insert(spec.name.clone()) {
            return Err(ConfigError::DuplicateTable(spec.name));
        }
        self.tables.push(spec);
        Ok(())
    }

    /// Compile declared tables to DDL and execute them through the given
    /// collaborator. Must run (and succeed) before the router serves traffic;
    /// a configuration error here is fatal.
    pub async fn compile(&self, executor: &dyn SqlExecutor) -> Result<(), ConfigError> {
        crate::ddl::compile(&self.tables, executor, self.config.auto_migrate).await
    }

    /// Consume the app into a router. Registry and config are frozen from
    /// here on.
    pub fn into_router(self) -> Router {
        let state = AppState {
            config: Arc::new(self.config),
            registry: Arc::new(self.registry),
            store: self.store,
        };
        build_router(state)
    }
}
