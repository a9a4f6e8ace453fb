//! Portico: a small declarative backend layer.
//!
//! Three designed pieces: signed-cookie sessions over a pluggable store,
//! schema-driven validation/coercion of query-endpoint arguments, and a
//! table-schema-to-DDL compiler with foreign-key ordering. HTTP transport is
//! axum; the crate owns the dispatch layer, not the listener.

pub mod app;
pub mod config;
pub mod ddl;
pub mod error;
pub mod registry;
pub mod response;
pub mod routes;
pub mod schema;
pub mod session;
pub mod signature;
pub mod sql;
pub mod state;
pub mod validate;

pub use app::App;
pub use config::AppConfig;
pub use error::{ApiError, ConfigError, EndpointError, SqlError, StoreError};
pub use registry::{handler, Handler};
pub use schema::{ColumnKind, FieldRule, Provider, TableSpec, VarKind, VariableRule};
pub use session::store::{MemoryStore, PgSessionStore, SessionRecord, SessionStore};
pub use session::Session;
pub use signature::{new_session_id, sign, verify};
pub use sql::{PgExecutor, SqlExecutor};
pub use validate::{ArgValue, Args};
