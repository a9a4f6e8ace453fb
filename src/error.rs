//! Typed errors: fatal configuration errors vs per-request API errors.

use thiserror::Error;

/// Fatal errors raised at registration or compile time. The service must not
/// start serving traffic once one of these is returned.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("duplicate endpoint: '{0}'")]
    DuplicateEndpoint(String),
    #[error("duplicate table: '{0}'")]
    DuplicateTable(String),
    #[error("foreign field '{field}' on table '{table}' binds unknown table '{target}'")]
    UnknownForeignTarget {
        table: String,
        field: String,
        target: String,
    },
    #[error("ddl execution: {0}")]
    Sql(#[from] SqlError),
}

/// Errors from a session store adapter. Propagated as-is; this crate does not
/// retry. A missing id is not an error (`read` returns `Ok(None)`).
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store backend: {0}")]
    Backend(String),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

/// Errors from the injected DDL executor.
#[derive(Error, Debug)]
pub enum SqlError {
    #[error(transparent)]
    Db(#[from] sqlx::Error),
    #[error("executor: {0}")]
    Executor(String),
    #[error("introspection not supported by this executor")]
    IntrospectionUnsupported,
}

/// Per-request errors, recovered locally into the in-band JSON envelope.
/// The handler is never invoked once one of these is raised.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Variable {0} is missing")]
    MissingVariable(String),
    #[error("Variable {0} is malformed")]
    MalformedVariable(String),
    #[error("session store unavailable")]
    StoreUnavailable(#[from] StoreError),
}

impl ApiError {
    /// Envelope error code. The wire contract signals errors in-band with
    /// HTTP 200, so the code is the only machine-readable discriminator.
    pub fn code(&self) -> i32 {
        match self {
            ApiError::MissingVariable(_) => -1,
            ApiError::MalformedVariable(_) => -1,
            ApiError::StoreUnavailable(_) => -2,
        }
    }
}

/// Error returned by an endpoint handler, rendered into the envelope.
#[derive(Debug, Clone)]
pub struct EndpointError {
    pub description: String,
    pub code: i32,
}

impl EndpointError {
    pub fn new(description: impl Into<String>, code: i32) -> Self {
        Self {
            description: description.into(),
            code,
        }
    }
}

impl From<ApiError> for EndpointError {
    fn from(err: ApiError) -> Self {
        EndpointError {
            code: err.code(),
            description: err.to_string(),
        }
    }
}

impl std::fmt::Display for EndpointError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (code {})", self.description, self.code)
    }
}

impl std::error::Error for EndpointError {}
