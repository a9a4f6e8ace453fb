//! Runtime configuration. Built in code or loaded from `PORTICO_*` env vars.

/// Cookie name carried on the wire: `session_id=<payload>.<hex-digest>`.
pub const SESSION_COOKIE_NAME: &str = "session_id";

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// First path segment that scopes query endpoints (`/<namespace>/<name>`).
    pub namespace: String,
    pub cookie_name: String,
    /// Process-wide signing secret. Never persisted, never logged.
    pub cookie_secret: String,
    /// When set, the DDL compiler consults the executor's introspection and
    /// skips tables that already exist.
    pub auto_migrate: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            namespace: "q".into(),
            cookie_name: SESSION_COOKIE_NAME.into(),
            cookie_secret: String::new(),
            auto_migrate: false,
        }
    }
}

impl AppConfig {
    pub fn new(cookie_secret: impl Into<String>) -> Self {
        Self {
            cookie_secret: cookie_secret.into(),
            ..Self::default()
        }
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn auto_migrate(mut self, enabled: bool) -> Self {
        self.auto_migrate = enabled;
        self
    }

    /// Load from env: `PORTICO_COOKIE_SECRET` (required), `PORTICO_NAMESPACE`
    /// and `PORTICO_AUTO_MIGRATE` (optional).
    pub fn from_env() -> Option<Self> {
        let cookie_secret = std::env::var("PORTICO_COOKIE_SECRET").ok()?;
        let mut config = Self::new(cookie_secret);
        if let Ok(ns) = std::env::var("PORTICO_NAMESPACE") {
            config.namespace = ns;
        }
        if let Ok(v) = std::env::var("PORTICO_AUTO_MIGRATE") {
            config.auto_migrate = v == "1" || v.eq_ignore_ascii_case("true");
        }
        Some(config)
    }
}
