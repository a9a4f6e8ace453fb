//! Shared router state: immutable after the app is built.

use crate::config::AppConfig;
use crate::registry::EndpointRegistry;
use crate::session::store::SessionStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub registry: Arc<EndpointRegistry>,
    pub store: Arc<dyn SessionStore>,
}
