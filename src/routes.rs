//! Dispatch router: `/<namespace>/<endpoint>?var=...` with the session
//! middleware layered over every route, fallback included.

use crate::response;
use crate::session::{session_middleware, Session};
use crate::state::AppState;
use crate::validate::coerce_arguments;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Router};
use std::collections::HashMap;

async fn dispatch(
    State(state): State<AppState>,
    Path(endpoint): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    Extension(session): Extension<Session>,
) -> Response {
    // Exact-name lookup only; anything unregistered is a plain not-found.
    let Some(spec) = state.registry.get(&endpoint) else {
        tracing::debug!(endpoint = %endpoint, "no such endpoint");
        return not_found();
    };

    let args = match coerce_arguments(&spec.variables, &params, &session) {
        Ok(args) => args,
        Err(err) => {
            tracing::debug!(endpoint = %spec.name, error = %err, "argument validation failed");
            return response::error(&err.into());
        }
    };

    match (spec.handler)(args, session).await {
        Ok(value) => response::success(value),
        Err(err) => response::error(&err),
    }
}

async fn fallback() -> Response {
    not_found()
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "404").into_response()
}

/// Build the full router: namespace-nested dispatch routes, a generic 404
/// fallback for everything else, session middleware around both.
pub fn build_router(state: AppState) -> Router {
    let dispatch_routes = Router::new()
        .route("/:endpoint", get(dispatch))
        .with_state(state.clone());

    Router::new()
        .nest(&format!("/{}", state.config.namespace), dispatch_routes)
        .fallback(fallback)
        .layer(middleware::from_fn_with_state(state, session_middleware))
}
