//! Cookie-based session authentication.
//!
//! Per request the middleware resolves exactly one of:
//! no cookie → new session; invalid signature → new session; valid signature
//! with a store hit → resumed session; valid signature with a store miss →
//! fresh empty record kept under the same verified id (token authenticity
//! does not imply store presence, the store may have evicted it).
//!
//! The record is written back after the handler completes, and only when its
//! data map is non-empty, so trivial sessions never grow the store.

pub mod store;

use crate::error::ApiError;
use crate::response;
use crate::signature;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::header::{HeaderValue, COOKIE, SET_COOKIE};
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use store::SessionRecord;

/// Request-scoped handle to the session data map. Cloning shares the map;
/// handlers mutate it freely and the middleware persists it afterwards.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    id: String,
    data: Mutex<HashMap<String, serde_json::Value>>,
}

impl Session {
    fn new(id: String, data: HashMap<String, serde_json::Value>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                id,
                data: Mutex::new(data),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn get(&self, name: &str) -> Option<serde_json::Value> {
        self.lock().get(name).cloned()
    }

    pub fn insert(&self, name: impl Into<String>, value: serde_json::Value) {
        self.lock().insert(name.into(), value);
    }

    pub fn remove(&self, name: &str) -> Option<serde_json::Value> {
        self.lock().remove(name)
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn snapshot(&self) -> HashMap<String, serde_json::Value> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, serde_json::Value>> {
        // The map is only locked for short map operations within one request.
        self.inner
            .data
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
impl Session {
    pub(crate) fn for_tests(id: &str) -> Self {
        Self::new(id.to_string(), HashMap::new())
    }
}

/// Parse a `Cookie` header: `;`-delimited pairs, names trimmed and
/// case-sensitive, first `=` splits name from value, values percent-decoded.
pub fn parse_cookie_header(header: &str) -> HashMap<String, String> {
    let mut cookies = HashMap::new();
    for pair in header.split(';') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        match pair.split_once('=') {
            Some((name, value)) => {
                cookies.insert(name.trim().to_string(), percent_decode(value));
            }
            None => {
                cookies.insert(pair.to_string(), String::new());
            }
        }
    }
    cookies
}

fn percent_decode(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hi = (bytes[i + 1] as char).to_digit(16);
            let lo = (bytes[i + 2] as char).to_digit(16);
            if let (Some(hi), Some(lo)) = (hi, lo) {
                out.push((hi * 16 + lo) as u8);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Middleware establishing the session before dispatch and persisting it
/// after the response is produced.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let presented = req
        .headers()
        .get(COOKIE)
        .and_then(|h| h.to_str().ok())
        .map(parse_cookie_header)
        .and_then(|mut cookies| cookies.remove(&state.config.cookie_name));

    let secret = state.config.cookie_secret.as_str();
    let verified = presented.filter(|token| signature::verify(token, secret));

    let (session_id, record, minted) = match verified {
        Some(session_id) => match state.store.read(&session_id).await {
            Ok(Some(mut record)) => {
                record.last_used = Utc::now();
                (session_id, record, false)
            }
            // Evicted from the store; the signature already proves the id is
            // ours, so recreate an empty record under it.
            Ok(None) => (session_id, SessionRecord::empty(), false),
            Err(err) => {
                tracing::error!(error = %err, "session store read failed");
                let api_err = ApiError::StoreUnavailable(err);
                return response::error(&api_err.into());
            }
        },
        None => {
            let session_id = signature::new_session_id(secret);
            tracing::debug!("minted new session");
            (session_id, SessionRecord::empty(), true)
        }
    };

    let session = Session::new(session_id.clone(), record.data);
    req.extensions_mut().insert(session.clone());

    let mut res = next.run(req).await;

    // Deferred persistence: exactly once, after the handler, success or not.
    // Empty sessions are never written.
    let data = session.snapshot();
    if !data.is_empty() {
        let record = SessionRecord {
            data,
            last_used: Utc::now(),
        };
        if let Err(err) = state.store.write(&session_id, record).await {
            tracing::error!(error = %err, "session store write failed");
        }
    }

    if minted {
        let cookie = format!("{}={}", state.config.cookie_name, session_id);
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                res.headers_mut().append(SET_COOKIE, value);
            }
            Err(err) => tracing::error!(error = %err, "invalid session cookie value"),
        }
    }

    res
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_delimited_pairs() {
        let cookies = parse_cookie_header("a=1; b=2;c=3");
        assert_eq!(cookies["a"], "1");
        assert_eq!(cookies["b"], "2");
        assert_eq!(cookies["c"], "3");
    }

    #[test]
    fn first_equals_splits_name_and_value() {
        let cookies = parse_cookie_header("token=abc=def");
        assert_eq!(cookies["token"], "abc=def");
    }

    #[test]
    fn names_are_case_sensitive() {
        let cookies = parse_cookie_header("Session=a; session=b");
        assert_eq!(cookies["Session"], "a");
        assert_eq!(cookies["session"], "b");
    }

    #[test]
    fn values_are_percent_decoded() {
        let cookies = parse_cookie_header("v=hello%20world%21");
        assert_eq!(cookies["v"], "hello world!");
        // Malformed escapes pass through untouched.
        let cookies = parse_cookie_header("v=50%");
        assert_eq!(cookies["v"], "50%");
    }

    #[test]
    fn session_handle_shares_data() {
        let session = Session::new("sid".into(), HashMap::new());
        let clone = session.clone();
        clone.insert("counter", serde_json::json!(3));
        assert_eq!(session.get("counter"), Some(serde_json::json!(3)));
        assert!(!session.is_empty());
        session.remove("counter");
        assert!(session.is_empty());
    }
}
