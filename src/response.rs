//! JSON envelope helpers. Errors are signaled in-band: the envelope path
//! always answers HTTP 200 and carries either `result` or `error`.

use crate::error::EndpointError;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;

pub fn success_body(value: Value) -> Value {
    serde_json::json!({ "result": value })
}

pub fn error_body(err: &EndpointError) -> Value {
    serde_json::json!({
        "error": {
            "description": err.description,
            "code": err.code,
        }
    })
}

pub fn success(value: Value) -> Response {
    Json(success_body(value)).into_response()
}

pub fn error(err: &EndpointError) -> Response {
    Json(error_body(err)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_envelope_shape() {
        let body = error_body(&EndpointError::new("Variable x is missing", -1));
        assert_eq!(
            body,
            serde_json::json!({
                "error": { "description": "Variable x is missing", "code": -1 }
            })
        );
        assert!(body.get("result").is_none());
    }

    #[test]
    fn success_envelope_shape() {
        let body = success_body(serde_json::json!(7));
        assert_eq!(body, serde_json::json!({ "result": 7 }));
        assert!(body.get("error").is_none());
    }
}
