//! Schema-driven validation and coercion of endpoint arguments.
//!
//! Variables are evaluated in declaration order and the pipeline
//! short-circuits on the first failure, so the handler either receives every
//! coerced value or is never invoked at all. Length bounds run before any
//! coercion to bound the work done on attacker-controlled input.

use crate::error::ApiError;
use crate::schema::{Provider, VarKind, VariableRule};
use crate::session::Session;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::{alphabet, Engine};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::collections::HashMap;

/// A coerced endpoint argument.
#[derive(Clone, Debug, PartialEq)]
pub enum ArgValue {
    Text(String),
    Number(f64),
    Integer(i64),
    Date(DateTime<Utc>),
    Blob(Vec<u8>),
}

/// Coerced arguments handed to the endpoint handler, keyed by declared name.
#[derive(Clone, Debug, Default)]
pub struct Args {
    values: HashMap<String, ArgValue>,
}

impl Args {
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.get(name)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(ArgValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        match self.values.get(name) {
            Some(ArgValue::Number(n)) => Some(*n),
            Some(ArgValue::Integer(n)) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(ArgValue::Integer(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn date(&self, name: &str) -> Option<DateTime<Utc>> {
        match self.values.get(name) {
            Some(ArgValue::Date(d)) => Some(*d),
            _ => None,
        }
    }

    pub fn blob(&self, name: &str) -> Option<&[u8]> {
        match self.values.get(name) {
            Some(ArgValue::Blob(b)) => Some(b),
            _ => None,
        }
    }
}

/// Raw value as fetched from its provider, before coercion. Query parameters
/// are always textual; session values carry whatever the handler stored.
#[derive(Clone, Debug)]
enum Raw {
    Text(String),
    Json(serde_json::Value),
}

/// Evaluate every declared variable against the request. Fail-fast: the
/// first violation stops processing and the handler must not be invoked.
pub fn coerce_arguments(
    variables: &[(String, VariableRule)],
    query: &HashMap<String, String>,
    session: &Session,
) -> Result<Args, ApiError> {
    let mut args = Args::default();
    for (name, rule) in variables {
        let raw = fetch(name, rule, query, session)
            .ok_or_else(|| ApiError::MissingVariable(name.clone()))?;

        if let Some(text) = raw_text(&raw) {
            if let Some(max) = rule.max_length {
                if text.chars().count() > max {
                    return Err(ApiError::MalformedVariable(name.clone()));
                }
            }
            if let Some(min) = rule.min_length {
                if text.chars().count() < min {
                    return Err(ApiError::MalformedVariable(name.clone()));
                }
            }
        }

        let value = coerce(&raw, rule.kind).ok_or_else(|| ApiError::MalformedVariable(name.clone()))?;
        args.values.insert(name.clone(), value);
    }
    Ok(args)
}

fn fetch(
    name: &str,
    rule: &VariableRule,
    query: &HashMap<String, String>,
    session: &Session,
) -> Option<Raw> {
    match rule.provider {
        Provider::Query => query.get(name).cloned().map(Raw::Text),
        Provider::Session => match session.get(name) {
            None | Some(serde_json::Value::Null) => None,
            Some(value) => Some(Raw::Json(value)),
        },
    }
}

fn raw_text(raw: &Raw) -> Option<&str> {
    match raw {
        Raw::Text(s) => Some(s),
        Raw::Json(serde_json::Value::String(s)) => Some(s),
        Raw::Json(_) => None,
    }
}

fn coerce(raw: &Raw, kind: VarKind) -> Option<ArgValue> {
    match kind {
        VarKind::Number => numeric(raw).map(ArgValue::Number),
        // Integer narrows Number: numeric parse first, then a zero
        // fractional part is required. Values outside i64 range are rejected
        // rather than saturated; `i64::MAX as f64` is exactly 2^63, so the
        // strict upper bound admits every exactly-representable i64.
        VarKind::Integer => {
            let n = numeric(raw)?;
            if n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 {
                Some(ArgValue::Integer(n as i64))
            } else {
                None
            }
        }
        VarKind::Date => parse_date(raw_text(raw)?).map(ArgValue::Date),
        VarKind::Blob => raw_text(raw).map(|s| ArgValue::Blob(lenient_base64(s))),
        VarKind::Text => raw_text(raw).map(|s| ArgValue::Text(s.to_string())),
    }
}

fn numeric(raw: &Raw) -> Option<f64> {
    let n = match raw {
        Raw::Text(s) => s.trim().parse::<f64>().ok(),
        Raw::Json(serde_json::Value::Number(n)) => n.as_f64(),
        Raw::Json(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        Raw::Json(_) => None,
    }?;
    // "NaN" parses as f64 but is not a number the handler can use.
    if n.is_nan() {
        return None;
    }
    Some(n)
}

fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.and_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}

const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Base64 decode that never fails. Non-alphabet bytes are dropped, padding is
/// ignored, and a dangling trailing symbol is discarded. A string that is not
/// really base64 therefore decodes to garbage bytes rather than an error.
/// This is a documented limitation of the wire contract, kept intentionally.
fn lenient_base64(s: &str) -> Vec<u8> {
    let mut filtered: String = s
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '+' || *c == '/')
        .collect();
    if filtered.len() % 4 == 1 {
        filtered.pop();
    }
    LENIENT_BASE64.decode(filtered.as_bytes()).unwrap_or_default()
}
