//! Response normalization: captured client responses → one canonical shape
//!
//! Detection is an ordered list of shape predicates. The first predicate
//! that accepts the object decides how method, path, status, headers and
//! body are extracted.

use std::collections::BTreeMap;

use reqwest::Url;
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("response must be an object, got {0}")]
    NotAnObject(&'static str),
    #[error("unrecognized response shape (keys: {0})")]
    UnrecognizedShape(String),
    #[error("cannot read response body: {0}")]
    Body(String),
}

/// Canonical response, derived per assertion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedResponse {
    /// Upper-cased HTTP method (`GET` when the client did not expose one)
    pub method: String,
    /// Request path without query string
    pub path: String,
    /// 0 when the client did not expose a numeric status
    pub status: u16,
    /// Lower-cased header names
    pub headers: BTreeMap<String, String>,
    pub body: Value,
}

/// Known client response layouts, in detection priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientShape {
    /// `{request: {method, url}, statusCode, headers, body}`
    ApiClient,
    /// `{data, config: {method, url}, status, headers}`
    Axios,
    /// `{body, req: {method, path}, statusCode, headers}`
    Supertest,
    /// Anything carrying `status` or `statusCode`
    Generic,
}

type ShapePredicate = fn(&Map<String, Value>) -> bool;

const DETECTION_ORDER: [(ShapePredicate, ClientShape); 4] = [
    (is_api_client, ClientShape::ApiClient),
    (is_axios, ClientShape::Axios),
    (is_supertest, ClientShape::Supertest),
    (is_generic, ClientShape::Generic),
];

fn is_api_client(o: &Map<String, Value>) -> bool {
    o.contains_key("request") && o.contains_key("statusCode")
}

fn is_axios(o: &Map<String, Value>) -> bool {
    o.contains_key("data") && o.contains_key("config") && o.contains_key("status")
}

fn is_supertest(o: &Map<String, Value>) -> bool {
    o.contains_key("body") && o.contains_key("req") && o.contains_key("statusCode")
}

fn is_generic(o: &Map<String, Value>) -> bool {
    o.contains_key("status") || o.contains_key("statusCode")
}

impl ClientShape {
    pub fn detect(object: &Map<String, Value>) -> Option<Self> {
        DETECTION_ORDER
            .iter()
            .find(|(accepts, _)| accepts(object))
            .map(|(_, shape)| *shape)
    }

    fn extract(self, o: &Map<String, Value>) -> ParsedResponse {
        let (method, target, status, body) = match self {
            Self::ApiClient => {
                let request = o.get("request");
                (
                    field(request, "method"),
                    field(request, "url").or_else(|| field(request, "path")),
                    o.get("statusCode"),
                    o.get("body"),
                )
            }
            Self::Axios => {
                let config = o.get("config");
                (
                    field(config, "method"),
                    field(config, "url").or_else(|| field(o.get("request"), "path")),
                    o.get("status"),
                    o.get("data"),
                )
            }
            Self::Supertest => {
                let req = o.get("req");
                (
                    field(req, "method"),
                    field(req, "path").or_else(|| field(req, "url")),
                    o.get("statusCode"),
                    o.get("body"),
                )
            }
            Self::Generic => (
                o.get("method").and_then(Value::as_str),
                o.get("url")
                    .and_then(Value::as_str)
                    .or_else(|| o.get("path").and_then(Value::as_str)),
                o.get("status").or_else(|| o.get("statusCode")),
                o.get("body").or_else(|| o.get("data")),
            ),
        };

        ParsedResponse {
            method: method.unwrap_or("GET").to_ascii_uppercase(),
            path: target.map(url_to_path).unwrap_or_default(),
            status: status.map_or(0, parse_status),
            headers: o.get("headers").map(normalize_headers).unwrap_or_default(),
            body: body.cloned().unwrap_or(Value::Null),
        }
    }
}

/// Normalize a captured response.
///
/// # Errors
///
/// Returns [`NormalizeError`] if `raw` is not an object or matches no known shape.
pub fn parse(raw: &Value) -> Result<ParsedResponse, NormalizeError> {
    let Value::Object(object) = raw else {
        return Err(NormalizeError::NotAnObject(json_type(raw)));
    };

    // Wrapper types (e.g. client errors) carry the real response inside
    if let Some(inner @ Value::Object(_)) = object.get("response") {
        return parse(inner);
    }

    let shape = ClientShape::detect(object).ok_or_else(|| {
        NormalizeError::UnrecognizedShape(object.keys().cloned().collect::<Vec<_>>().join(", "))
    })?;
    Ok(shape.extract(object))
}

fn field<'a>(parent: Option<&'a Value>, key: &str) -> Option<&'a str> {
    parent.and_then(|p| p.get(key)).and_then(Value::as_str)
}

/// Absolute URL → its path; anything else → strip the query string.
pub fn url_to_path(target: &str) -> String {
    if let Ok(url) = Url::parse(target) {
        if url.has_host() {
            return url.path().to_string();
        }
    }
    let end = target.find(['?', '#']).unwrap_or(target.len());
    target[..end].to_string()
}

fn parse_status(value: &Value) -> u16 {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()).unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn normalize_headers(headers: &Value) -> BTreeMap<String, String> {
    let Some(map) = headers.as_object() else {
        return BTreeMap::new();
    };
    map.iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k.to_ascii_lowercase(), header_value(v)))
        .collect()
}

fn header_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(header_value).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
