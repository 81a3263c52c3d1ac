//! Capture a live `reqwest` response into a [`ParsedResponse`]

use std::collections::BTreeMap;

use serde_json::Value;

use crate::normalize::{NormalizeError, ParsedResponse};

/// Consume a blocking response: status, headers, path and body.
///
/// `reqwest` responses do not carry their request method, so the caller
/// passes it. An empty body becomes `null`; a non-JSON body becomes a string.
///
/// # Errors
///
/// Returns [`NormalizeError::Body`] if the body cannot be read.
pub fn capture_blocking(
    method: &reqwest::Method,
    response: reqwest::blocking::Response,
) -> Result<ParsedResponse, NormalizeError> {
    let status = response.status().as_u16();
    let path = response.url().path().to_string();
    let headers = collect_headers(response.headers());
    let text = response
        .text()
        .map_err(|e| NormalizeError::Body(e.to_string()))?;

    Ok(ParsedResponse {
        method: method.as_str().to_ascii_uppercase(),
        path,
        status,
        headers,
        body: body_value(&text),
    })
}

fn collect_headers(headers: &reqwest::header::HeaderMap) -> BTreeMap<String, String> {
    let mut out: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        out.entry(name.as_str().to_ascii_lowercase())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    out
}

fn body_value(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}
