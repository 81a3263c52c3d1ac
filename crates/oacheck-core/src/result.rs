//! Validation outcome types shared by the engine, the harness and the CLI

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Outcome of validating one response against the contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ValidationIssue>,
}

/// One contract violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationIssue {
    /// JSON pointer into the response body ("" = the body itself)
    pub path: String,
    /// Human-readable description
    pub message: String,
    /// Failing schema keyword, e.g. "required", "type"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    /// Parameters of the failing rule
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<serde_json::Value>,
    /// Value found at `path` in the response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<serde_json::Value>,
}

impl ValidationResult {
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    /// A failed result. An empty `errors` list still counts as invalid.
    #[must_use]
    pub const fn fail(errors: Vec<ValidationIssue>) -> Self {
        Self {
            valid: false,
            errors,
        }
    }

    /// Single-line summary: the first error message plus a count of the rest.
    #[must_use]
    pub fn summary(&self) -> String {
        match self.errors.as_slice() {
            [] if self.valid => "response matches contract".to_string(),
            [] => "response does not match contract".to_string(),
            [only] => only.to_string(),
            [first, rest @ ..] => format!("{first} (+{} more)", rest.len()),
        }
    }
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            keyword: None,
            expected: None,
            actual: None,
        }
    }

    #[must_use]
    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    #[must_use]
    pub fn with_expected(mut self, expected: serde_json::Value) -> Self {
        self.expected = Some(expected);
        self
    }

    #[must_use]
    pub fn with_actual(mut self, actual: serde_json::Value) -> Self {
        self.actual = Some(actual);
        self
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Generate JSON Schema for [`ValidationResult`].
#[must_use]
pub fn generate_result_schema() -> String {
    let schema = schemars::schema_for!(ValidationResult);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ok_serializes_without_errors() {
        let v = serde_json::to_value(ValidationResult::ok()).unwrap();
        assert_eq!(v, json!({"valid": true}));
    }

    #[test]
    fn issue_omits_empty_optionals() {
        let issue = ValidationIssue::new("/name", "missing").with_keyword("required");
        let v = serde_json::to_value(&issue).unwrap();
        assert_eq!(
            v,
            json!({"path": "/name", "message": "missing", "keyword": "required"})
        );
    }

    #[test]
    fn summary_counts_remaining() {
        let result = ValidationResult::fail(vec![
            ValidationIssue::new("/id", "wrong type"),
            ValidationIssue::new("/name", "missing"),
            ValidationIssue::new("", "extra"),
        ]);
        assert_eq!(result.summary(), "/id: wrong type (+2 more)");
    }

    #[test]
    fn summary_root_issue_has_no_prefix() {
        let result = ValidationResult::fail(vec![ValidationIssue::new("", "no matching path")]);
        assert_eq!(result.summary(), "no matching path");
    }

    #[test]
    fn deserialize_round_trip_of_cli_output() {
        let text = r#"{"valid": false, "errors": [{"path": "", "message": "x", "expected": ["200"]}]}"#;
        let r: ValidationResult = serde_json::from_str(text).unwrap();
        assert!(!r.valid);
        assert_eq!(r.errors[0].expected, Some(json!(["200"])));
        assert!(r.errors[0].keyword.is_none());
    }

    #[test]
    fn result_schema_has_title() {
        let parsed: serde_json::Value = serde_json::from_str(&generate_result_schema()).unwrap();
        assert_eq!(
            parsed.get("title").and_then(|v| v.as_str()),
            Some("ValidationResult")
        );
    }
}
