//! Validation engine: path match → method → status → body schema
//!
//! A [`Registry`] is built once from one or more OpenAPI documents and is
//! read-only afterwards, so it can be shared across test threads.

use std::collections::HashMap;

use jsonschema::error::ValidationErrorKind;
use serde_json::{Value, json};

use oacheck_core::{CoverageEntry, CoverageKey, ValidationIssue, ValidationResult, match_path};

use crate::compile::{BodyValidator, CompiledContract, compile_document};
use crate::load::{LoadError, load_spec};
use crate::normalize::{NormalizeError, ParsedResponse, parse};

/// Where a response landed in the contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matched {
    pub template: String,
    pub params: HashMap<String, String>,
    /// Upper-cased method
    pub method: String,
    /// Declared status key that answered, e.g. "200", "default", "4XX"
    pub status: String,
}

impl Matched {
    /// Coverage key for this hit (method and status upper-cased).
    pub fn coverage_key(&self) -> CoverageKey {
        CoverageKey::new(&self.template, &self.method, &self.status)
    }
}

/// Validation result plus the contract location, when one was found.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub result: ValidationResult,
    pub matched: Option<Matched>,
}

/// Immutable validator registry built from OpenAPI documents.
#[derive(Debug, Default)]
pub struct Registry {
    contract: CompiledContract,
}

impl Registry {
    /// Build from already-parsed documents, merged in order.
    pub fn from_documents<'a, I>(documents: I) -> Self
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let mut contract = CompiledContract::default();
        for document in documents {
            contract.merge(compile_document(document));
        }
        Self { contract }
    }

    /// Load and build from spec locations (paths or `file://` URLs).
    ///
    /// # Errors
    ///
    /// Returns the first [`LoadError`]; no registry is built in that case.
    pub fn from_specs<S: AsRef<str>>(locations: &[S]) -> Result<Self, LoadError> {
        let documents = locations
            .iter()
            .map(|l| load_spec(l.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_documents(&documents))
    }

    /// Every declared (route, method) with its upper-cased statuses.
    pub fn endpoints(&self) -> &[CoverageEntry] {
        &self.contract.endpoints
    }

    pub fn templates(&self) -> Vec<&str> {
        self.contract.table.templates().collect()
    }

    /// Normalize `raw`, then validate it.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizeError`] if the response shape is not recognized.
    /// Contract violations are reported in the `Ok` result.
    pub fn validate(&self, raw: &Value) -> Result<ValidationResult, NormalizeError> {
        Ok(self.validate_parsed(&parse(raw)?))
    }

    pub fn validate_parsed(&self, response: &ParsedResponse) -> ValidationResult {
        self.evaluate(response).result
    }

    /// Route only: template, method and status key, without body validation.
    pub fn lookup(&self, response: &ParsedResponse) -> Result<Matched, ValidationIssue> {
        self.route(response).map(|(matched, _)| matched)
    }

    /// Validate and report where in the contract the response landed.
    pub fn evaluate(&self, response: &ParsedResponse) -> Evaluation {
        let (matched, body) = match self.route(response) {
            Ok(hit) => hit,
            Err(issue) => {
                return Evaluation {
                    result: ValidationResult::fail(vec![issue]),
                    matched: None,
                };
            }
        };

        // No body schema declared: any body is accepted
        let result = match body {
            Some(validator) => validate_body(validator, &response.body),
            None => ValidationResult::ok(),
        };
        Evaluation {
            result,
            matched: Some(matched),
        }
    }

    fn route(
        &self,
        response: &ParsedResponse,
    ) -> Result<(Matched, Option<&BodyValidator>), ValidationIssue> {
        let table = &self.contract.table;

        let Some(path_match) = match_path(&response.path, table.templates()) else {
            return Err(
                ValidationIssue::new("", format!("no matching path for {}", response.path))
                    .with_expected(json!(self.templates()))
                    .with_actual(json!(response.path)),
            );
        };
        let template = path_match.template.to_string();
        // The template came from the table, so the entry exists
        let Some(entry) = table.path(&template) else {
            return Err(ValidationIssue::new("", format!("no matching path for {}", response.path)));
        };

        let Some(operation) = entry.operation(&response.method) else {
            return Err(ValidationIssue::new(
                "",
                format!("no operation defined for method {} on {template}", response.method),
            )
            .with_expected(json!(entry.methods()))
            .with_actual(json!(response.method)));
        };

        let Some(status) = operation.status_for(response.status) else {
            return Err(ValidationIssue::new(
                "",
                format!(
                    "no response schema defined for status {} on {} {template}",
                    response.status, response.method
                ),
            )
            .with_expected(json!(operation.declared_statuses()))
            .with_actual(json!(response.status)));
        };

        let matched = Matched {
            template,
            params: path_match.params,
            method: response.method.to_ascii_uppercase(),
            status: status.status.clone(),
        };
        Ok((matched, status.body.as_ref()))
    }
}

fn validate_body(validator: &BodyValidator, body: &Value) -> ValidationResult {
    let errors: Vec<ValidationIssue> = validator
        .validator()
        .iter_errors(body)
        .map(|error| {
            let mut path = error.instance_path().to_string();
            let schema_path = error.schema_path().to_string();
            let keyword = keyword(error.kind(), &schema_path);

            // Point at the missing field, not its parent object
            if let ValidationErrorKind::Required { property, .. } = error.kind() {
                if let Some(name) = property.as_str() {
                    path = format!("{path}/{}", escape_segment(name));
                }
            }

            let mut issue = ValidationIssue::new(path, error.to_string());
            if let Some(keyword) = keyword {
                issue = issue.with_keyword(keyword);
            }
            if let Some(expected) = validator.schema().pointer(&schema_path) {
                issue = issue.with_expected(expected.clone());
            }
            if let Some(actual) = body.pointer(&issue.path) {
                issue = issue.with_actual(actual.clone());
            }
            issue
        })
        .collect();

    if errors.is_empty() {
        ValidationResult::ok()
    } else {
        ValidationResult::fail(errors)
    }
}

/// The failing rule. A `false` subschema has no keyword of its own; its
/// schema path ends at the property or item that holds it.
fn keyword(kind: &ValidationErrorKind, schema_path: &str) -> Option<String> {
    match kind {
        ValidationErrorKind::FalseSchema => Some("false".to_string()),
        ValidationErrorKind::Referencing(_) => Some("$ref".to_string()),
        _ => schema_path
            .rsplit('/')
            .next()
            .filter(|segment| !segment.is_empty())
            .map(str::to_string),
    }
}

fn escape_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Registry {
        let doc = json!({
            "openapi": "3.1.0",
            "paths": {
                "/pets": {
                    "get": {"responses": {
                        "200": {"content": {"application/json": {"schema": {
                            "type": "array",
                            "items": {"$ref": "#/components/schemas/Pet"}
                        }}}},
                        "4XX": {"content": {"application/json": {"schema": {"$ref": "#/components/schemas/Error"}}}}
                    }}
                },
                "/pets/{petId}": {
                    "get": {"responses": {
                        "200": {"content": {"application/json": {"schema": {"$ref": "#/components/schemas/Pet"}}}}
                    }},
                    "delete": {"responses": {"204": {"description": "deleted"}}}
                },
                "/pets/mine": {
                    "get": {"responses": {"default": {"description": "anything"}}}
                }
            },
            "components": {"schemas": {
                "Pet": {
                    "type": "object",
                    "required": ["id", "name"],
                    "properties": {
                        "id": {"type": "integer"},
                        "name": {"type": "string"},
                        "tag": {"type": ["string", "null"]},
                        "born": {"type": "string", "format": "date"}
                    }
                },
                "Error": {"type": "object", "required": ["message"]}
            }}
        });
        Registry::from_documents([&doc])
    }

    fn response(method: &str, path: &str, status: u16, body: Value) -> ParsedResponse {
        ParsedResponse {
            method: method.into(),
            path: path.into(),
            status,
            headers: Default::default(),
            body,
        }
    }

    #[test]
    fn valid_body_passes() {
        let r = registry().validate_parsed(&response(
            "GET",
            "/pets/1",
            200,
            json!({"id": 1, "name": "Fluffy", "tag": null}),
        ));
        assert!(r.valid, "{:?}", r.errors);
        assert!(r.errors.is_empty());
    }

    #[test]
    fn missing_required_field_points_at_field() {
        let r = registry().validate_parsed(&response("GET", "/pets/1", 200, json!({"id": 1})));
        assert!(!r.valid);
        let issue = r.errors.iter().find(|e| e.path == "/name").unwrap();
        assert_eq!(issue.keyword.as_deref(), Some("required"));
        assert_eq!(issue.expected, Some(json!(["id", "name"])));
        assert!(issue.actual.is_none());
        assert!(issue.message.contains("name"));
    }

    #[test]
    fn type_error_reports_expected_and_actual() {
        let r = registry().validate_parsed(&response(
            "GET",
            "/pets",
            200,
            json!([{"id": "one", "name": "Rex"}]),
        ));
        assert!(!r.valid);
        let issue = &r.errors[0];
        assert_eq!(issue.path, "/0/id");
        assert_eq!(issue.keyword.as_deref(), Some("type"));
        assert_eq!(issue.expected, Some(json!("integer")));
        assert_eq!(issue.actual, Some(json!("one")));
    }

    #[test]
    fn all_violations_are_reported() {
        let r = registry().validate_parsed(&response(
            "GET",
            "/pets/1",
            200,
            json!({"id": "x", "tag": 5}),
        ));
        assert!(r.errors.len() >= 3, "{:?}", r.errors);
    }

    #[test]
    fn formats_are_asserted() {
        let r = registry().validate_parsed(&response(
            "GET",
            "/pets/1",
            200,
            json!({"id": 1, "name": "Rex", "born": "yesterday"}),
        ));
        assert!(!r.valid);
        assert_eq!(r.errors[0].keyword.as_deref(), Some("format"));
    }

    #[test]
    fn unknown_path_lists_templates() {
        let r = registry().validate_parsed(&response("GET", "/unknown", 200, Value::Null));
        assert!(!r.valid);
        assert!(r.errors[0].message.contains("no matching path"));
        assert_eq!(
            r.errors[0].expected,
            Some(json!(["/pets", "/pets/{petId}", "/pets/mine"]))
        );
    }

    #[test]
    fn unknown_method() {
        let r = registry().validate_parsed(&response("PATCH", "/pets/1", 200, Value::Null));
        assert!(r.errors[0].message.contains("no operation defined for method"));
        assert_eq!(r.errors[0].expected, Some(json!(["GET", "DELETE"])));
    }

    #[test]
    fn undeclared_status_lists_declared() {
        let r = registry().validate_parsed(&response("GET", "/pets/1", 418, Value::Null));
        assert!(r.errors[0].message.contains("no response schema defined"));
        assert_eq!(r.errors[0].expected, Some(json!(["200"])));
        assert_eq!(r.errors[0].actual, Some(json!(418)));
    }

    #[test]
    fn range_status_is_used() {
        let reg = registry();
        let bad = reg.validate_parsed(&response("GET", "/pets", 404, json!({})));
        assert_eq!(bad.errors[0].keyword.as_deref(), Some("required"));
        let good = reg.validate_parsed(&response("GET", "/pets", 404, json!({"message": "gone"})));
        assert!(good.valid);
    }

    #[test]
    fn no_body_schema_accepts_anything() {
        let reg = registry();
        assert!(reg.validate_parsed(&response("DELETE", "/pets/1", 204, json!("whatever"))).valid);
        assert!(reg.validate_parsed(&response("GET", "/pets/mine", 503, json!([1, 2]))).valid);
    }

    #[test]
    fn literal_route_wins_and_lookup_reports_it() {
        let reg = registry();
        let matched = reg.lookup(&response("get", "/pets/mine", 200, Value::Null)).unwrap();
        assert_eq!(matched.template, "/pets/mine");
        assert_eq!(matched.status, "default");
        assert_eq!(
            matched.coverage_key(),
            CoverageKey::new("/pets/mine", "GET", "DEFAULT")
        );
    }

    #[test]
    fn evaluation_keeps_match_on_body_failure() {
        let eval = registry().evaluate(&response("GET", "/pets/7", 200, json!({})));
        assert!(!eval.result.valid);
        let matched = eval.matched.unwrap();
        assert_eq!(matched.params.get("petId").map(String::as_str), Some("7"));
    }

    #[test]
    fn validate_rejects_unrecognized_shape() {
        let err = registry().validate(&json!({"nothing": true})).unwrap_err();
        assert!(matches!(err, NormalizeError::UnrecognizedShape(_)));
    }

    #[test]
    fn registry_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Registry>();
    }

    #[test]
    fn false_subschema_reports_false_keyword() {
        let doc = json!({
            "paths": {"/legacy": {"get": {"responses": {"200": {"content": {"application/json": {
                "schema": {"type": "object", "properties": {"legacy": false}}
            }}}}}}}
        });
        let reg = Registry::from_documents([&doc]);
        let r = reg.validate_parsed(&response("GET", "/legacy", 200, json!({"legacy": 1})));
        assert!(!r.valid);
        let issue = &r.errors[0];
        assert_eq!(issue.path, "/legacy");
        assert_eq!(issue.keyword.as_deref(), Some("false"));
        assert_eq!(issue.expected, Some(json!(false)));
        assert_eq!(issue.actual, Some(json!(1)));
    }
}
