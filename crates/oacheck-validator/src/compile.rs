//! Validator table compilation
//!
//! Walks `paths` → method → `responses` → status and compiles one body
//! validator per declared `application/json` schema. A schema that fails to
//! resolve or compile is logged and left without a validator; the rest of
//! the table still builds.

use serde_json::Value;

use oacheck_core::CoverageEntry;

use crate::resolve::{ResolveError, lookup_pointer, resolve};
use crate::sanitize::sanitize;

/// Recognized operation keys, in lookup order.
pub const METHODS: [&str; 8] = [
    "get", "post", "put", "patch", "delete", "options", "head", "trace",
];

const JSON_MEDIA_TYPE: &str = "application/json";

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("invalid schema: {0}")]
    Schema(String),
}

/// Compiled response body schema (Draft 2020-12, formats asserted).
pub struct BodyValidator {
    schema: Value,
    validator: jsonschema::Validator,
}

impl BodyValidator {
    /// # Errors
    ///
    /// Returns [`CompileError::Schema`] if the schema is not valid Draft 2020-12.
    pub fn compile(schema: Value) -> Result<Self, CompileError> {
        let validator = jsonschema::options()
            .with_draft(jsonschema::Draft::Draft202012)
            .should_validate_formats(true)
            .build(&schema)
            .map_err(|e| CompileError::Schema(e.to_string()))?;
        Ok(Self { schema, validator })
    }

    /// The schema this validator was compiled from (resolved and sanitized).
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    pub(crate) fn validator(&self) -> &jsonschema::Validator {
        &self.validator
    }
}

impl std::fmt::Debug for BodyValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BodyValidator")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// One declared response: `"200"`, `"default"`, `"4XX"`, ...
#[derive(Debug)]
pub struct StatusEntry {
    pub status: String,
    pub body: Option<BodyValidator>,
}

#[derive(Debug, Default)]
pub struct OperationEntry {
    pub statuses: Vec<StatusEntry>,
}

impl OperationEntry {
    /// Exact code, then `default`, then the `NXX` range, in that order.
    pub fn status_for(&self, code: u16) -> Option<&StatusEntry> {
        let exact = code.to_string();
        let range = format!("{}XX", exact.chars().next().unwrap_or('0'));
        [exact.as_str(), "default", range.as_str()]
            .into_iter()
            .find_map(|key| {
                self.statuses
                    .iter()
                    .find(|s| s.status.eq_ignore_ascii_case(key))
            })
    }

    /// Declared status keys, in document order.
    pub fn declared_statuses(&self) -> Vec<String> {
        self.statuses.iter().map(|s| s.status.clone()).collect()
    }
}

#[derive(Debug)]
pub struct PathEntry {
    pub template: String,
    /// Lower-cased method → operation, in [`METHODS`] order
    pub operations: Vec<(String, OperationEntry)>,
}

impl PathEntry {
    pub fn operation(&self, method: &str) -> Option<&OperationEntry> {
        let method = method.to_ascii_lowercase();
        self.operations
            .iter()
            .find(|(m, _)| *m == method)
            .map(|(_, op)| op)
    }

    pub fn methods(&self) -> Vec<String> {
        self.operations
            .iter()
            .map(|(m, _)| m.to_ascii_uppercase())
            .collect()
    }
}

/// `path → method → status → body validator`, in declaration order.
#[derive(Debug, Default)]
pub struct ValidatorTable {
    paths: Vec<PathEntry>,
}

impl ValidatorTable {
    pub fn templates(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(|p| p.template.as_str())
    }

    pub fn path(&self, template: &str) -> Option<&PathEntry> {
        self.paths.iter().find(|p| p.template == template)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Per-method merge: `other` wins when both declare the same method.
    pub fn merge(&mut self, other: ValidatorTable) {
        for incoming in other.paths {
            let Some(existing) = self
                .paths
                .iter_mut()
                .find(|p| p.template == incoming.template)
            else {
                self.paths.push(incoming);
                continue;
            };
            for (method, op) in incoming.operations {
                match existing.operations.iter_mut().find(|(m, _)| *m == method) {
                    Some(slot) => slot.1 = op,
                    None => existing.operations.push((method, op)),
                }
            }
        }
    }
}

/// Everything the build phase produces from one document.
#[derive(Debug, Default)]
pub struct CompiledContract {
    pub table: ValidatorTable,
    pub endpoints: Vec<CoverageEntry>,
}

impl CompiledContract {
    /// Merge another document's contract, replacing same (route, method) endpoints.
    pub fn merge(&mut self, other: CompiledContract) {
        self.endpoints.retain(|e| {
            !other
                .endpoints
                .iter()
                .any(|o| o.route == e.route && o.method == e.method)
        });
        self.endpoints.extend(other.endpoints);
        self.table.merge(other.table);
    }
}

/// Compile every declared response of `document`.
#[must_use]
pub fn compile_document(document: &Value) -> CompiledContract {
    let mut contract = CompiledContract::default();

    let Some(paths) = document.get("paths").and_then(Value::as_object) else {
        return contract;
    };

    for (template, path_item) in paths {
        // Path items may themselves be local references
        let path_item = path_item
            .get("$ref")
            .and_then(Value::as_str)
            .and_then(|r| lookup_pointer(document, r))
            .unwrap_or(path_item);

        let mut operations = Vec::new();
        for method in METHODS {
            let Some(operation) = path_item.get(method).filter(|o| o.is_object()) else {
                continue;
            };

            let mut entry = OperationEntry::default();
            if let Some(responses) = operation.get("responses").and_then(Value::as_object) {
                for (status, response) in responses {
                    let body = match compile_response(document, response) {
                        Ok(body) => body,
                        Err(e) => {
                            tracing::warn!(
                                path = %template,
                                method,
                                status = %status,
                                error = %e,
                                "response schema not compiled; body will not be validated"
                            );
                            None
                        }
                    };
                    entry.statuses.push(StatusEntry {
                        status: status.clone(),
                        body,
                    });
                }
            }

            // Nothing to cover without declared responses
            if !entry.statuses.is_empty() {
                contract.endpoints.push(CoverageEntry {
                    route: template.clone(),
                    method: method.to_ascii_uppercase(),
                    statuses: entry
                        .statuses
                        .iter()
                        .map(|s| s.status.to_ascii_uppercase())
                        .collect(),
                });
            }
            operations.push((method.to_string(), entry));
        }

        if !operations.is_empty() {
            contract.table.paths.push(PathEntry {
                template: template.clone(),
                operations,
            });
        }
    }

    tracing::debug!(
        paths = contract.table.len(),
        endpoints = contract.endpoints.len(),
        "compiled validator table"
    );
    contract
}

fn compile_response(
    document: &Value,
    response: &Value,
) -> Result<Option<BodyValidator>, CompileError> {
    let response = response_object(document, response)?;
    let Some(schema) = response
        .get("content")
        .and_then(Value::as_object)
        .and_then(json_media)
        .and_then(|media| media.get("schema"))
    else {
        return Ok(None);
    };
    let schema = resolve(document, schema)?;
    BodyValidator::compile(sanitize(&schema)).map(Some)
}

/// Follow response-level `$ref`s (`#/components/responses/...`) without
/// touching headers, links or examples.
fn response_object<'a>(
    document: &'a Value,
    response: &'a Value,
) -> Result<&'a Value, CompileError> {
    let mut current = response;
    let mut seen: Vec<&str> = Vec::new();
    while let Some(reference) = current.get("$ref").and_then(Value::as_str) {
        if seen.contains(&reference) {
            return Err(ResolveError::CircularReference {
                pointer: reference.to_string(),
                chain: seen.iter().map(|s| (*s).to_string()).collect(),
            }
            .into());
        }
        let Some(target) = lookup_pointer(document, reference) else {
            break;
        };
        seen.push(reference);
        current = target;
    }
    Ok(current)
}

/// `application/json`, or the same media type with parameters (`; charset=...`).
fn json_media(content: &serde_json::Map<String, Value>) -> Option<&Value> {
    content.get(JSON_MEDIA_TYPE).or_else(|| {
        content
            .iter()
            .find(|(media, _)| media.split(';').next().map(str::trim) == Some(JSON_MEDIA_TYPE))
            .map(|(_, m)| m)
    })
}
