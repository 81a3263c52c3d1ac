//! Local `$ref` resolution: inline every `#/...` pointer into a self-contained tree
//!
//! Sibling keys next to a `$ref` are shallow-merged over the resolved target.
//! Remote references (anything not starting with `#/`) are left untouched.

use std::collections::HashMap;

use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("circular reference: {pointer} (via {})", .chain.join(" -> "))]
    CircularReference { pointer: String, chain: Vec<String> },
}

/// Resolve every local reference inside `node` against `document`.
///
/// Each pointer is resolved once per call; later occurrences reuse the result.
///
/// # Errors
///
/// Returns [`ResolveError::CircularReference`] if a pointer is reached again
/// while it is still being resolved.
pub fn resolve(document: &Value, node: &Value) -> Result<Value, ResolveError> {
    Resolver::new(document).node(node)
}

/// Resolve the whole document against itself.
///
/// # Errors
///
/// Same as [`resolve`].
pub fn resolve_document(document: &Value) -> Result<Value, ResolveError> {
    resolve(document, document)
}

/// Look up a local reference (`#/a/b~1c`) without resolving what it points to.
///
/// Returns `None` for non-local references and for pointers with a missing segment.
pub fn lookup_pointer<'a>(document: &'a Value, reference: &str) -> Option<&'a Value> {
    let pointer = reference.strip_prefix("#/")?;
    pointer
        .split('/')
        .map(unescape_segment)
        .try_fold(document, |node, segment| match node {
            Value::Object(map) => map.get(&segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
}

fn unescape_segment(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

struct Resolver<'a> {
    document: &'a Value,
    /// Pointers currently being expanded, outermost first
    resolving: Vec<String>,
    /// Fully expanded targets by pointer
    resolved: HashMap<String, Value>,
}

impl<'a> Resolver<'a> {
    fn new(document: &'a Value) -> Self {
        Self {
            document,
            resolving: Vec::new(),
            resolved: HashMap::new(),
        }
    }

    fn node(&mut self, node: &Value) -> Result<Value, ResolveError> {
        match node {
            Value::Array(items) => items
                .iter()
                .map(|item| self.node(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Value::Object(map) => {
                let document = self.document;
                let reference = map.get("$ref").and_then(Value::as_str);
                match reference.and_then(|r| lookup_pointer(document, r).map(|t| (r, t))) {
                    Some((reference, target)) => self.reference(map, reference, target),
                    // Unresolvable or remote: keep `$ref`, still walk the siblings
                    None => self.map(map).map(Value::Object),
                }
            }
            _ => Ok(node.clone()),
        }
    }

    fn reference(
        &mut self,
        map: &Map<String, Value>,
        reference: &str,
        target: &Value,
    ) -> Result<Value, ResolveError> {
        let resolved = self.target(reference, target)?;

        if map.len() == 1 {
            return Ok(resolved);
        }

        let Value::Object(mut merged) = resolved else {
            // Siblings cannot be merged into a scalar or array target
            return Ok(resolved);
        };
        for (key, value) in map {
            if key == "$ref" {
                continue;
            }
            merged.insert(key.clone(), self.node(value)?);
        }
        Ok(Value::Object(merged))
    }

    /// Expansion of `target` does not depend on where `reference` was met,
    /// so a successful result is cached.
    fn target(&mut self, reference: &str, target: &Value) -> Result<Value, ResolveError> {
        if self.resolving.iter().any(|r| r == reference) {
            return Err(ResolveError::CircularReference {
                pointer: reference.to_string(),
                chain: self.resolving.clone(),
            });
        }
        if let Some(done) = self.resolved.get(reference) {
            return Ok(done.clone());
        }

        self.resolving.push(reference.to_string());
        let resolved = self.node(target);
        self.resolving.pop();
        let resolved = resolved?;

        self.resolved.insert(reference.to_string(), resolved.clone());
        Ok(resolved)
    }

    fn map(&mut self, map: &Map<String, Value>) -> Result<Map<String, Value>, ResolveError> {
        map.iter()
            .map(|(k, v)| Ok((k.clone(), self.node(v)?)))
            .collect()
    }
}
