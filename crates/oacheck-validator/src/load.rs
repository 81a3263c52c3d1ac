//! Spec file loading: filesystem path or `file://` URL, JSON only

use std::path::{Path, PathBuf};

use reqwest::Url;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Invalid spec location {0}: {1}")]
    Location(String, String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Turn a spec location into a filesystem path.
///
/// # Errors
///
/// Returns [`LoadError::Location`] for malformed or non-file URLs.
pub fn spec_path(location: &str) -> Result<PathBuf, LoadError> {
    if !location.starts_with("file:") {
        return Ok(PathBuf::from(location));
    }
    let url = Url::parse(location)
        .map_err(|e| LoadError::Location(location.to_string(), e.to_string()))?;
    url.to_file_path()
        .map_err(|()| LoadError::Location(location.to_string(), "not a local file URL".into()))
}

/// Read and parse one OpenAPI document.
///
/// # Errors
///
/// Returns error if the file cannot be read or is not valid JSON.
pub fn load_spec(location: &str) -> Result<serde_json::Value, LoadError> {
    let path = spec_path(location)?;
    let content = std::fs::read_to_string(&path)
        .map_err(|e| LoadError::Io(format!("{}: {e}", path.display())))?;
    let spec = parse_spec(&path, &content)?;
    tracing::debug!(spec = %path.display(), "loaded OpenAPI document");
    Ok(spec)
}

fn parse_spec(path: &Path, content: &str) -> Result<serde_json::Value, LoadError> {
    serde_json::from_str(content)
        .map_err(|e| LoadError::Parse(format!("{}: Invalid JSON: {e}", path.display())))
}
