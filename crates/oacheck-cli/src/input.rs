//! Captured-response input: one JSON response object per line (JSONL)
//!
//! Blank lines and lines starting with `#` are skipped. A JSON array file
//! (first non-blank character `[`) is accepted too.

use anyhow::{Context, Result};
use serde_json::Value;

/// A captured response with the line it came from (1-based).
pub struct Captured {
    pub line: usize,
    pub value: Value,
}

/// Read captured responses from `path`, or stdin when `path` is `-`.
pub fn read_captured(path: &str) -> Result<Vec<Captured>> {
    let content = if path == "-" {
        std::io::read_to_string(std::io::stdin()).context("reading stdin")?
    } else {
        std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?
    };
    parse_captured(&content).with_context(|| format!("parsing {path}"))
}

fn parse_captured(content: &str) -> Result<Vec<Captured>> {
    if content.trim_start().starts_with('[') {
        let values: Vec<Value> = serde_json::from_str(content).context("invalid JSON array")?;
        return Ok(values
            .into_iter()
            .enumerate()
            .map(|(i, value)| Captured { line: i + 1, value })
            .collect());
    }

    content
        .lines()
        .enumerate()
        .filter(|(_, l)| {
            let t = l.trim();
            !t.is_empty() && !t.starts_with('#')
        })
        .map(|(i, l)| {
            let value = serde_json::from_str::<Value>(l)
                .with_context(|| format!("line {}: invalid JSON", i + 1))?;
            Ok::<_, anyhow::Error>(Captured { line: i + 1, value })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jsonl_skips_blank_and_comments() {
        let text = "# captured run\n{\"status\": 200}\n\n{\"status\": 404}\n";
        let captured = parse_captured(text).unwrap();
        assert_eq!(captured.len(), 2);
        assert_eq!(captured[0].line, 2);
        assert_eq!(captured[1].line, 4);
        assert_eq!(captured[1].value["status"], 404);
    }

    #[test]
    fn array_file() {
        let captured = parse_captured("[{\"status\": 200}, {\"status\": 201}]").unwrap();
        assert_eq!(captured.len(), 2);
        assert_eq!(captured[1].line, 2);
    }

    #[test]
    fn bad_line_names_its_number() {
        let err = parse_captured("{\"status\": 200}\n{oops\n").err().unwrap();
        assert!(format!("{err:#}").contains("line 2"));
    }

    #[test]
    fn reads_file_without_trailing_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("captured.jsonl");
        std::fs::write(&path, "{\"status\": 200}\r\n{\"status\": 500}").unwrap();
        let captured = read_captured(path.to_str().unwrap()).unwrap();
        assert_eq!(captured.len(), 2);
        assert_eq!(captured[1].value["status"], 500);
    }

    #[test]
    fn missing_file_is_named() {
        let err = read_captured("/nonexistent/captured.jsonl").err().unwrap();
        assert!(format!("{err:#}").contains("/nonexistent/captured.jsonl"));
    }
}
