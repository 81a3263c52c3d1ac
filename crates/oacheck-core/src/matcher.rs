//! Path template matching: observed request path → declared contract path
//!
//! Literal segments score 10, `{name}` segments score 1. The highest
//! cumulative score wins; ties go to the first candidate in list order.

use std::collections::HashMap;

const LITERAL_SCORE: u32 = 10;
const PARAM_SCORE: u32 = 1;

/// Winning template plus the values bound to its `{name}` segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMatch<'a> {
    pub template: &'a str,
    pub params: HashMap<String, String>,
}

/// Strip the query string and one trailing `/`. The root path stays `/`.
#[must_use]
pub fn normalize_path(observed: &str) -> &str {
    let path = observed.split_once('?').map_or(observed, |(p, _)| p);
    match path.strip_suffix('/') {
        Some("") | None => path,
        Some(stripped) => stripped,
    }
}

/// Find the best matching template for `observed`.
///
/// Returns `None` when no candidate matches; that is not an error.
pub fn match_path<'a, I>(observed: &str, candidates: I) -> Option<PathMatch<'a>>
where
    I: IntoIterator<Item = &'a str>,
{
    let observed_segments = segments(normalize_path(observed));

    let mut best: Option<(u32, PathMatch<'a>)> = None;
    for template in candidates {
        let Some((score, params)) = score_template(template, &observed_segments) else {
            continue;
        };
        // Strictly greater: an equal score never displaces an earlier candidate
        if best.as_ref().is_none_or(|(top, _)| score > *top) {
            best = Some((score, PathMatch { template, params }));
        }
    }

    best.map(|(_, m)| m)
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn score_template(template: &str, observed: &[&str]) -> Option<(u32, HashMap<String, String>)> {
    let template_segments = segments(template);
    if template_segments.len() != observed.len() {
        return None;
    }

    let mut score = 0;
    let mut params = HashMap::new();
    for (tpl, obs) in template_segments.iter().zip(observed) {
        if let Some(name) = param_name(tpl) {
            params.insert(name.to_string(), (*obs).to_string());
            score += PARAM_SCORE;
        } else if tpl == obs {
            score += LITERAL_SCORE;
        } else {
            return None;
        }
    }
    Some((score, params))
}

/// `{petId}` → `petId`. Segments like `{a}.json` are literals.
fn param_name(segment: &str) -> Option<&str> {
    segment
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .filter(|name| !name.is_empty() && !name.contains(['{', '}']))
}
