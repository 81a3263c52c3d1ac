//! Endpoint coverage tracking
//!
//! The universe is every declared (route, method, status) triple. The
//! covered set grows as assertions run. Both sides sit behind locks so a
//! single tracker can be shared by parallel test threads.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::Path;

use parking_lot::{Mutex, RwLock};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One (route, method) pair with its declared status codes.
///
/// Used both for the build-time universe and for the uncovered export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CoverageEntry {
    pub route: String,
    pub method: String,
    pub statuses: Vec<String>,
}

/// Normalized coverage key: method and status upper-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CoverageKey {
    pub method: String,
    pub route: String,
    pub status: String,
}

impl CoverageKey {
    pub fn new(route: &str, method: &str, status: &str) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            route: route.to_string(),
            status: status.to_ascii_uppercase(),
        }
    }
}

impl std::fmt::Display for CoverageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.method, self.route, self.status)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CoverageStats {
    pub total: usize,
    pub covered: usize,
    /// Rounded percentage; 100 when nothing is declared
    pub percentage: u32,
}

#[derive(Debug, Default)]
pub struct CoverageTracker {
    universe: RwLock<Vec<CoverageKey>>,
    covered: Mutex<HashSet<CoverageKey>>,
}

impl CoverageTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `false` until endpoints have been registered.
    pub fn is_tracking(&self) -> bool {
        !self.universe.read().is_empty()
    }

    /// Expand each entry's status list into universe records.
    ///
    /// Additive: calling twice with the same entries duplicates them.
    pub fn register_endpoints(&self, entries: &[CoverageEntry]) {
        let mut universe = self.universe.write();
        for entry in entries {
            for status in &entry.statuses {
                universe.push(CoverageKey::new(&entry.route, &entry.method, status));
            }
        }
    }

    /// Mark a triple as exercised. Recording the same triple again is a no-op.
    pub fn record_coverage(&self, route: &str, method: &str, status: &str) {
        self.covered
            .lock()
            .insert(CoverageKey::new(route, method, status));
    }

    /// Universe minus covered, in registration order.
    pub fn uncovered(&self) -> Vec<CoverageKey> {
        let covered = self.covered.lock();
        self.universe
            .read()
            .iter()
            .filter(|key| !covered.contains(*key))
            .cloned()
            .collect()
    }

    /// Uncovered records grouped per (route, method), first-seen order.
    pub fn uncovered_grouped(&self) -> Vec<CoverageEntry> {
        let mut groups: Vec<CoverageEntry> = Vec::new();
        for key in self.uncovered() {
            match groups
                .iter_mut()
                .find(|g| g.route == key.route && g.method == key.method)
            {
                Some(group) => group.statuses.push(key.status),
                None => groups.push(CoverageEntry {
                    route: key.route,
                    method: key.method,
                    statuses: vec![key.status],
                }),
            }
        }
        groups
    }

    pub fn stats(&self) -> CoverageStats {
        let covered_set = self.covered.lock();
        let universe = self.universe.read();
        let total = universe.len();
        let covered = universe.iter().filter(|k| covered_set.contains(*k)).count();
        let percentage = if total == 0 {
            100
        } else {
            // Exact for any realistic endpoint count
            ((covered as f64 / total as f64) * 100.0).round() as u32
        };
        CoverageStats {
            total,
            covered,
            percentage,
        }
    }

    /// Human-readable summary: totals, then uncovered endpoints by route.
    pub fn render_summary(&self) -> String {
        let stats = self.stats();
        let mut out = String::new();
        let _ = writeln!(
            out,
            "API coverage: {}/{} endpoints ({}%)",
            stats.covered, stats.total, stats.percentage
        );

        let uncovered = self.uncovered_grouped();
        if uncovered.is_empty() {
            return out;
        }

        out.push_str("\nUncovered endpoints:\n");
        let mut routes: Vec<&str> = Vec::new();
        for entry in &uncovered {
            if !routes.contains(&entry.route.as_str()) {
                routes.push(&entry.route);
            }
        }
        for route in routes {
            let _ = writeln!(out, "  {route}");
            for entry in uncovered.iter().filter(|e| e.route == route) {
                let _ = writeln!(out, "    {} {}", entry.method, entry.statuses.join(", "));
            }
        }
        out
    }

    /// Write the grouped uncovered records as a pretty JSON array.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written.
    pub fn export_uncovered(&self, path: &Path) -> Result<(), std::io::Error> {
        let json = serde_json::to_string_pretty(&self.uncovered_grouped())
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        std::fs::write(path, json)
    }
}

/// Generate JSON Schema for the uncovered-endpoint export file.
#[must_use]
pub fn generate_export_schema() -> String {
    let schema = schemars::schema_for!(Vec<CoverageEntry>);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(route: &str, method: &str, statuses: &[&str]) -> CoverageEntry {
        CoverageEntry {
            route: route.into(),
            method: method.into(),
            statuses: statuses.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    fn pets_tracker() -> CoverageTracker {
        let tracker = CoverageTracker::new();
        tracker.register_endpoints(&[
            entry("/pets", "GET", &["200", "404"]),
            entry("/pets", "POST", &["201"]),
            entry("/pets/{petId}", "GET", &["200", "DEFAULT"]),
        ]);
        tracker
    }

    #[test]
    fn idle_until_registered() {
        let tracker = CoverageTracker::new();
        assert!(!tracker.is_tracking());
        tracker.register_endpoints(&[entry("/pets", "GET", &["200"])]);
        assert!(tracker.is_tracking());
    }

    #[test]
    fn half_covered() {
        let tracker = CoverageTracker::new();
        tracker.register_endpoints(&[entry("/pets", "GET", &["200", "404"])]);
        tracker.record_coverage("/pets", "GET", "200");

        assert_eq!(
            tracker.uncovered(),
            vec![CoverageKey::new("/pets", "GET", "404")]
        );
        let stats = tracker.stats();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.covered, 1);
        assert_eq!(stats.percentage, 50);
    }

    #[test]
    fn empty_universe_is_fully_covered() {
        let stats = CoverageTracker::new().stats();
        assert_eq!(stats.total, 0);
        assert_eq!(stats.percentage, 100);
    }

    #[test]
    fn recording_is_set_semantics() {
        let tracker = pets_tracker();
        tracker.record_coverage("/pets", "GET", "200");
        tracker.record_coverage("/pets", "GET", "200");
        assert_eq!(tracker.stats().covered, 1);
    }

    #[test]
    fn keys_are_normalized() {
        let tracker = pets_tracker();
        tracker.record_coverage("/pets/{petId}", "get", "default");
        assert!(
            !tracker
                .uncovered()
                .contains(&CoverageKey::new("/pets/{petId}", "GET", "DEFAULT"))
        );
    }

    #[test]
    fn unknown_keys_do_not_inflate_stats() {
        let tracker = pets_tracker();
        tracker.record_coverage("/elsewhere", "GET", "200");
        assert_eq!(tracker.stats().covered, 0);
    }

    #[test]
    fn percentage_rounds() {
        let tracker = CoverageTracker::new();
        tracker.register_endpoints(&[entry("/a", "GET", &["200", "201", "202"])]);
        tracker.record_coverage("/a", "GET", "200");
        tracker.record_coverage("/a", "GET", "201");
        assert_eq!(tracker.stats().percentage, 67);
    }

    #[test]
    fn repeated_registration_duplicates_universe() {
        let tracker = CoverageTracker::new();
        let entries = [entry("/a", "GET", &["200"])];
        tracker.register_endpoints(&entries);
        tracker.register_endpoints(&entries);
        assert_eq!(tracker.stats().total, 2);
    }

    #[test]
    fn grouped_export_shape() {
        let tracker = pets_tracker();
        tracker.record_coverage("/pets", "GET", "404");
        tracker.record_coverage("/pets/{petId}", "GET", "200");

        insta::assert_json_snapshot!(tracker.uncovered_grouped(), @r#"
        [
          {
            "route": "/pets",
            "method": "GET",
            "statuses": [
              "200"
            ]
          },
          {
            "route": "/pets",
            "method": "POST",
            "statuses": [
              "201"
            ]
          },
          {
            "route": "/pets/{petId}",
            "method": "GET",
            "statuses": [
              "DEFAULT"
            ]
          }
        ]
        "#);
    }

    #[test]
    fn summary_lists_uncovered_by_route() {
        let tracker = pets_tracker();
        tracker.record_coverage("/pets", "GET", "200");
        tracker.record_coverage("/pets/{petId}", "GET", "200");

        let expected = "\
API coverage: 2/5 endpoints (40%)

Uncovered endpoints:
  /pets
    GET 404
    POST 201
  /pets/{petId}
    GET DEFAULT
";
        assert_eq!(tracker.render_summary(), expected);
    }

    #[test]
    fn summary_when_everything_covered() {
        let tracker = CoverageTracker::new();
        tracker.register_endpoints(&[entry("/a", "GET", &["200"])]);
        tracker.record_coverage("/a", "GET", "200");
        assert_eq!(
            tracker.render_summary(),
            "API coverage: 1/1 endpoints (100%)\n"
        );
    }

    #[test]
    fn export_writes_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coverage.json");
        let tracker = pets_tracker();
        tracker.export_uncovered(&path).unwrap();

        let parsed: Vec<CoverageEntry> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0], entry("/pets", "GET", &["200", "404"]));
    }

    #[test]
    fn tracker_is_shareable_across_threads() {
        let tracker = std::sync::Arc::new(pets_tracker());
        let handles: Vec<_> = ["200", "404"]
            .into_iter()
            .map(|status| {
                let t = std::sync::Arc::clone(&tracker);
                std::thread::spawn(move || t.record_coverage("/pets", "GET", status))
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(tracker.stats().covered, 2);
    }
}
