//! oacheck-core: Core types for OpenAPI response contract checks
//!
//! This crate holds everything that needs no schema engine: configuration,
//! path template matching, validation result types and endpoint coverage
//! tracking.

pub mod config;
pub mod coverage;
pub mod matcher;
pub mod result;

pub use config::{Config, ConfigError, DEFAULT_EXPORT_PATH, RegisterOptions};
pub use coverage::{CoverageEntry, CoverageKey, CoverageStats, CoverageTracker};
pub use matcher::{PathMatch, match_path, normalize_path};
pub use result::{ValidationIssue, ValidationResult};
