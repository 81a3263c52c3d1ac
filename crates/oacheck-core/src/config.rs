//! Project configuration for contract checks

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default file name for the uncovered-endpoint export.
pub const DEFAULT_EXPORT_PATH: &str = "coverage.json";

/// Project configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// OpenAPI 3.1 documents (JSON), as filesystem paths or `file://` URLs
    #[serde(default)]
    pub specs: Vec<String>,

    /// Print the coverage summary when the run is finalized
    #[serde(default = "default_true")]
    pub report: bool,

    /// Write uncovered endpoints to `export_path` when the run is finalized
    #[serde(default)]
    pub export: bool,

    /// Export destination (default: "coverage.json" in the working directory)
    #[serde(default = "default_export_path")]
    pub export_path: PathBuf,
}

/// Options bag handed to spec registration.
///
/// `report_on_exit` and `export_on_exit` are independent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterOptions {
    pub report_on_exit: bool,
    pub export_on_exit: bool,
    pub export_path: PathBuf,
}

impl Default for RegisterOptions {
    fn default() -> Self {
        Self {
            report_on_exit: false,
            export_on_exit: false,
            export_path: default_export_path(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_export_path() -> PathBuf {
    PathBuf::from(DEFAULT_EXPORT_PATH)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            specs: vec!["openapi.json".to_string()],
            report: true,
            export: false,
            export_path: default_export_path(),
        }
    }
}

impl Config {
    /// Load config from file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e.to_string()))?;

        if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
        }
    }

    /// Load from default location (.oacheck.toml)
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load_default_in(Path::new("."))
    }

    /// Same as [`Config::load_default`], searching `dir` instead of the
    /// working directory.
    pub fn load_default_in(dir: &Path) -> Result<Self, ConfigError> {
        let candidates = [".oacheck.toml", ".oacheck.json", "oacheck.toml"];

        for name in candidates {
            let path = dir.join(name);
            if path.exists() {
                return Self::load(&path);
            }
        }

        // No config file, return default
        Ok(Self::default())
    }

    /// Registration options derived from the report/export flags.
    #[must_use]
    pub fn register_options(&self) -> RegisterOptions {
        RegisterOptions {
            report_on_exit: self.report,
            export_on_exit: self.export,
            export_path: self.export_path.clone(),
        }
    }

    /// Create example config file
    pub fn example() -> &'static str {
        r#"# oacheck configuration

# OpenAPI 3.1 documents (JSON). Paths or file:// URLs.
specs = ["openapi.json"]

# Print the coverage summary at the end of the run
report = true

# Write uncovered endpoints as JSON at the end of the run
export = false
# export_path = "coverage.json"
"#
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read {0}: {1}")]
    Io(PathBuf, String),
    #[error("Parse error: {0}")]
    Parse(String),
}
