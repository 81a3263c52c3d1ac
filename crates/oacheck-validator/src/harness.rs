//! Host-framework integration: register once, assert many, finalize at the end
//!
//! ```text
//! let harness = Harness::new();
//! harness.register_specs(&["openapi.json"], RegisterOptions::default())?;
//! harness.assert_response(&captured)?;   // per test
//! harness.finalize()?;                   // once, after the run
//! ```

use std::sync::OnceLock;

use serde_json::Value;

use oacheck_core::{
    CoverageEntry, CoverageStats, CoverageTracker, RegisterOptions, ValidationIssue,
};

use crate::engine::Registry;
use crate::load::LoadError;
use crate::normalize::{NormalizeError, ParsedResponse, parse};

#[derive(Debug, thiserror::Error)]
pub enum AssertionError {
    #[error("no OpenAPI spec registered; register schemas first")]
    NotRegistered,
    #[error("OpenAPI specs are already registered")]
    AlreadyRegistered,
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("cannot parse response: {0}")]
    Parse(#[from] NormalizeError),
    #[error("{message}")]
    Contract {
        message: String,
        errors: Vec<ValidationIssue>,
    },
}

impl AssertionError {
    /// Machine-readable violations (empty for non-contract failures).
    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            Self::Contract { errors, .. } => errors,
            _ => &[],
        }
    }
}

/// What [`Harness::finalize`] produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizeSummary {
    pub stats: CoverageStats,
    pub uncovered: Vec<CoverageEntry>,
    /// Rendered summary, when reporting is enabled
    pub report: Option<String>,
    /// Export destination, when exporting is enabled
    pub exported_to: Option<std::path::PathBuf>,
}

struct Registered {
    registry: Registry,
    options: RegisterOptions,
}

#[derive(Default)]
pub struct Harness {
    registered: OnceLock<Registered>,
    coverage: CoverageTracker,
}

impl Harness {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every spec, build the registry and the coverage universe.
    ///
    /// # Errors
    ///
    /// Returns [`AssertionError::Load`] if a spec cannot be loaded and
    /// [`AssertionError::AlreadyRegistered`] on a second call.
    pub fn register_specs<S: AsRef<str>>(
        &self,
        locations: &[S],
        options: RegisterOptions,
    ) -> Result<(), AssertionError> {
        if self.registered.get().is_some() {
            return Err(AssertionError::AlreadyRegistered);
        }
        let registry = Registry::from_specs(locations)?;
        self.install(registry, options)
    }

    /// Register an already-built registry.
    ///
    /// # Errors
    ///
    /// Returns [`AssertionError::AlreadyRegistered`] on a second call.
    pub fn install(&self, registry: Registry, options: RegisterOptions) -> Result<(), AssertionError> {
        let endpoints = registry.endpoints().to_vec();
        self.registered
            .set(Registered { registry, options })
            .map_err(|_| AssertionError::AlreadyRegistered)?;
        self.coverage.register_endpoints(&endpoints);
        Ok(())
    }

    pub fn registry(&self) -> Option<&Registry> {
        self.registered.get().map(|r| &r.registry)
    }

    pub fn coverage(&self) -> &CoverageTracker {
        &self.coverage
    }

    /// Validate one captured response and record coverage.
    ///
    /// # Errors
    ///
    /// - [`AssertionError::NotRegistered`] before [`Harness::register_specs`]
    /// - [`AssertionError::Parse`] for unrecognized response shapes
    /// - [`AssertionError::Contract`] for any contract violation
    pub fn assert_response(&self, raw: &Value) -> Result<(), AssertionError> {
        if self.registered.get().is_none() {
            return Err(AssertionError::NotRegistered);
        }
        self.assert_parsed(&parse(raw)?)
    }

    /// Same as [`Harness::assert_response`] for an already-normalized response.
    ///
    /// # Errors
    ///
    /// See [`Harness::assert_response`].
    pub fn assert_parsed(&self, response: &ParsedResponse) -> Result<(), AssertionError> {
        let registered = self.registered.get().ok_or(AssertionError::NotRegistered)?;

        let evaluation = registered.registry.evaluate(response);
        if let Some(matched) = &evaluation.matched {
            let key = matched.coverage_key();
            self.coverage
                .record_coverage(&key.route, &key.method, &key.status);
            tracing::debug!(hit = %key, "coverage recorded");
        }

        if evaluation.result.valid {
            return Ok(());
        }
        Err(AssertionError::Contract {
            message: format!(
                "{} {} ({}) does not match the OpenAPI contract: {}",
                response.method,
                response.path,
                response.status,
                evaluation.result.summary()
            ),
            errors: evaluation.result.errors,
        })
    }

    /// End-of-run hook: report and export according to the registration options.
    ///
    /// # Errors
    ///
    /// Returns error if the export file cannot be written.
    pub fn finalize(&self) -> Result<FinalizeSummary, std::io::Error> {
        let options = self
            .registered
            .get()
            .map(|r| r.options.clone())
            .unwrap_or_default();

        let report = options.report_on_exit.then(|| self.coverage.render_summary());
        if let Some(text) = &report {
            print!("{text}");
        }

        let exported_to = if options.export_on_exit {
            self.coverage.export_uncovered(&options.export_path)?;
            Some(options.export_path.clone())
        } else {
            None
        };

        Ok(FinalizeSummary {
            stats: self.coverage.stats(),
            uncovered: self.coverage.uncovered_grouped(),
            report,
            exported_to,
        })
    }
}
