//! oacheck-validator: OpenAPI 3.1 response contract validation
//!
//! Build phase: load specs, resolve local `$ref`s, strip malformed `$id`s,
//! compile one Draft 2020-12 validator per declared JSON response body.
//! Check phase: normalize a captured response, match its path, pick the
//! operation and status, validate the body, record coverage.

pub mod capture;
pub mod compile;
pub mod engine;
pub mod harness;
pub mod load;
pub mod normalize;
pub mod resolve;
pub mod sanitize;

pub use capture::capture_blocking;
pub use compile::{BodyValidator, CompileError, CompiledContract, ValidatorTable, compile_document};
pub use engine::{Evaluation, Matched, Registry};
pub use harness::{AssertionError, FinalizeSummary, Harness};
pub use load::{LoadError, load_spec};
pub use normalize::{ClientShape, NormalizeError, ParsedResponse, parse};
pub use resolve::{ResolveError, resolve, resolve_document};
pub use sanitize::sanitize;
