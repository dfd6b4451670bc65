//! pipesim-core — deterministic build-then-test pipeline simulation.
//!
//! A fast, deterministic stand-in for a real build system:
//! - Loads a declarative YAML configuration of modules and tests
//! - Validates structural and referential invariants with typed errors
//! - Simulates each unit of work as a capped delay plus a content digest
//! - Produces an ordered telemetry sequence and an immutable run result
//! - Renders durable artifacts (CSV, NDJSON, JSON, HTML, optional Parquet)

pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod plan;
pub mod report;
pub mod validate;
pub mod work;

// Re-export key types
pub use config::{ConfigDocument, DEFAULT_MODULE_SECONDS, DEFAULT_TEST_SECONDS};
pub use error::{ConfigError, Result};
pub use executor::{
    PipelineExecutor, PipelineOutcome, RunResult, Stage, TelemetryRecord, TestResult,
};
pub use plan::{explain, ModulePlan, PlanSummary, TestPlan};
pub use report::write_reports;
pub use validate::validate;
pub use work::{content_digest, MAX_UNIT_SECONDS};
