//! Pipeline orchestration: build phase, then test phase.
//!
//! The executor validates the document, simulates one unit of work per
//! module and per test in declaration order, and folds the outcomes into a
//! [`RunResult`] plus an ordered telemetry sequence. A test failing its
//! digest comparison is a recorded outcome, never an error; only
//! configuration errors abort a run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::config::ConfigDocument;
use crate::error::Result;
use crate::validate::validate;
use crate::work;

/// Pipeline stage a telemetry record belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Build,
    Test,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Build => "build",
            Stage::Test => "test",
        }
    }
}

/// One timed observation of a simulated unit of work.
///
/// Build records carry the artifact digest as `meta`; test records carry at
/// least `{"ok": bool}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub stage: Stage,
    pub name: String,
    /// Wall-clock duration, rounded to 4 decimals.
    pub duration_s: f64,
    pub meta: serde_json::Value,
}

/// Outcome of a single verification unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestResult {
    pub name: String,
    pub module: String,
    pub ok: bool,
    pub duration_s: f64,
}

/// Complete, immutable outcome of one pipeline execution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunResult {
    /// Count of test results with `ok == false`.
    pub failures: usize,
    /// One entry per configured test, in configuration order.
    pub tests: Vec<TestResult>,
    /// Module name to artifact digest.
    pub artifacts: BTreeMap<String, String>,
    /// Marker for validate-only runs; omitted from serialized output when
    /// false so a normal run's artifact keeps its exact key set.
    #[serde(default, skip_serializing_if = "is_false")]
    pub dry_run: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl RunResult {
    /// Empty, dry-marked result for validate-only runs.
    pub fn dry() -> Self {
        Self {
            dry_run: true,
            ..Self::default()
        }
    }

    /// Number of tests that passed.
    pub fn passed_count(&self) -> usize {
        self.tests.iter().filter(|t| t.ok).count()
    }

    /// Number of tests that failed.
    pub fn failed_count(&self) -> usize {
        self.tests.iter().filter(|t| !t.ok).count()
    }
}

/// A completed run: the authoritative result plus its telemetry sequence,
/// build records first, then test records, each in configuration order.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub result: RunResult,
    pub telemetry: Vec<TelemetryRecord>,
}

/// Pipeline orchestrator.
pub struct PipelineExecutor;

impl PipelineExecutor {
    /// Execute the pipeline described by `doc`.
    ///
    /// Validation failures propagate unchanged and produce no partial
    /// telemetry. With `dry_run` set, validation is the only work done and
    /// the outcome carries zero tests, artifacts and telemetry.
    pub async fn execute(doc: &ConfigDocument, dry_run: bool) -> Result<PipelineOutcome> {
        validate(doc)?;

        let run_id = Uuid::new_v4();

        if dry_run {
            info!(run_id = %run_id, "dry run: configuration valid, no work simulated");
            return Ok(PipelineOutcome {
                result: RunResult::dry(),
                telemetry: Vec::new(),
            });
        }

        info!(
            run_id = %run_id,
            modules = doc.modules.len(),
            tests = doc.tests.len(),
            "starting pipeline run"
        );

        let mut artifacts = BTreeMap::new();
        let mut telemetry = Vec::with_capacity(doc.modules.len() + doc.tests.len());

        for module in &doc.modules {
            // Trimmed names are the canonical module identity; validation
            // resolves references against them, so artifacts must be keyed
            // the same way.
            let name = module.name().trim().to_string();
            let (digest, elapsed) =
                work::simulate(&name, &module.payload(), module.seconds_or_default()).await;
            let duration_s = round4(elapsed);

            info!(stage = "build", unit = %name, duration_s, "unit complete");
            artifacts.insert(name.clone(), digest.clone());
            telemetry.push(TelemetryRecord {
                stage: Stage::Build,
                name,
                duration_s,
                meta: serde_json::Value::String(digest),
            });
        }

        let mut tests = Vec::with_capacity(doc.tests.len());
        let mut failures = 0;

        for test in &doc.tests {
            let name = test.name().trim().to_string();
            let target = test.module().trim().to_string();
            // The simulated work for a test is keyed by the test's own name
            // and its target module string, not by any test payload.
            let (_, elapsed) =
                work::simulate(&name, &target, test.seconds_or_default()).await;
            let duration_s = round4(elapsed);

            let ok = match test.expected_digest() {
                None => true,
                Some(expected) => artifacts.get(&target) == Some(&expected),
            };
            if !ok {
                failures += 1;
            }

            info!(stage = "test", unit = %name, ok, duration_s, "unit complete");
            telemetry.push(TelemetryRecord {
                stage: Stage::Test,
                name: name.clone(),
                duration_s,
                meta: json!({ "ok": ok }),
            });
            tests.push(TestResult {
                name,
                module: target,
                ok,
                duration_s,
            });
        }

        info!(
            run_id = %run_id,
            artifacts = artifacts.len(),
            passed = tests.len() - failures,
            failed = failures,
            "pipeline run complete"
        );

        Ok(PipelineOutcome {
            result: RunResult {
                failures,
                tests,
                artifacts,
                dry_run: false,
            },
            telemetry,
        })
    }
}

/// Round a duration to 4 decimal places for reporting.
fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
