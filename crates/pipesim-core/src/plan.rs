//! Dry, read-only plan projection.
//!
//! [`explain`] summarizes what a run would do without validating anything
//! and without simulating any work. Digests, when requested, use the same
//! content-hash function as the real build phase.

use serde::{Deserialize, Serialize};

use crate::config::ConfigDocument;
use crate::work::content_digest;

/// Planned build unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModulePlan {
    pub name: String,
    pub payload: String,
    /// Simulated duration, with the default applied.
    pub seconds: f64,
    /// Precomputed artifact digest; present only when digests were
    /// requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_digest: Option<String>,
}

/// Planned verification unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestPlan {
    pub name: String,
    pub module: String,
    /// Simulated duration, with the default applied.
    pub seconds: f64,
    /// Whether the configuration supplied an `expected_digest`. The value
    /// itself is never exposed here.
    pub expects_digest: bool,
}

/// Concise summary of what a run would do.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanSummary {
    pub modules: Vec<ModulePlan>,
    pub tests: Vec<TestPlan>,
}

/// Project a configuration document into a [`PlanSummary`].
///
/// Pure and instantaneous: no validation, no sleeping. Invalid documents
/// still produce a summary of whatever entries they contain.
pub fn explain(doc: &ConfigDocument, include_digests: bool) -> PlanSummary {
    let modules = doc
        .modules
        .iter()
        .map(|m| {
            let name = m.name();
            let payload = m.payload();
            let expected_digest = include_digests.then(|| content_digest(&name, &payload));
            ModulePlan {
                name,
                payload,
                seconds: m.seconds_or_default(),
                expected_digest,
            }
        })
        .collect();

    let tests = doc
        .tests
        .iter()
        .map(|t| TestPlan {
            name: t.name(),
            module: t.module(),
            seconds: t.seconds_or_default(),
            expects_digest: t.expected_digest().is_some(),
        })
        .collect();

    PlanSummary { modules, tests }
}
