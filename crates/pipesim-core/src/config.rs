//! Configuration document loading.
//!
//! The loader is the only place that touches raw serialized input. It parses
//! YAML into a schema-agnostic form and hands out raw module/test entries
//! with typed accessors; structural rules are enforced separately by
//! [`crate::validate::validate`], so the loader itself only rejects a
//! non-mapping top level.

use std::path::Path;
use std::str::FromStr;

use serde_yaml::{Mapping, Value};

use crate::error::{ConfigError, Result};

/// Simulated build duration when a module declares no `seconds`.
pub const DEFAULT_MODULE_SECONDS: f64 = 0.2;

/// Simulated test duration when a test declares no `seconds`.
pub const DEFAULT_TEST_SECONDS: f64 = 0.1;

/// Parsed configuration document: raw module and test entries in
/// declaration order.
///
/// An empty document is an empty mapping — no modules, no tests, not an
/// error. `modules` / `tests` keys that are absent or null default to empty
/// sequences.
#[derive(Debug, Clone, Default)]
pub struct ConfigDocument {
    pub modules: Vec<ModuleEntry>,
    pub tests: Vec<TestEntry>,
}

impl ConfigDocument {
    /// Read and parse a configuration file.
    ///
    /// # Errors
    ///
    /// - `ConfigError::Io` — the file could not be read.
    /// - `ConfigError::Parse` — the contents are not well-formed YAML.
    /// - `ConfigError::NotMapping` — the top-level value is not a mapping.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        raw.parse()
    }
}

impl FromStr for ConfigDocument {
    type Err = ConfigError;

    fn from_str(text: &str) -> Result<Self> {
        let value: Value = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_yaml::from_str(text)?
        };

        let mapping = match value {
            Value::Null => Mapping::new(),
            Value::Mapping(m) => m,
            _ => return Err(ConfigError::NotMapping),
        };

        Ok(Self {
            modules: entries(mapping.get("modules"), ModuleEntry),
            tests: entries(mapping.get("tests"), TestEntry),
        })
    }
}

/// Coerce an optional `modules` / `tests` value into raw entries.
///
/// Absent, null, or non-sequence values yield no entries; sequence items
/// that are not mappings become empty mappings (their missing `name` then
/// fails validation).
fn entries<T>(value: Option<&Value>, wrap: fn(Mapping) -> T) -> Vec<T> {
    match value {
        Some(Value::Sequence(seq)) => seq
            .iter()
            .map(|item| match item {
                Value::Mapping(m) => wrap(m.clone()),
                _ => wrap(Mapping::new()),
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Stringify a raw scalar field. Null and absent values become the empty
/// string; non-scalar values are not meaningful as identifiers and also
/// become empty.
fn scalar_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Numeric value of a raw scalar field. Quoted numerics (`seconds: "5"`)
/// coerce like bare ones; anything non-numeric is treated as undeclared.
fn scalar_f64(value: Option<&Value>) -> Option<f64> {
    match value {
        Some(Value::String(s)) => s.trim().parse().ok(),
        other => other.and_then(Value::as_f64),
    }
}

/// Raw module entry: one mapping from the `modules` sequence.
#[derive(Debug, Clone)]
pub struct ModuleEntry(Mapping);

impl ModuleEntry {
    pub fn name(&self) -> String {
        scalar_string(self.0.get("name"))
    }

    /// Whether the entry declares a `payload` key at all. A null payload
    /// still counts as declared; only absence fails validation.
    pub fn has_payload(&self) -> bool {
        self.0.get("payload").is_some()
    }

    pub fn payload(&self) -> String {
        scalar_string(self.0.get("payload"))
    }

    /// Declared `seconds`, if present and numeric.
    pub fn seconds(&self) -> Option<f64> {
        scalar_f64(self.0.get("seconds"))
    }

    pub fn seconds_or_default(&self) -> f64 {
        self.seconds().unwrap_or(DEFAULT_MODULE_SECONDS)
    }
}

/// Raw test entry: one mapping from the `tests` sequence.
#[derive(Debug, Clone)]
pub struct TestEntry(Mapping);

impl TestEntry {
    pub fn name(&self) -> String {
        scalar_string(self.0.get("name"))
    }

    /// Name of the module this test verifies.
    pub fn module(&self) -> String {
        scalar_string(self.0.get("module"))
    }

    pub fn seconds(&self) -> Option<f64> {
        scalar_f64(self.0.get("seconds"))
    }

    pub fn seconds_or_default(&self) -> f64 {
        self.seconds().unwrap_or(DEFAULT_TEST_SECONDS)
    }

    /// The digest this test asserts, if one was supplied. An explicit null
    /// counts as absent.
    pub fn expected_digest(&self) -> Option<String> {
        match self.0.get("expected_digest") {
            None | Some(Value::Null) => None,
            other => Some(scalar_string(other)),
        }
    }
}
