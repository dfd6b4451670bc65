//! Structural and referential validation of a configuration document.
//!
//! Checks run as full passes in a fixed order, so error precedence is
//! deterministic: module names, duplicates, payload presence, module
//! seconds, then test names, module references, test seconds. The first
//! failure wins; nothing is aggregated, and tests are never inspected
//! while any module check fails.

use std::collections::{BTreeSet, HashSet};

use tracing::debug;

use crate::config::ConfigDocument;
use crate::error::{ConfigError, Result};

/// Validate a loaded configuration document.
///
/// Has no side effects besides returning the first [`ConfigError`]
/// encountered. Validating the same document twice yields the same outcome.
pub fn validate(doc: &ConfigDocument) -> Result<()> {
    let names: Vec<String> = doc
        .modules
        .iter()
        .map(|m| m.name().trim().to_string())
        .collect();

    if names.iter().any(String::is_empty) {
        return Err(ConfigError::EmptyModuleName);
    }

    let mut seen = HashSet::new();
    let mut duplicates = BTreeSet::new();
    for name in &names {
        if !seen.insert(name.as_str()) {
            duplicates.insert(name.clone());
        }
    }
    if !duplicates.is_empty() {
        return Err(ConfigError::DuplicateModuleNames(
            duplicates.into_iter().collect(),
        ));
    }

    for (module, name) in doc.modules.iter().zip(&names) {
        if !module.has_payload() {
            return Err(ConfigError::MissingPayload(name.clone()));
        }
    }

    for (module, name) in doc.modules.iter().zip(&names) {
        if module.seconds().is_some_and(|s| s < 0.0) {
            return Err(ConfigError::NegativeModuleSeconds(name.clone()));
        }
    }

    // Tests are checked against the already-validated module name set.
    let known: HashSet<&str> = names.iter().map(String::as_str).collect();

    for test in &doc.tests {
        if test.name().trim().is_empty() {
            return Err(ConfigError::EmptyTestName);
        }
    }

    for test in &doc.tests {
        let target = test.module().trim().to_string();
        if !known.contains(target.as_str()) {
            return Err(ConfigError::UnknownModuleRef {
                test: test.name().trim().to_string(),
                target,
            });
        }
    }

    for test in &doc.tests {
        if test.seconds().is_some_and(|s| s < 0.0) {
            return Err(ConfigError::NegativeTestSeconds(
                test.name().trim().to_string(),
            ));
        }
    }

    debug!(
        modules = doc.modules.len(),
        tests = doc.tests.len(),
        "configuration valid"
    );
    Ok(())
}
