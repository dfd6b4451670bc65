//! End-to-end tests: YAML in, run artifacts out.

use pipesim_core::{
    explain, validate, ConfigDocument, ConfigError, PipelineExecutor, write_reports,
};

const SAMPLE: &str = r#"modules:
  - name: core
    payload: "src@abc123"
    seconds: 0.0
tests:
  - name: unit-core
    module: core
    seconds: 0.0
    expected_digest: "4fc41e5669eafc53d839cd3f1f8c5fa4b5406f85ea35f94da8a4d9151e7523de"
"#;

const SAMPLE_FAIL: &str = r#"modules:
  - name: core
    payload: "src@abc123"
    seconds: 0.0
tests:
  - name: unit-core
    module: core
    seconds: 0.0
    expected_digest: "WRONG"
"#;

fn load(text: &str) -> ConfigDocument {
    text.parse().expect("sample yaml should parse")
}

/// Validate-then-explain never fails for a valid configuration and the
/// plan mirrors the configured entries.
#[test]
fn test_validate_and_explain() {
    let doc = load(SAMPLE);
    validate(&doc).expect("sample should validate");

    let plan = explain(&doc, false);
    assert_eq!(plan.modules.len(), 1);
    assert_eq!(plan.modules[0].name, "core");
    assert!(plan.tests[0].expects_digest);
}

/// A full run over a real file tree: exit-equivalent outcome plus every
/// artifact in place.
#[tokio::test]
async fn test_run_success_and_outputs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config_path = dir.path().join("ok.yml");
    std::fs::write(&config_path, SAMPLE).expect("write config");
    let out = dir.path().join("build");

    let doc = ConfigDocument::from_path(&config_path).expect("load failed");
    let outcome = PipelineExecutor::execute(&doc, false)
        .await
        .expect("execute failed");
    write_reports(&out, &outcome.result, &outcome.telemetry).expect("report failed");

    assert_eq!(outcome.result.failures, 0);

    let telemetry = std::fs::read_to_string(out.join("telemetry.csv")).expect("read csv");
    assert!(telemetry.starts_with("stage,name,duration_s,meta"));
    assert_eq!(telemetry.lines().count(), 3);

    let results: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(out.join("results.json")).expect("read results"),
    )
    .expect("valid json");
    assert_eq!(results["failures"], 0);
    assert_eq!(
        results["artifacts"]["core"],
        "4fc41e5669eafc53d839cd3f1f8c5fa4b5406f85ea35f94da8a4d9151e7523de"
    );
    assert_eq!(results["tests"][0]["ok"], serde_json::json!(true));

    let ndjson = std::fs::read_to_string(out.join("events.ndjson")).expect("read ndjson");
    assert_eq!(ndjson.lines().count(), 2);

    let html = std::fs::read_to_string(out.join("report.html")).expect("read html");
    assert!(html.contains("Artifacts: <strong>1</strong>"));
    assert!(html.contains("PASS"));
}

/// A wrong expected digest is a recorded failure, not an abort.
#[tokio::test]
async fn test_run_failure_counted() {
    let outcome = PipelineExecutor::execute(&load(SAMPLE_FAIL), false)
        .await
        .expect("execute failed");

    assert_eq!(outcome.result.failures, 1);
    assert_eq!(outcome.result.tests.len(), 1);
    assert!(!outcome.result.tests[0].ok);
}

/// Dry runs validate, simulate nothing, and write header-only/empty
/// artifacts.
#[tokio::test]
async fn test_dry_run_outputs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("build");

    let outcome = PipelineExecutor::execute(&load(SAMPLE), true)
        .await
        .expect("execute failed");
    write_reports(&out, &outcome.result, &outcome.telemetry).expect("report failed");

    assert!(outcome.result.dry_run);
    assert!(outcome.telemetry.is_empty());

    let telemetry = std::fs::read_to_string(out.join("telemetry.csv")).expect("read csv");
    assert_eq!(telemetry, "stage,name,duration_s,meta\n");
    assert!(std::fs::read_to_string(out.join("events.ndjson"))
        .expect("read ndjson")
        .is_empty());

    let results: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(out.join("results.json")).expect("read results"),
    )
    .expect("valid json");
    assert_eq!(results["dry_run"], serde_json::json!(true));
    assert_eq!(results["tests"], serde_json::json!([]));
}

/// Validation errors surface before any unit of work is simulated.
#[tokio::test]
async fn test_config_error_aborts_run() {
    let doc = load(
        "modules:\n  - name: core\n    payload: src\ntests:\n  - name: t\n    module: missing\n",
    );
    let err = PipelineExecutor::execute(&doc, false).await.unwrap_err();
    match err {
        ConfigError::UnknownModuleRef { test, target } => {
            assert_eq!(test, "t");
            assert_eq!(target, "missing");
        }
        other => panic!("expected UnknownModuleRef, got {other:?}"),
    }
}

/// An adversarial 1000-second unit still finishes under the per-unit cap.
/// The paused clock auto-advances through the sleep, so wall time stays
/// near zero while the clamp path is exercised.
#[tokio::test(start_paused = true)]
async fn test_adversarial_seconds_clamped() {
    let doc = load(
        "modules:\n  - name: slow\n    payload: p\n    seconds: 1000\ntests:\n  - name: t\n    module: slow\n    seconds: 1000\n",
    );

    let wall = std::time::Instant::now();
    let outcome = PipelineExecutor::execute(&doc, false)
        .await
        .expect("execute failed");
    assert!(wall.elapsed().as_secs_f64() < 2.0, "clamp not applied");
    assert_eq!(outcome.result.failures, 0);
}

/// Repeated runs of the same configuration produce identical digests.
#[tokio::test]
async fn test_digests_stable_across_runs() {
    let first = PipelineExecutor::execute(&load(SAMPLE), false)
        .await
        .expect("execute failed");
    let second = PipelineExecutor::execute(&load(SAMPLE), false)
        .await
        .expect("execute failed");
    assert_eq!(first.result.artifacts, second.result.artifacts);
}
