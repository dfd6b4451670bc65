//! Durable run artifacts.
//!
//! Everything here is a read-only projection of a [`RunResult`] and its
//! telemetry sequence: a CSV telemetry table, an NDJSON record stream, the
//! serialized result, a static HTML report, and a best-effort columnar
//! export that degrades to a diagnostic placeholder when Parquet support is
//! not compiled in.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::warn;

use crate::executor::{RunResult, TelemetryRecord};

/// Write all run artifacts into `out_dir`, creating it if needed.
///
/// On a dry run only the header-only CSV, the empty NDJSON stream, the
/// dry-marked result and the (empty) HTML report are produced. Columnar
/// export problems never propagate; every other write error does.
pub fn write_reports(
    out_dir: &Path,
    result: &RunResult,
    telemetry: &[TelemetryRecord],
) -> Result<()> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("create output directory {}", out_dir.display()))?;

    write_file(&out_dir.join("telemetry.csv"), &render_telemetry_csv(telemetry))?;
    write_file(&out_dir.join("events.ndjson"), &render_ndjson(telemetry)?)?;

    let results_json =
        serde_json::to_string_pretty(result).context("serialize run result")?;
    write_file(&out_dir.join("results.json"), &results_json)?;

    if !result.dry_run {
        export_columnar(out_dir, result, telemetry);
    }

    write_file(&out_dir.join("report.html"), &render_html(result, telemetry))?;
    Ok(())
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).with_context(|| format!("write {}", path.display()))
}

/// Telemetry CSV: fixed header, one row per record in emission order,
/// durations with 4 fixed decimals.
fn render_telemetry_csv(telemetry: &[TelemetryRecord]) -> String {
    let mut out = String::from("stage,name,duration_s,meta\n");
    for record in telemetry {
        let row = [
            record.stage.as_str().to_string(),
            record.name.clone(),
            format!("{:.4}", record.duration_s),
            meta_text(&record.meta),
        ];
        let escaped: Vec<String> = row.iter().map(|f| csv_field(f)).collect();
        out.push_str(&escaped.join(","));
        out.push('\n');
    }
    out
}

/// Quote a CSV field when it contains the delimiter, a quote or a newline.
fn csv_field(raw: &str) -> String {
    if raw.contains(',') || raw.contains('"') || raw.contains('\n') {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}

/// Render a record's meta for tabular output: bare string for digest
/// values, compact JSON otherwise.
fn meta_text(meta: &serde_json::Value) -> String {
    match meta {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn render_ndjson(telemetry: &[TelemetryRecord]) -> Result<String> {
    let mut out = String::new();
    for record in telemetry {
        let line = serde_json::to_string(record).context("serialize telemetry record")?;
        out.push_str(&line);
        out.push('\n');
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Columnar export
// ---------------------------------------------------------------------------

/// Strategy seam for the optional columnar telemetry export.
///
/// Selected once at compile time: the `parquet` cargo feature provides a
/// real Arrow/Parquet writer, otherwise the unavailable implementation
/// refuses and the caller records a diagnostic placeholder instead.
pub trait ColumnarExporter {
    /// Write `telemetry.parquet` and `results.parquet` into `out_dir`.
    fn export(
        &self,
        out_dir: &Path,
        result: &RunResult,
        telemetry: &[TelemetryRecord],
    ) -> Result<()>;
}

/// The exporter compiled into this build.
#[cfg(feature = "parquet")]
pub fn columnar_exporter() -> Box<dyn ColumnarExporter> {
    Box::new(parquet_export::ParquetExporter)
}

/// The exporter compiled into this build.
#[cfg(not(feature = "parquet"))]
pub fn columnar_exporter() -> Box<dyn ColumnarExporter> {
    Box::new(ExportUnavailable)
}

/// Fallback exporter for builds without Parquet support.
#[cfg(not(feature = "parquet"))]
struct ExportUnavailable;

#[cfg(not(feature = "parquet"))]
impl ColumnarExporter for ExportUnavailable {
    fn export(&self, _: &Path, _: &RunResult, _: &[TelemetryRecord]) -> Result<()> {
        anyhow::bail!("pipesim-core was built without the 'parquet' feature")
    }
}

/// Best-effort columnar export. Failures are swallowed into a diagnostic
/// placeholder file and never affect the run outcome.
fn export_columnar(out_dir: &Path, result: &RunResult, telemetry: &[TelemetryRecord]) {
    if let Err(err) = columnar_exporter().export(out_dir, result, telemetry) {
        let note = format!(
            "Parquet export skipped or failed: {err:#}\n\
             Rebuild with `--features parquet` to enable.\n"
        );
        if let Err(io_err) = fs::write(out_dir.join("parquet_export_failed.txt"), note) {
            warn!(error = %io_err, "could not write parquet diagnostic placeholder");
        }
    }
}

#[cfg(feature = "parquet")]
mod parquet_export {
    use std::fs::File;
    use std::sync::Arc;

    use anyhow::{Context, Result};
    use arrow::array::{ArrayRef, BooleanArray, Float64Array, StringArray};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;

    use super::{meta_text, ColumnarExporter};
    use crate::executor::{RunResult, TelemetryRecord};
    use std::path::Path;

    pub(super) struct ParquetExporter;

    impl ColumnarExporter for ParquetExporter {
        fn export(
            &self,
            out_dir: &Path,
            result: &RunResult,
            telemetry: &[TelemetryRecord],
        ) -> Result<()> {
            let stages: Vec<&str> = telemetry.iter().map(|r| r.stage.as_str()).collect();
            let names: Vec<&str> = telemetry.iter().map(|r| r.name.as_str()).collect();
            let durations: Vec<f64> = telemetry.iter().map(|r| r.duration_s).collect();
            let metas: Vec<String> = telemetry.iter().map(|r| meta_text(&r.meta)).collect();

            let batch = RecordBatch::try_from_iter(vec![
                ("stage", Arc::new(StringArray::from(stages)) as ArrayRef),
                ("name", Arc::new(StringArray::from(names)) as ArrayRef),
                ("duration_s", Arc::new(Float64Array::from(durations)) as ArrayRef),
                ("meta", Arc::new(StringArray::from(metas)) as ArrayRef),
            ])
            .context("assemble telemetry batch")?;
            write_batch(&out_dir.join("telemetry.parquet"), batch)?;

            let names: Vec<&str> = result.tests.iter().map(|t| t.name.as_str()).collect();
            let modules: Vec<&str> = result.tests.iter().map(|t| t.module.as_str()).collect();
            let oks: Vec<bool> = result.tests.iter().map(|t| t.ok).collect();
            let durations: Vec<f64> = result.tests.iter().map(|t| t.duration_s).collect();

            let batch = RecordBatch::try_from_iter(vec![
                ("name", Arc::new(StringArray::from(names)) as ArrayRef),
                ("module", Arc::new(StringArray::from(modules)) as ArrayRef),
                ("ok", Arc::new(BooleanArray::from(oks)) as ArrayRef),
                ("duration_s", Arc::new(Float64Array::from(durations)) as ArrayRef),
            ])
            .context("assemble results batch")?;
            write_batch(&out_dir.join("results.parquet"), batch)?;

            Ok(())
        }
    }

    fn write_batch(path: &Path, batch: RecordBatch) -> Result<()> {
        let file =
            File::create(path).with_context(|| format!("create {}", path.display()))?;
        let mut writer = ArrowWriter::try_new(file, batch.schema(), None)
            .context("open parquet writer")?;
        writer.write(&batch).context("write parquet batch")?;
        writer.close().context("close parquet writer")?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// HTML report
// ---------------------------------------------------------------------------

fn html_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Render the static HTML report: summary chips, per-test table, telemetry
/// table. A pure projection of the inputs; no additional computation.
fn render_html(result: &RunResult, telemetry: &[TelemetryRecord]) -> String {
    let mut test_rows = String::new();
    for test in &result.tests {
        let (class, label) = if test.ok { ("ok", "PASS") } else { ("fail", "FAIL") };
        let _ = write!(
            test_rows,
            "<tr><td>{}</td><td>{}</td><td class=\"{}\">{}</td><td>{}</td></tr>",
            html_escape(&test.name),
            html_escape(&test.module),
            class,
            label,
            test.duration_s,
        );
    }

    let mut tele_rows = String::new();
    for record in telemetry {
        let _ = write!(
            tele_rows,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td><pre style=\"margin:0\">{}</pre></td></tr>",
            html_escape(record.stage.as_str()),
            html_escape(&record.name),
            record.duration_s,
            html_escape(&record.meta.to_string()),
        );
    }

    format!(
        r#"<!doctype html>
<html lang="en">
<meta charset="utf-8">
<title>Pipeline Report</title>
<style>
  body {{ font-family: ui-sans-serif, system-ui, sans-serif; margin: 24px; }}
  header {{ margin-bottom: 20px; }}
  .summary {{ display: flex; gap: 16px; margin: 12px 0; }}
  .chip {{ padding: 6px 10px; border-radius: 999px; background: #f2f2f2; }}
  table {{ border-collapse: collapse; width: 100%; margin-top: 16px; }}
  th, td {{ border: 1px solid #e5e7eb; padding: 8px; font-size: 14px; }}
  th {{ background: #f8fafc; text-align: left; }}
  .ok {{ color: #065f46; font-weight: 600; }}
  .fail {{ color: #991b1b; font-weight: 600; }}
  footer {{ color: #6b7280; font-size: 12px; }}
</style>
<header>
  <h1>Build &amp; Test Pipeline Report</h1>
  <div class="summary">
    <div class="chip">Artifacts: <strong>{artifacts}</strong></div>
    <div class="chip">Passed: <strong>{passed}</strong></div>
    <div class="chip">Failed: <strong>{failed}</strong></div>
  </div>
</header>

<section>
  <h2>Test Results</h2>
  <table>
    <thead><tr><th>Name</th><th>Module</th><th>OK</th><th>Duration (s)</th></tr></thead>
    <tbody>{test_rows}</tbody>
  </table>
</section>

<section>
  <h2>Telemetry</h2>
  <table>
    <thead><tr><th>Stage</th><th>Name</th><th>Duration (s)</th><th>Meta</th></tr></thead>
    <tbody>{tele_rows}</tbody>
  </table>
</section>

<footer>
  Generated by pipesim at {generated_at}
</footer>
</html>
"#,
        artifacts = result.artifacts.len(),
        passed = result.passed_count(),
        failed = result.failed_count(),
        test_rows = test_rows,
        tele_rows = tele_rows,
        generated_at = Utc::now().to_rfc3339(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{Stage, TestResult};
    use serde_json::json;

    fn sample_result() -> RunResult {
        RunResult {
            failures: 1,
            tests: vec![
                TestResult {
                    name: "unit-core".to_string(),
                    module: "core".to_string(),
                    ok: true,
                    duration_s: 0.1001,
                },
                TestResult {
                    name: "unit-extra".to_string(),
                    module: "extra".to_string(),
                    ok: false,
                    duration_s: 0.1,
                },
            ],
            artifacts: [
                ("core".to_string(), "abc".to_string()),
                ("extra".to_string(), "def".to_string()),
            ]
            .into_iter()
            .collect(),
            dry_run: false,
        }
    }

    fn sample_telemetry() -> Vec<TelemetryRecord> {
        vec![
            TelemetryRecord {
                stage: Stage::Build,
                name: "core".to_string(),
                duration_s: 0.2003,
                meta: json!("abc"),
            },
            TelemetryRecord {
                stage: Stage::Test,
                name: "unit-core".to_string(),
                duration_s: 0.1001,
                meta: json!({ "ok": true }),
            },
        ]
    }

    #[test]
    fn test_csv_header_and_rows() {
        let csv = render_telemetry_csv(&sample_telemetry());
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "stage,name,duration_s,meta");
        assert_eq!(lines[1], "build,core,0.2003,abc");
        // Test meta is JSON and contains quotes, so the field is escaped.
        assert!(lines[2].starts_with("test,unit-core,0.1001,"));
        assert!(lines[2].contains("ok"));
    }

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_ndjson_one_line_per_record() {
        let ndjson = render_ndjson(&sample_telemetry()).expect("render failed");
        let lines: Vec<&str> = ndjson.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).expect("valid json");
        assert_eq!(first["stage"], "build");
        assert_eq!(first["meta"], "abc");

        let second: serde_json::Value = serde_json::from_str(lines[1]).expect("valid json");
        assert_eq!(second["meta"]["ok"], json!(true));
    }

    #[test]
    fn test_html_summary_counts() {
        let html = render_html(&sample_result(), &sample_telemetry());
        assert!(html.contains("Artifacts: <strong>2</strong>"));
        assert!(html.contains("Passed: <strong>1</strong>"));
        assert!(html.contains("Failed: <strong>1</strong>"));
        assert!(html.contains("PASS"));
        assert!(html.contains("FAIL"));
    }

    #[test]
    fn test_html_escapes_cell_values() {
        let mut result = sample_result();
        result.tests[0].name = "<script>alert(1)</script>".to_string();
        let html = render_html(&result, &[]);
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_write_reports_full_set() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_reports(dir.path(), &sample_result(), &sample_telemetry())
            .expect("write failed");

        assert!(dir.path().join("telemetry.csv").exists());
        assert!(dir.path().join("events.ndjson").exists());
        assert!(dir.path().join("results.json").exists());
        assert!(dir.path().join("report.html").exists());

        let results: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("results.json")).expect("read"),
        )
        .expect("valid json");
        assert_eq!(results["failures"], 1);
        assert_eq!(results["artifacts"]["core"], "abc");
        assert!(results.get("dry_run").is_none());
    }

    #[test]
    fn test_dry_run_artifacts_are_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_reports(dir.path(), &RunResult::dry(), &[]).expect("write failed");

        let csv = std::fs::read_to_string(dir.path().join("telemetry.csv")).expect("read");
        assert_eq!(csv, "stage,name,duration_s,meta\n");

        let ndjson = std::fs::read_to_string(dir.path().join("events.ndjson")).expect("read");
        assert!(ndjson.is_empty());

        let results: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("results.json")).expect("read"),
        )
        .expect("valid json");
        assert_eq!(results["dry_run"], json!(true));
        assert_eq!(results["failures"], 0);

        // No columnar output of any kind on a dry run.
        assert!(!dir.path().join("telemetry.parquet").exists());
        assert!(!dir.path().join("parquet_export_failed.txt").exists());
    }

    #[cfg(not(feature = "parquet"))]
    #[test]
    fn test_unavailable_export_writes_placeholder() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_reports(dir.path(), &sample_result(), &sample_telemetry())
            .expect("write failed");

        let note = std::fs::read_to_string(dir.path().join("parquet_export_failed.txt"))
            .expect("placeholder should exist");
        assert!(note.contains("parquet"));
        assert!(!dir.path().join("telemetry.parquet").exists());
    }

    #[cfg(feature = "parquet")]
    #[test]
    fn test_parquet_export_writes_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_reports(dir.path(), &sample_result(), &sample_telemetry())
            .expect("write failed");

        assert!(dir.path().join("telemetry.parquet").exists());
        assert!(dir.path().join("results.parquet").exists());
        assert!(!dir.path().join("parquet_export_failed.txt").exists());
    }
}
