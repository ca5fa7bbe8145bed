// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Serialize the reconciliation report as one JSON document or as one file per table plus a manifest
// role: persistence/render
// inputs: ReconciliationReport, output target ("-", a file or an existing directory), split flag, effective now
// outputs: Text for stdout (the report, or a {dir, manifest} pointer for split runs)
// side_effects: Writes files when the target is not stdout or when splitting
// invariants:
// - Output is pretty JSON with stable key order; rendering the same report twice yields identical bytes
// - Split runs always write every table, including empty ones
// errors: IO and serialization errors with the target path in context
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::manifest::TableManifest;
use crate::report::ReconciliationReport;
use crate::util;

#[derive(Debug, Clone)]
pub struct RenderOptions {
  pub out: String,
  pub split_tables: bool,
  pub now: Option<DateTime<Utc>>,
}

pub fn report_json(report: &ReconciliationReport) -> Result<String> {
  Ok(serde_json::to_string_pretty(report)?)
}

/// Write the report; the returned text (if any) belongs on stdout.
pub fn render_report(report: &ReconciliationReport, opts: &RenderOptions) -> Result<Option<String>> {
  if opts.split_tables {
    let dir = util::prepare_out_dir(&opts.out, opts.now)?;
    write_tables(report, Path::new(&dir), util::effective_now(opts.now))?;
    let pointer = serde_json::json!({ "dir": dir, "manifest": "manifest.json" });
    return Ok(Some(serde_json::to_string_pretty(&pointer)?));
  }

  let text = report_json(report)?;
  if opts.out == "-" {
    return Ok(Some(text));
  }

  // An existing directory gets a timestamped file inside it
  let target = Path::new(&opts.out);
  let path = if target.is_dir() {
    target.join(util::report_file_name(util::effective_now(opts.now)))
  } else {
    target.to_path_buf()
  };
  if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
    std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
  }
  std::fs::write(&path, text.as_bytes()).with_context(|| format!("writing report to {}", path.display()))?;
  info!(path = %path.display(), "wrote report");
  Ok(None)
}

/// One JSON file per table plus `manifest.json`.
pub fn write_tables(report: &ReconciliationReport, dir: &Path, generated_at: DateTime<Utc>) -> Result<()> {
  let mut manifest = TableManifest::new(generated_at, report.summary.window.clone());

  write_table(dir, &mut manifest, "summary", &report.summary, 1)?;
  write_table(dir, &mut manifest, "people", &report.people, report.people.len())?;
  write_table(dir, &mut manifest, "repositories", &report.repositories, report.repositories.len())?;
  write_table(dir, &mut manifest, "tickets", &report.tickets, report.tickets.len())?;
  write_table(dir, &mut manifest, "ranking", &report.ranking, report.ranking.rows.len())?;
  let mq_rows = report.match_quality.matches.len();
  write_table(dir, &mut manifest, "match_quality", &report.match_quality, mq_rows)?;
  write_table(dir, &mut manifest, "warnings", &report.warnings, report.warnings.len())?;

  let path = manifest.write_to(dir)?;
  info!(dir = %dir.display(), manifest = %path.display(), tables = manifest.tables.len(), "wrote split tables");
  Ok(())
}

fn write_table<T: Serialize>(dir: &Path, manifest: &mut TableManifest, name: &str, table: &T, rows: usize) -> Result<()> {
  let file = format!("{}.json", name);
  let path = dir.join(&file);
  std::fs::write(&path, serde_json::to_vec_pretty(table)?).with_context(|| format!("writing {}", path.display()))?;
  manifest.push(name, &file, rows);
  Ok(())
}
