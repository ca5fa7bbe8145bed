// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Load pre-exported activity records from JSON, validated against the embedded schema
// role: sources/activity-file
// inputs: Path to a JSON array of activity records; reporting window
// outputs: Vec<ActivityRecord> inside the window
// side_effects: Reads the file; logs counts
// invariants:
// - Schema validation runs before deserialization so shape errors name the offending record
// - Records outside the window are dropped and counted, never silently kept
// - Revert commits are dropped and counted
// errors: Unreadable file, invalid JSON or schema violations (first few listed)
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use serde_json::Value;
use tracing::info;

use crate::model::ActivityRecord;
use crate::util::read_json_file;
use crate::window::ReportWindow;

const ACTIVITY_SCHEMA: &str = include_str!("../../schemas/activity.schema.json");
const MAX_REPORTED_ERRORS: usize = 5;

pub fn validate_activity_json(doc: &Value) -> Result<()> {
  let schema: Value = serde_json::from_str(ACTIVITY_SCHEMA).context("parsing embedded activity schema")?;
  let validator = jsonschema::validator_for(&schema).map_err(|e| anyhow!("compiling activity schema: {}", e))?;

  let errors: Vec<String> = validator.iter_errors(doc).take(MAX_REPORTED_ERRORS).map(|e| e.to_string()).collect();
  if !errors.is_empty() {
    bail!("activity records do not match the expected shape:\n  - {}", errors.join("\n  - "));
  }

  Ok(())
}

/// Drop revert commits; returns the kept records and the number dropped.
pub fn drop_reverts(records: Vec<ActivityRecord>) -> (Vec<ActivityRecord>, usize) {
  let before = records.len();
  let kept: Vec<ActivityRecord> = records.into_iter().filter(|r| !r.is_revert()).collect();
  let dropped = before - kept.len();
  (kept, dropped)
}

/// Keep records inside `window`; returns the kept records and the number dropped.
pub fn filter_to_window(records: Vec<ActivityRecord>, window: &ReportWindow) -> (Vec<ActivityRecord>, usize) {
  let before = records.len();
  let kept: Vec<ActivityRecord> = records.into_iter().filter(|r| window.contains(r.timestamp)).collect();
  let dropped = before - kept.len();
  (kept, dropped)
}

pub fn load_activity_file(path: &Path, window: &ReportWindow) -> Result<Vec<ActivityRecord>> {
  let doc: Value = read_json_file(path)?;
  validate_activity_json(&doc).with_context(|| format!("validating {}", path.display()))?;

  let records: Vec<ActivityRecord> =
    serde_json::from_value(doc).with_context(|| format!("decoding activity records in {}", path.display()))?;
  let (records, reverts) = drop_reverts(records);
  let (kept, dropped) = filter_to_window(records, window);

  info!(path = %path.display(), kept = kept.len(), outside_window = dropped, reverts, "loaded activity records");

  Ok(kept)
}
