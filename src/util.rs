// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Utilities for paths, JSON file loading, output naming, "now" handling and man page rendering
// role: utilities/helpers
// inputs: Paths; optional now override; clap CommandFactory
// outputs: Canonicalized paths, parsed JSON documents, output directory/file names, man page text
// side_effects: prepare_out_dir creates directories; read_json_file reads from disk
// invariants:
// - prepare_out_dir returns an existing directory (either provided or temp timestamped)
// - report_file_name pattern is stable and locale-independent
// errors: IO and parse errors bubble with the full path in context
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::CommandFactory;
use serde::de::DeserializeOwned;

pub fn canonicalize_lossy<P: AsRef<Path>>(p: P) -> String {
  let p = p.as_ref();
  let pb: PathBuf = match std::fs::canonicalize(p) {
    Ok(x) => x,
    Err(_) => match std::env::current_dir() {
      Ok(cwd) => cwd.join(p),
      Err(_) => PathBuf::from(p),
    },
  };
  pb.to_string_lossy().to_string()
}

/// Read and deserialize a JSON file, naming the path in any error.
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
  let buf = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
  serde_json::from_slice(&buf).with_context(|| format!("parsing JSON in {}", path.display()))
}

/// Returns the effective "now" given an optional override.
pub fn effective_now(override_now: Option<DateTime<Utc>>) -> DateTime<Utc> {
  override_now.unwrap_or_else(Utc::now)
}

/// Default report file name, e.g. `team_metrics_20250815_120000.json`.
pub fn report_file_name(now: DateTime<Utc>) -> String {
  format!("team_metrics_{}.json", now.format("%Y%m%d_%H%M%S"))
}

/// Prepare an output directory for split-table runs.
///
/// - When `out` is not "-", it is treated as the target directory; it will be created if needed.
/// - When `out` is "-", a temp directory is created with a timestamped name.
pub fn prepare_out_dir(out: &str, now_opt: Option<DateTime<Utc>>) -> Result<String> {
  let dir = if out != "-" {
    out.to_string()
  } else {
    let eff_now = effective_now(now_opt);
    std::env::temp_dir()
      .join(format!("team-metrics-{}", eff_now.format("%Y%m%d-%H%M%S")))
      .to_string_lossy()
      .to_string()
  };
  std::fs::create_dir_all(&dir).with_context(|| format!("creating output directory {}", dir))?;

  Ok(dir)
}

/// Render a section-1 man page for a clap `CommandFactory` implementor.
pub fn render_man_page<T: CommandFactory>() -> Result<String> {
  let cmd = T::command();
  let man = clap_mangen::Man::new(cmd);
  let mut buf: Vec<u8> = Vec::new();

  man.render(&mut buf)?;

  Ok(String::from_utf8_lossy(&buf).to_string())
}
