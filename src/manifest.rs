// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Build and write the table manifest for split-table runs
// role: persistence/manifest
// inputs: generated_at, window bounds, TableEntry[] (name, file, row count)
// outputs: manifest.json file written under base_dir
// side_effects: Writes to filesystem
// invariants:
// - tables[] keeps the order entries were pushed in
// - file paths in entries are relative to base_dir
// - generated_at is serialized as %Y-%m-%dT%H:%M:%SZ (UTC)
// errors: IO errors surfaced with full path context
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::report::WindowInfo;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableEntry {
  pub name: String,
  pub file: String,
  pub rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableManifest {
  pub generated_at: String,
  pub window: WindowInfo,
  pub tables: Vec<TableEntry>,
}

impl TableManifest {
  pub fn new(generated_at: DateTime<Utc>, window: WindowInfo) -> Self {
    Self { generated_at: generated_at.format("%Y-%m-%dT%H:%M:%SZ").to_string(), window, tables: Vec::new() }
  }

  pub fn push(&mut self, name: &str, file: &str, rows: usize) {
    self.tables.push(TableEntry { name: name.to_string(), file: file.to_string(), rows });
  }

  pub fn write_to(&self, base_dir: &Path) -> Result<PathBuf> {
    let path = base_dir.join("manifest.json");
    let buf = serde_json::to_vec_pretty(self)?;
    std::fs::write(&path, buf).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
  }
}
