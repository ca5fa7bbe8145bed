// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Load the manual assignee→login mapping and the repository status lookup
// role: sources/lookup
// inputs: JSON objects on disk
// outputs: Ordered maps consumed by the identity matcher and the aggregator
// side_effects: Reads files
// invariants: Blank keys and values are skipped; later status sources override earlier ones
// errors: Unreadable or malformed files, unknown status values
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::model::RepoStatus;
use crate::util::read_json_file;

/// `{ "Ticket Name": "github-login", ... }`
pub fn load_user_mapping(path: &Path) -> Result<BTreeMap<String, String>> {
  let raw: BTreeMap<String, String> = read_json_file(path)?;
  let mapping: BTreeMap<String, String> = raw
    .into_iter()
    .filter(|(k, v)| !k.trim().is_empty() && !v.trim().is_empty())
    .map(|(k, v)| (k, v.trim().to_string()))
    .collect();

  info!(path = %path.display(), entries = mapping.len(), "loaded user mapping");
  Ok(mapping)
}

/// `{ "repo-name": "active" | "archived" }`
pub fn load_repo_status(path: &Path) -> Result<BTreeMap<String, RepoStatus>> {
  let raw: BTreeMap<String, serde_json::Value> = read_json_file(path)?;
  let mut out = BTreeMap::new();

  for (name, value) in raw {
    let expected = || format!("repository '{}' in {}: expected \"active\" or \"archived\"", name, path.display());
    let status: RepoStatus = serde_json::from_value(value).with_context(expected)?;
    if status == RepoStatus::Unknown {
      bail!(expected());
    }
    out.insert(name, status);
  }

  info!(path = %path.display(), repositories = out.len(), "loaded repository status");
  Ok(out)
}

/// Overlay `overrides` on `base`.
pub fn merge_repo_status(
  mut base: BTreeMap<String, RepoStatus>,
  overrides: BTreeMap<String, RepoStatus>,
) -> BTreeMap<String, RepoStatus> {
  base.extend(overrides);
  base
}
