// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Hard failures of the reconciliation core and the non-fatal warning record
// role: errors/diagnostics
// outputs: ReconcileError (structural input problems), Warning (row-level and identity diagnostics)
// invariants: Only structurally invalid input is an error; everything recoverable becomes a Warning
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::fmt;

use serde::Serialize;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ReconcileError {
  #[error("no input records: both the activity and the ticket collections are empty")]
  NoRecords,
  #[error("{input} input is missing `{field}` on every one of its {records} records")]
  MissingField {
    input: &'static str,
    field: &'static str,
    records: usize,
  },
  #[error("window_days must be at least 1 (got {0})")]
  InvalidWindow(u32),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
  MalformedDate,
  EmptyAssignee,
  AmbiguousIdentity,
  UnknownMappingTarget,
  DurationOrder,
  MissingAuthor,
  MissingRepository,
  MissingReviewTarget,
  DroppedRow,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Warning {
  pub kind: WarningKind,
  pub message: String,
}

impl Warning {
  pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
    Self { kind, message: message.into() }
  }
}

impl fmt::Display for Warning {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.message)
  }
}
