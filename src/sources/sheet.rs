// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Read support tickets from a spreadsheet `values` document (file or Sheets REST API)
// role: sources/sheet
// inputs: {"values": [[header...], [row...]]} JSON; sheet id + tab name + API key for the remote variant
// outputs: SheetLoad { tickets, warnings }
// side_effects: Reads files or performs one HTTP GET
// invariants:
// - Header names match case-insensitively; known aliases map to the same column
// - Row numbers are 1-based spreadsheet rows (header = 1)
// - Rows with content but no title are dropped with a warning; fully blank rows are skipped
// errors: Missing Title column; unreadable file; HTTP or JSON failures
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{Warning, WarningKind};
use crate::ext::serde_json::JsonFetch;
use crate::model::{Priority, TicketRecord};
use crate::util::read_json_file;

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Column {
  Title,
  Priority,
  Type,
  Assigned,
  ReportedBy,
  ReportedTime,
  FirstResponseTime,
  ClosedTime,
  Duration,
  Bucket,
  GithubIssue,
  Notes,
  RootCauseStatus,
}

/// Accepted header spellings, lowercase.
const HEADERS: &[(Column, &[&str])] = &[
  (Column::Title, &["title"]),
  (Column::Priority, &["priority"]),
  (Column::Type, &["type"]),
  (Column::Assigned, &["assigned", "assignee", "assigned to"]),
  (Column::ReportedBy, &["reported by", "reporter"]),
  (Column::ReportedTime, &["reported time (m/d/y t(24))", "reported time", "reported at"]),
  (Column::FirstResponseTime, &["first response time (m/d/y t(24))", "first response time", "first response at"]),
  (Column::ClosedTime, &["closed time (m/d/y t(24))", "closed time", "closed at"]),
  (Column::Duration, &["duration"]),
  (Column::Bucket, &["bucket"]),
  (Column::GithubIssue, &["github issue", "github issue link"]),
  (Column::Notes, &["notes"]),
  (Column::RootCauseStatus, &["root cause status"]),
];

#[derive(Debug, Clone, Default)]
pub struct SheetLoad {
  pub tickets: Vec<TicketRecord>,
  pub warnings: Vec<Warning>,
}

fn column_for(header: &str) -> Option<Column> {
  let h = header.trim().to_lowercase();
  HEADERS.iter().find(|(_, names)| names.contains(&h.as_str())).map(|(c, _)| *c)
}

/// Parse a `values` document into ticket records.
pub fn parse_sheet_values(doc: &Value) -> Result<SheetLoad> {
  let rows = doc.fetch("values").items();
  let Some((header, data)) = rows.split_first() else {
    warn!("ticket sheet is empty");
    return Ok(SheetLoad::default());
  };

  // Phase 1: header → column index (first occurrence wins)
  let mut columns: BTreeMap<Column, usize> = BTreeMap::new();
  for (idx, cell) in header.fetch("").items().iter().enumerate() {
    if let Some(col) = cell.as_str().and_then(column_for) {
      columns.entry(col).or_insert(idx);
    }
  }
  if !columns.contains_key(&Column::Title) {
    bail!("ticket sheet has no 'Title' column");
  }

  // Phase 2: rows
  let mut load = SheetLoad::default();
  for (i, row) in data.iter().enumerate() {
    let row_number = i + 2;
    let cell = |c: Column| columns.get(&c).and_then(|idx| row.fetch(&idx.to_string()).text());

    let Some(title) = cell(Column::Title) else {
      if row.fetch("").items().iter().any(|v| row_has_text(v)) {
        load.warnings.push(Warning::new(WarningKind::DroppedRow, format!("row {}: no title; row skipped", row_number)));
      }
      continue;
    };

    let priority_label = cell(Column::Priority).unwrap_or_default();
    load.tickets.push(TicketRecord {
      row: row_number,
      title,
      priority: Priority::classify(&priority_label),
      priority_label,
      ticket_type: cell(Column::Type).unwrap_or_default(),
      assignee: cell(Column::Assigned).unwrap_or_default(),
      reporter: cell(Column::ReportedBy).unwrap_or_default(),
      reported_at: cell(Column::ReportedTime),
      first_response_at: cell(Column::FirstResponseTime),
      closed_at: cell(Column::ClosedTime),
      duration: cell(Column::Duration).unwrap_or_default(),
      bucket: cell(Column::Bucket).unwrap_or_default(),
      github_issue_ref: cell(Column::GithubIssue),
      notes: cell(Column::Notes).unwrap_or_default(),
      root_cause_status: cell(Column::RootCauseStatus).unwrap_or_default(),
    });
  }

  info!(tickets = load.tickets.len(), dropped = load.warnings.len(), "parsed ticket sheet");
  Ok(load)
}

fn row_has_text(v: &Value) -> bool {
  v.fetch("").text().is_some()
}

pub fn load_sheet_file(path: &Path) -> Result<SheetLoad> {
  let doc: Value = read_json_file(path)?;
  parse_sheet_values(&doc).with_context(|| format!("reading tickets from {}", path.display()))
}

/// Fetch `{tab}!A:Z` through the Sheets `values` endpoint.
pub fn fetch_sheet(sheet_id: &str, tab: &str, api_key: &str) -> Result<SheetLoad> {
  let range = encode_component(&format!("{}!A:Z", tab));
  let url = format!("{}/{}/values/{}", SHEETS_API, encode_component(sheet_id), range);

  let agent: ureq::Agent = ureq::Agent::config_builder().timeout_global(Some(Duration::from_secs(30))).build().into();
  let mut resp = agent
    .get(&url)
    .query("key", api_key)
    .header("User-Agent", "team-activity-report")
    .call()
    .with_context(|| format!("fetching ticket sheet {} ({})", sheet_id, tab))?;
  let doc: Value = resp.body_mut().read_json().with_context(|| format!("decoding ticket sheet {}", sheet_id))?;

  parse_sheet_values(&doc).with_context(|| format!("reading tickets from sheet {}", sheet_id))
}

fn encode_component(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  for b in s.bytes() {
    if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~') {
      out.push(b as char);
    } else {
      out.push_str(&format!("%{:02X}", b));
    }
  }
  out
}
