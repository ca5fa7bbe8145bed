// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Core entry point: validate inputs, match identities, aggregate, derive and build the report
// role: core/orchestration
// inputs: ReconcileInput (records + repository status + upstream warnings), ReconcileConfig (window, user mapping)
// outputs: Result<ReconciliationReport, ReconcileError>
// side_effects: tracing events only
// invariants:
// - No clock, no randomness, no I/O; identical input and config produce an identical report
// - Structural problems fail fast before any folding starts
// errors: ReconcileError::{NoRecords, MissingField, InvalidWindow}
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::{BTreeMap, BTreeSet};
use std::num::NonZeroU32;

use tracing::{info, warn};

use crate::aggregate::aggregate;
use crate::error::{ReconcileError, Warning};
use crate::identity::{match_identities, GithubIdentity};
use crate::model::{ActivityRecord, PersonKey, RepoStatus, TicketRecord};
use crate::report::{build_report, ReconciliationReport, WindowInfo};

#[derive(Debug, Clone, Default)]
pub struct ReconcileInput {
  pub activity: Vec<ActivityRecord>,
  pub tickets: Vec<TicketRecord>,
  pub repository_status: BTreeMap<String, RepoStatus>,
  /// Warnings raised while loading the records (dropped rows, etc.).
  pub upstream_warnings: Vec<Warning>,
}

#[derive(Debug, Clone)]
pub struct ReconcileConfig {
  pub window_days: u32,
  pub window_label: Option<String>,
  pub window_start: Option<String>,
  pub window_end: Option<String>,
  /// Ticket assignee text → GitHub login.
  pub user_mapping: BTreeMap<String, String>,
}

impl ReconcileConfig {
  pub fn new(window_days: u32) -> Self {
    Self { window_days, window_label: None, window_start: None, window_end: None, user_mapping: BTreeMap::new() }
  }
}

pub fn reconcile(input: &ReconcileInput, config: &ReconcileConfig) -> Result<ReconciliationReport, ReconcileError> {
  let window_days = NonZeroU32::new(config.window_days).ok_or(ReconcileError::InvalidWindow(config.window_days))?;
  validate(input)?;

  // Phase 1: identities
  let identities = github_identities(&input.activity);
  let assignees: BTreeSet<String> = input.tickets.iter().map(|t| t.assignee.clone()).collect();
  let identity_map = match_identities(&identities, &assignees, &config.user_mapping);
  info!(
    logins = identities.len(),
    assignees = assignees.len(),
    matched = identity_map.matched_keys().len(),
    unresolved = identity_map.tickets_only().len(),
    "identity matching complete"
  );

  // Phase 2: fold
  let agg = aggregate(&input.activity, &input.tickets, &identity_map, &input.repository_status);
  info!(
    people = agg.people.len(),
    repositories = agg.repositories.len(),
    tickets = agg.tickets.len(),
    "aggregation complete"
  );

  // Phase 3: derive + tables
  let window = WindowInfo {
    label: config.window_label.clone(),
    start: config.window_start.clone(),
    end: config.window_end.clone(),
    window_days: window_days.get(),
  };
  let report = build_report(agg, &identity_map, window, window_days, input.upstream_warnings.clone());

  for w in &report.warnings {
    warn!(kind = ?w.kind, "{}", w.message);
  }
  info!(warnings = report.warnings.len(), "report built");

  Ok(report)
}

fn validate(input: &ReconcileInput) -> Result<(), ReconcileError> {
  if input.activity.is_empty() && input.tickets.is_empty() {
    return Err(ReconcileError::NoRecords);
  }

  let n = input.activity.len();
  if n > 0 {
    if input.activity.iter().all(|a| a.author_login.trim().is_empty()) {
      return Err(ReconcileError::MissingField { input: "activity", field: "author_login", records: n });
    }
    if input.activity.iter().all(|a| a.repository.trim().is_empty()) {
      return Err(ReconcileError::MissingField { input: "activity", field: "repository", records: n });
    }
  }

  let n = input.tickets.len();
  if n > 0 && input.tickets.iter().all(|t| t.assignee.trim().is_empty()) {
    return Err(ReconcileError::MissingField { input: "tickets", field: "assignee", records: n });
  }

  Ok(())
}

/// Distinct logins (authors and review targets) with every author display name seen.
fn github_identities(activity: &[ActivityRecord]) -> Vec<GithubIdentity> {
  let mut by_key: BTreeMap<PersonKey, GithubIdentity> = BTreeMap::new();

  for rec in activity {
    let author = rec.author_login.trim();
    if !author.is_empty() {
      let identity = by_key.entry(PersonKey::login(author)).or_insert_with(|| GithubIdentity::new(author));
      if let Some(name) = rec.author_name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        identity.display_names.insert(name.to_string());
      }
    }
    if let Some(target) = rec.review_target_author.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
      by_key.entry(PersonKey::login(target)).or_insert_with(|| GithubIdentity::new(target));
    }
  }

  by_key.into_values().collect()
}
