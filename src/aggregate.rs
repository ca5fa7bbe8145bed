// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Fold activity and ticket records into per-person and per-repository accumulators
// role: core/aggregate
// inputs: ActivityRecord slice, TicketRecord slice, IdentityMap, repository status lookup
// outputs: Aggregation (people, repositories, resolved ticket rows, warnings)
// side_effects: none (no I/O, no clock)
// invariants:
// - Every record lands in exactly one PersonMetrics or the UNMATCHED bucket
// - Sum of commits over people equals the number of commit records; same for reviews given and received
// - Review turnaround samples are only taken when the review is not before the pull request was opened
// - Each malformed non-empty timestamp cell yields exactly one warning
// - Duration samples are only taken from pairs where the later timestamp is not before reported_at
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::dates::{hours_between, parse_ticket_timestamp};
use crate::error::{Warning, WarningKind};
use crate::identity::{AssigneeResolution, IdentityMap, MatchMethod};
use crate::model::{
  ActivityKind, ActivityRecord, PersonKey, PersonMetrics, Priority, RepoStatus, RepositoryMetrics, TicketRecord,
};

/// Label for tickets whose type cell is blank.
pub const UNTYPED_TICKET: &str = "unspecified";

/// How a ticket's assignee was resolved, flattened for the ticket table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketMatch {
  Manual,
  Exact,
  Fuzzy,
  Ambiguous,
  NoCandidate,
  Unassigned,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketFlag {
  MalformedReportedAt,
  MalformedFirstResponseAt,
  MalformedClosedAt,
  ClosedBeforeReported,
  RespondedBeforeReported,
}

/// A ticket row after identity resolution and timestamp parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTicket {
  pub record: TicketRecord,
  pub person: PersonKey,
  pub matched_by: TicketMatch,
  pub match_score: Option<f64>,
  pub reported_at: Option<NaiveDateTime>,
  pub first_response_at: Option<NaiveDateTime>,
  pub closed_at: Option<NaiveDateTime>,
  pub resolution_hours: Option<f64>,
  pub first_response_hours: Option<f64>,
  pub flags: BTreeSet<TicketFlag>,
}

#[derive(Debug, Clone, Default)]
pub struct Aggregation {
  pub people: BTreeMap<PersonKey, PersonMetrics>,
  pub repositories: BTreeMap<String, RepositoryMetrics>,
  pub tickets: Vec<ResolvedTicket>,
  pub warnings: Vec<Warning>,
}

impl Aggregation {
  fn person(&mut self, key: &PersonKey) -> &mut PersonMetrics {
    self.people.entry(key.clone()).or_default()
  }

  fn warn(&mut self, kind: WarningKind, message: String) {
    self.warnings.push(Warning::new(kind, message));
  }
}

/// Fold both record sets. Every login known to `identities` gets a row even
/// without activity, and every repository in `repo_status` gets a row even
/// without commits.
pub fn aggregate(
  activity: &[ActivityRecord],
  tickets: &[TicketRecord],
  identities: &IdentityMap,
  repo_status: &BTreeMap<String, RepoStatus>,
) -> Aggregation {
  let mut agg = Aggregation::default();

  for key in identities.identities.keys() {
    agg.person(key);
  }
  for (name, status) in repo_status {
    agg.repositories.insert(
      name.clone(),
      RepositoryMetrics { name: name.clone(), status: *status, ..Default::default() },
    );
  }

  for (idx, rec) in activity.iter().enumerate() {
    fold_activity(&mut agg, idx, rec, repo_status);
  }
  for ticket in tickets {
    fold_ticket(&mut agg, ticket, identities);
  }

  agg
}

fn fold_activity(agg: &mut Aggregation, idx: usize, rec: &ActivityRecord, repo_status: &BTreeMap<String, RepoStatus>) {
  let author = if rec.author_login.trim().is_empty() {
    agg.warn(
      WarningKind::MissingAuthor,
      format!("activity #{} ({:?} in '{}') has no author login; counted as unmatched", idx, rec.kind, rec.repository),
    );
    PersonKey::Unmatched
  } else {
    PersonKey::login(&rec.author_login)
  };

  let repo_name = rec.repository.trim();
  if repo_name.is_empty() {
    agg.warn(WarningKind::MissingRepository, format!("activity #{} by {} has no repository", idx, author));
  }

  {
    let person = agg.person(&author);
    match rec.kind {
      ActivityKind::Commit => {
        person.commits += 1;
        person.lines_added += rec.lines_added;
        person.lines_deleted += rec.lines_deleted;
      }
      ActivityKind::PullRequest => {
        person.pull_requests += 1;
        if rec.pr_merged {
          person.merged_prs += 1;
        }
        person.pr_lines_changed += rec.pr_lines_changed;
        person.lines_added += rec.lines_added;
        person.lines_deleted += rec.lines_deleted;
      }
      ActivityKind::Review => {
        person.reviews_given += 1;
        if let Some(opened) = rec.pr_created_at {
          let hours = (rec.timestamp - opened).num_seconds() as f64 / 3600.0;
          if hours >= 0.0 {
            person.review_hours.push(hours);
          }
        }
      }
      ActivityKind::IssueClosed => person.issues_closed += 1,
    }
    if !repo_name.is_empty() {
      person.repositories.insert(repo_name.to_string());
    }
    person.touch(rec.timestamp);
  }

  if rec.kind == ActivityKind::Review {
    let target = match rec.review_target_author.as_deref().map(str::trim) {
      Some(t) if !t.is_empty() => PersonKey::login(t),
      _ => {
        agg.warn(
          WarningKind::MissingReviewTarget,
          format!("review #{} by {} has no pull request author; received side counted as unmatched", idx, author),
        );
        PersonKey::Unmatched
      }
    };
    agg.person(&target).reviews_received += 1;
  }

  if repo_name.is_empty() {
    return;
  }

  let repo = agg.repositories.entry(repo_name.to_string()).or_insert_with(|| RepositoryMetrics {
    name: repo_name.to_string(),
    status: repo_status.get(repo_name).copied().unwrap_or_default(),
    ..Default::default()
  });
  match rec.kind {
    ActivityKind::Commit => repo.commits += 1,
    ActivityKind::PullRequest => repo.pull_requests += 1,
    ActivityKind::Review => repo.reviews += 1,
    ActivityKind::IssueClosed => repo.issues_closed += 1,
  }
  if let PersonKey::Login(login) = &author {
    repo.contributors.insert(login.clone());
  }
  if repo.last_activity.map_or(true, |prev| rec.timestamp > prev) {
    repo.last_activity = Some(rec.timestamp);
  }
}

fn fold_ticket(agg: &mut Aggregation, ticket: &TicketRecord, identities: &IdentityMap) {
  let (person, matched_by, match_score) = resolve_assignee(ticket, identities);
  if matched_by == TicketMatch::Unassigned {
    agg.warn(
      WarningKind::EmptyAssignee,
      format!("row {}: ticket '{}' has no assignee; counted as unmatched", ticket.row, ticket.title),
    );
  }

  let mut flags = BTreeSet::new();
  let reported_at = parse_cell(agg, ticket, "reported_at", ticket.reported_at.as_deref(), TicketFlag::MalformedReportedAt, &mut flags);
  let first_response_at = parse_cell(
    agg,
    ticket,
    "first_response_at",
    ticket.first_response_at.as_deref(),
    TicketFlag::MalformedFirstResponseAt,
    &mut flags,
  );
  let closed_at = parse_cell(agg, ticket, "closed_at", ticket.closed_at.as_deref(), TicketFlag::MalformedClosedAt, &mut flags);

  let resolution = ordered_hours(reported_at, closed_at);
  let first_response = ordered_hours(reported_at, first_response_at);
  let mut out_of_order = Vec::new();
  if resolution == Some(None) {
    flags.insert(TicketFlag::ClosedBeforeReported);
    out_of_order.push("closed_at");
  }
  if first_response == Some(None) {
    flags.insert(TicketFlag::RespondedBeforeReported);
    out_of_order.push("first_response_at");
  }
  if !out_of_order.is_empty() {
    agg.warn(
      WarningKind::DurationOrder,
      format!(
        "row {}: {} earlier than reported_at; excluded from averages",
        ticket.row,
        out_of_order.join(" and ")
      ),
    );
  }
  let resolution_hours = resolution.flatten();
  let first_response_hours = first_response.flatten();

  let metrics = agg.person(&person);
  metrics.tickets_assigned += 1;
  if ticket.is_closed() {
    metrics.tickets_closed += 1;
  } else {
    metrics.tickets_open += 1;
  }
  match ticket.priority {
    Priority::High => metrics.tickets_high_priority += 1,
    Priority::Medium => metrics.tickets_medium_priority += 1,
    Priority::Low => metrics.tickets_low_priority += 1,
    Priority::Other => metrics.tickets_other_priority += 1,
  }
  let ticket_type = match ticket.ticket_type.trim() {
    "" => UNTYPED_TICKET.to_string(),
    t => t.to_string(),
  };
  *metrics.ticket_types.entry(ticket_type).or_default() += 1;
  if ticket.has_github_issue() {
    metrics.tickets_with_github_issue += 1;
  }
  metrics.resolution_hours.extend(resolution_hours);
  metrics.first_response_hours.extend(first_response_hours);
  if !out_of_order.is_empty() {
    metrics.duration_anomalies += 1;
  }

  agg.tickets.push(ResolvedTicket {
    record: ticket.clone(),
    person,
    matched_by,
    match_score,
    reported_at,
    first_response_at,
    closed_at,
    resolution_hours,
    first_response_hours,
    flags,
  });
}

fn resolve_assignee(ticket: &TicketRecord, identities: &IdentityMap) -> (PersonKey, TicketMatch, Option<f64>) {
  if ticket.assignee.trim().is_empty() {
    return (PersonKey::Unmatched, TicketMatch::Unassigned, None);
  }

  match identities.resolution(&ticket.assignee) {
    Some(AssigneeResolution::Matched { key, method }) => match method {
      MatchMethod::Manual => (key.clone(), TicketMatch::Manual, None),
      MatchMethod::Exact => (key.clone(), TicketMatch::Exact, None),
      MatchMethod::Fuzzy { score } => (key.clone(), TicketMatch::Fuzzy, Some(*score)),
    },
    Some(AssigneeResolution::Ambiguous { .. }) => (PersonKey::Unmatched, TicketMatch::Ambiguous, None),
    Some(AssigneeResolution::Empty) => (PersonKey::Unmatched, TicketMatch::Unassigned, None),
    Some(AssigneeResolution::NoCandidate) | None => (PersonKey::Unmatched, TicketMatch::NoCandidate, None),
  }
}

fn parse_cell(
  agg: &mut Aggregation,
  ticket: &TicketRecord,
  column: &str,
  raw: Option<&str>,
  flag: TicketFlag,
  flags: &mut BTreeSet<TicketFlag>,
) -> Option<NaiveDateTime> {
  let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
  let parsed = parse_ticket_timestamp(raw);
  if parsed.is_none() {
    flags.insert(flag);
    agg.warn(
      WarningKind::MalformedDate,
      format!("row {}: {} '{}' is not a recognised date; treated as missing", ticket.row, column, raw),
    );
  }
  parsed
}

/// `None` when either side is missing, `Some(None)` when `later` precedes
/// `reported`, otherwise the non-negative hour delta.
fn ordered_hours(reported: Option<NaiveDateTime>, later: Option<NaiveDateTime>) -> Option<Option<f64>> {
  let (start, end) = (reported?, later?);
  let hours = hours_between(start, end);
  Some((hours >= 0.0).then_some(hours))
}
