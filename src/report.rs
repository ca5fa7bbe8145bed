// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Assemble the multi-table reconciliation report from aggregated and derived metrics
// role: core/report
// inputs: Aggregation (consumed), IdentityMap, window bounds, window_days
// outputs: ReconciliationReport (summary, people, repositories, tickets, ranking, match quality, warnings)
// side_effects: none
// invariants:
// - Rows are ordered by PersonKey / repository name / spreadsheet order; UNMATCHED is the last person row
// - Top contributors: activity_score desc, ties by ascending PersonKey, UNMATCHED never ranked
// - Totals include the UNMATCHED bucket
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::BTreeSet;
use std::num::NonZeroU32;

use serde::Serialize;

use crate::aggregate::{Aggregation, ResolvedTicket, TicketFlag, TicketMatch};
use crate::derived::{DerivedMetrics, PersonSummary};
use crate::error::Warning;
use crate::identity::{AssigneeResolution, IdentityMap, MatchMethod};
use crate::model::{DataSources, PersonKey, PersonMetrics, RepoStatus, RepositoryMetrics, TicketRecord};
use crate::ranking::{rank_people, RankingTable};

pub const TOP_CONTRIBUTORS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowInfo {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub label: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub start: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub end: Option<String>,
  pub window_days: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TeamTotals {
  pub people: usize,
  pub commits: u64,
  pub pull_requests: u64,
  pub merged_prs: u64,
  pub pr_lines_changed: i64,
  pub lines_added: i64,
  pub lines_deleted: i64,
  pub reviews: u64,
  pub issues_closed: u64,
  pub tickets: u64,
  pub tickets_open: u64,
  pub tickets_closed: u64,
  pub unmatched_tickets: u64,
  pub repositories: usize,
  pub active_repositories: usize,
  pub archived_repositories: usize,
  pub warnings: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopContributor {
  pub rank: usize,
  pub person: PersonKey,
  pub activity_score: f64,
  pub commits: u64,
  pub pull_requests: u64,
  pub reviews_given: u64,
  pub tickets_assigned: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryTable {
  pub window: WindowInfo,
  pub totals: TeamTotals,
  pub top_contributors: Vec<TopContributor>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonRow {
  pub person: PersonKey,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub display_name: Option<String>,
  pub data_sources: DataSources,
  /// Ticket assignee spellings resolved to this person.
  pub assignee_aliases: Vec<String>,
  #[serde(flatten)]
  pub metrics: PersonMetrics,
  #[serde(flatten)]
  pub derived: DerivedMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepositoryRow {
  #[serde(flatten)]
  pub metrics: RepositoryMetrics,
  pub contributor_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TicketRow {
  #[serde(flatten)]
  pub ticket: TicketRecord,
  pub status: &'static str,
  pub resolved_person: PersonKey,
  pub matched_by: TicketMatch,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub match_score: Option<f64>,
  pub resolution_hours: Option<f64>,
  pub first_response_hours: Option<f64>,
  pub flags: BTreeSet<TicketFlag>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssigneeMatch {
  pub assignee: String,
  pub person: PersonKey,
  #[serde(flatten)]
  pub method: MatchMethod,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AmbiguousAssignee {
  pub assignee: String,
  pub candidates: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchQuality {
  /// Logins with at least one ticket assignee resolved to them.
  pub matched: usize,
  /// Logins with GitHub activity but no tickets.
  pub github_only: usize,
  /// Distinct assignees that resolved to nobody (including ambiguous ones).
  pub tickets_only: usize,
  pub ambiguous: usize,
  pub unassigned_tickets: usize,
  pub matches: Vec<AssigneeMatch>,
  pub github_only_logins: Vec<PersonKey>,
  pub tickets_only_assignees: Vec<String>,
  pub ambiguous_assignees: Vec<AmbiguousAssignee>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciliationReport {
  pub summary: SummaryTable,
  pub people: Vec<PersonRow>,
  pub repositories: Vec<RepositoryRow>,
  pub tickets: Vec<TicketRow>,
  pub ranking: RankingTable,
  pub match_quality: MatchQuality,
  pub warnings: Vec<Warning>,
}

/// Build every table. `warnings` are prepended to the matcher and aggregation
/// warnings in that order.
pub fn build_report(
  agg: Aggregation,
  identities: &IdentityMap,
  window: WindowInfo,
  window_days: NonZeroU32,
  mut warnings: Vec<Warning>,
) -> ReconciliationReport {
  let Aggregation { people, repositories, tickets, warnings: agg_warnings } = agg;
  warnings.extend(identities.warnings.iter().cloned());
  warnings.extend(agg_warnings);

  let match_quality = match_quality(identities, &people, &tickets);

  // Phase 1: finalize per-person metrics
  let people: Vec<PersonRow> = people
    .into_iter()
    .map(|(person, metrics)| {
      let data_sources = if person.is_unmatched() {
        DataSources::Unmatched
      } else if metrics.tickets_assigned > 0 {
        DataSources::GithubAndTickets
      } else {
        DataSources::GithubOnly
      };
      let summary = PersonSummary::finalize(metrics, window_days);
      PersonRow {
        display_name: identities.display_name(&person),
        assignee_aliases: identities.assignees_for(&person),
        person,
        data_sources,
        metrics: summary.metrics,
        derived: summary.derived,
      }
    })
    .collect();

  // Phase 2: repositories and tickets
  let repositories: Vec<RepositoryRow> = repositories
    .into_values()
    .map(|metrics| RepositoryRow { contributor_count: metrics.contributors.len(), metrics })
    .collect();
  let tickets: Vec<TicketRow> = tickets.into_iter().map(ticket_row).collect();

  // Phase 3: summary and ranking
  let totals = team_totals(&people, &repositories, warnings.len());
  let top_contributors = top_contributors(&people);
  let ranking = rank_people(people.iter().map(|r| (&r.person, &r.derived)));

  ReconciliationReport {
    summary: SummaryTable { window, totals, top_contributors },
    people,
    repositories,
    tickets,
    ranking,
    match_quality,
    warnings,
  }
}

fn ticket_row(t: ResolvedTicket) -> TicketRow {
  TicketRow {
    status: if t.record.is_closed() { "closed" } else { "open" },
    ticket: t.record,
    resolved_person: t.person,
    matched_by: t.matched_by,
    match_score: t.match_score,
    resolution_hours: t.resolution_hours,
    first_response_hours: t.first_response_hours,
    flags: t.flags,
  }
}

fn team_totals(people: &[PersonRow], repositories: &[RepositoryRow], warnings: usize) -> TeamTotals {
  let mut totals = TeamTotals {
    repositories: repositories.len(),
    active_repositories: repositories.iter().filter(|r| r.metrics.status == RepoStatus::Active).count(),
    archived_repositories: repositories.iter().filter(|r| r.metrics.status == RepoStatus::Archived).count(),
    warnings,
    ..Default::default()
  };

  for row in people {
    let m = &row.metrics;
    if row.person.is_unmatched() {
      totals.unmatched_tickets = m.tickets_assigned;
    } else {
      totals.people += 1;
    }
    totals.commits += m.commits;
    totals.pull_requests += m.pull_requests;
    totals.merged_prs += m.merged_prs;
    totals.pr_lines_changed += m.pr_lines_changed;
    totals.lines_added += m.lines_added;
    totals.lines_deleted += m.lines_deleted;
    totals.reviews += m.reviews_given;
    totals.issues_closed += m.issues_closed;
    totals.tickets += m.tickets_assigned;
    totals.tickets_open += m.tickets_open;
    totals.tickets_closed += m.tickets_closed;
  }

  totals
}

fn top_contributors(people: &[PersonRow]) -> Vec<TopContributor> {
  let mut ranked: Vec<&PersonRow> = people.iter().filter(|r| !r.person.is_unmatched()).collect();
  ranked.sort_by(|a, b| {
    b.derived
      .activity_score
      .total_cmp(&a.derived.activity_score)
      .then_with(|| a.person.cmp(&b.person))
  });

  ranked
    .into_iter()
    .take(TOP_CONTRIBUTORS)
    .enumerate()
    .map(|(i, r)| TopContributor {
      rank: i + 1,
      person: r.person.clone(),
      activity_score: r.derived.activity_score,
      commits: r.metrics.commits,
      pull_requests: r.metrics.pull_requests,
      reviews_given: r.metrics.reviews_given,
      tickets_assigned: r.metrics.tickets_assigned,
    })
    .collect()
}

fn match_quality(
  identities: &IdentityMap,
  people: &std::collections::BTreeMap<PersonKey, PersonMetrics>,
  tickets: &[ResolvedTicket],
) -> MatchQuality {
  let mut q = MatchQuality::default();

  for (assignee, resolution) in &identities.assignees {
    match resolution {
      AssigneeResolution::Matched { key, method } => q.matches.push(AssigneeMatch {
        assignee: assignee.clone(),
        person: key.clone(),
        method: method.clone(),
      }),
      AssigneeResolution::Ambiguous { candidates } => q.ambiguous_assignees.push(AmbiguousAssignee {
        assignee: assignee.clone(),
        candidates: candidates.clone(),
      }),
      AssigneeResolution::NoCandidate | AssigneeResolution::Empty => {}
    }
  }

  let matched = identities.matched_keys();
  q.github_only_logins = people.keys().filter(|k| !k.is_unmatched() && !matched.contains(*k)).cloned().collect();
  q.tickets_only_assignees = identities.tickets_only();
  q.unassigned_tickets = tickets.iter().filter(|t| t.matched_by == TicketMatch::Unassigned).count();

  q.matched = matched.len();
  q.github_only = q.github_only_logins.len();
  q.tickets_only = q.tickets_only_assignees.len();
  q.ambiguous = q.ambiguous_assignees.len();
  q
}
