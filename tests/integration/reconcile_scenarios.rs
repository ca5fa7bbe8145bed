use std::collections::BTreeMap;

use chrono::{TimeZone, Utc};
use team_activity_report::aggregate::{TicketFlag, TicketMatch};
use team_activity_report::model::{ActivityKind, ActivityRecord, PersonKey, Priority, TicketRecord};
use team_activity_report::ranking::RankLabel;
use team_activity_report::render::report_json;
use team_activity_report::report::{PersonRow, ReconciliationReport};
use team_activity_report::{reconcile, ReconcileConfig, ReconcileError, ReconcileInput, WarningKind};

fn activity(login: &str, kind: ActivityKind, day: u32) -> ActivityRecord {
  ActivityRecord {
    author_login: login.into(),
    author_name: None,
    repository: "api".into(),
    kind,
    timestamp: Utc.with_ymd_and_hms(2025, 8, day, 12, 0, 0).unwrap(),
    pr_merged: false,
    pr_lines_changed: 0,
    review_target_author: None,
    source_id: None,
    ..Default::default()
  }
}

fn pr(login: &str, merged: bool, day: u32) -> ActivityRecord {
  ActivityRecord { pr_merged: merged, ..activity(login, ActivityKind::PullRequest, day) }
}

fn review(login: &str, target: &str, day: u32) -> ActivityRecord {
  ActivityRecord { review_target_author: Some(target.into()), ..activity(login, ActivityKind::Review, day) }
}

fn ticket(row: usize, assignee: &str, reported: Option<&str>, closed: Option<&str>) -> TicketRecord {
  TicketRecord {
    row,
    title: format!("ticket {}", row),
    priority: Priority::Medium,
    priority_label: "Medium".into(),
    assignee: assignee.into(),
    reported_at: reported.map(String::from),
    closed_at: closed.map(String::from),
    ..Default::default()
  }
}

fn person<'a>(report: &'a ReconciliationReport, key: &PersonKey) -> &'a PersonRow {
  report.people.iter().find(|p| &p.person == key).unwrap_or_else(|| panic!("no row for {}", key))
}

fn scenario_input() -> ReconcileInput {
  ReconcileInput {
    activity: vec![
      activity("alice", ActivityKind::Commit, 1),
      activity("alice", ActivityKind::Commit, 2),
      activity("alice", ActivityKind::Commit, 3),
      pr("alice", true, 4),
      pr("alice", false, 5),
      activity("bob", ActivityKind::Commit, 6),
    ],
    tickets: vec![
      ticket(2, "Alice", Some("8/1/2025 09:00:00"), Some("8/3/2025 09:00:00")),
      ticket(3, "Alice", Some("8/4/2025 09:00:00"), None),
      ticket(4, "carol", Some("8/5/2025 09:00:00"), None),
    ],
    ..Default::default()
  }
}

#[test]
fn alice_bob_carol_scenario() {
  test_support::init_tracing();
  let report = reconcile(&scenario_input(), &ReconcileConfig::new(30)).unwrap();

  let alice = person(&report, &PersonKey::login("alice"));
  assert_eq!(alice.metrics.commits, 3);
  assert_eq!(alice.metrics.pull_requests, 2);
  assert_eq!(alice.metrics.merged_prs, 1);
  assert_eq!(alice.metrics.tickets_assigned, 2);
  assert_eq!(alice.derived.pr_merge_rate, 0.5);
  assert_eq!(alice.derived.avg_resolution_time_hours, Some(48.0));
  assert_eq!(alice.derived.activity_score, 9.0);

  let bob = person(&report, &PersonKey::login("bob"));
  assert_eq!(bob.metrics.commits, 1);
  assert_eq!(bob.metrics.tickets_assigned, 0);
  assert_eq!(bob.derived.activity_score, 1.0);

  let unmatched = person(&report, &PersonKey::Unmatched);
  assert_eq!(unmatched.metrics.tickets_assigned, 1);
  assert_eq!(report.people.last().map(|p| &p.person), Some(&PersonKey::Unmatched));

  let q = &report.match_quality;
  assert_eq!((q.matched, q.github_only, q.tickets_only), (1, 1, 1));
  assert_eq!(q.github_only_logins, vec![PersonKey::login("bob")]);
  assert_eq!(q.tickets_only_assignees, vec!["carol".to_string()]);

  let carol_row = report.tickets.iter().find(|t| t.ticket.assignee == "carol").unwrap();
  assert_eq!(carol_row.resolved_person, PersonKey::Unmatched);
  assert_eq!(carol_row.matched_by, TicketMatch::NoCandidate);

  assert_eq!(report.summary.top_contributors[0].person, PersonKey::login("alice"));
  assert!(report.warnings.is_empty(), "unexpected warnings: {:?}", report.warnings);
}

#[test]
fn malformed_closed_at_keeps_the_ticket() {
  let input = ReconcileInput {
    activity: vec![activity("alice", ActivityKind::Commit, 1)],
    tickets: vec![
      ticket(2, "alice", Some("8/1/2025 09:00:00"), Some("sometime tuesday")),
      ticket(3, "alice", Some("8/1/2025 09:00:00"), Some("8/2/2025 09:00:00")),
    ],
    ..Default::default()
  };
  let report = reconcile(&input, &ReconcileConfig::new(30)).unwrap();

  assert_eq!(report.tickets.len(), 2);
  let bad = &report.tickets[0];
  assert_eq!(bad.resolution_hours, None);
  assert!(bad.flags.contains(&TicketFlag::MalformedClosedAt));

  let alice = person(&report, &PersonKey::login("alice"));
  assert_eq!(alice.metrics.tickets_assigned, 2);
  assert_eq!(alice.derived.avg_resolution_time_hours, Some(24.0));

  let malformed: Vec<_> = report.warnings.iter().filter(|w| w.kind == WarningKind::MalformedDate).collect();
  assert_eq!(malformed.len(), 1);
  assert_eq!(report.warnings.len(), 1);
}

#[test]
fn zero_denominators_use_documented_defaults() {
  let input = ReconcileInput {
    activity: vec![review("dana", "erin", 1), review("dana", "erin", 2), review("dana", "erin", 3)],
    ..Default::default()
  };
  let report = reconcile(&input, &ReconcileConfig::new(7)).unwrap();

  let dana = person(&report, &PersonKey::login("dana"));
  assert_eq!(dana.metrics.reviews_received, 0);
  assert_eq!(dana.derived.review_participation_ratio, 3.0);
  assert_eq!(dana.derived.closure_rate, 0.0);
  assert_eq!(dana.derived.tickets_with_github_link_ratio, 0.0);
  assert_eq!(dana.derived.pr_merge_rate, 0.0);
  assert_eq!(dana.derived.avg_resolution_time_hours, None);

  let erin = person(&report, &PersonKey::login("erin"));
  assert_eq!(erin.metrics.reviews_received, 3);
  assert_eq!(erin.derived.review_participation_ratio, 0.0);
}

#[test]
fn equally_plausible_fuzzy_candidates_stay_unmatched() {
  let input = ReconcileInput {
    activity: vec![activity("jsmith-dev", ActivityKind::Commit, 1), activity("jsmith-ops", ActivityKind::Commit, 2)],
    tickets: vec![ticket(2, "jsmith", None, None)],
    ..Default::default()
  };
  let report = reconcile(&input, &ReconcileConfig::new(30)).unwrap();

  assert_eq!(report.tickets[0].resolved_person, PersonKey::Unmatched);
  assert_eq!(report.tickets[0].matched_by, TicketMatch::Ambiguous);
  assert_eq!(report.match_quality.ambiguous, 1);
  assert_eq!(report.match_quality.ambiguous_assignees[0].candidates, vec!["jsmith-dev", "jsmith-ops"]);
  assert!(report.warnings.iter().any(|w| w.kind == WarningKind::AmbiguousIdentity));
}

#[test]
fn manual_mapping_beats_fuzzy_matching() {
  let mut input = scenario_input();
  input.tickets.push(ticket(5, "Robert J.", None, None));
  let mut config = ReconcileConfig::new(30);
  config.user_mapping = BTreeMap::from([("robert j.".to_string(), "bob".to_string())]);

  let report = reconcile(&input, &config).unwrap();
  let row = report.tickets.iter().find(|t| t.ticket.row == 5).unwrap();
  assert_eq!(row.resolved_person, PersonKey::login("bob"));
  assert_eq!(row.matched_by, TicketMatch::Manual);
  assert_eq!(report.match_quality.github_only, 0);
}

#[test]
fn review_turnaround_line_split_and_closed_issues_reach_the_report() {
  let opened = Utc.with_ymd_and_hms(2025, 8, 4, 8, 0, 0).unwrap();
  let mut input = scenario_input();
  input.activity[3].lines_added = 30;
  input.activity[3].lines_deleted = 10;
  input.activity.push(ActivityRecord { pr_created_at: Some(opened), ..review("bob", "alice", 4) });
  input.activity.push(activity("bob", ActivityKind::IssueClosed, 7));

  let report = reconcile(&input, &ReconcileConfig::new(30)).unwrap();
  let bob = person(&report, &PersonKey::login("bob"));
  assert_eq!(bob.derived.avg_review_time_hours, Some(4.0));
  assert_eq!(bob.metrics.issues_closed, 1);
  // closed issues do not feed the activity score
  assert_eq!(bob.derived.activity_score, 2.5);

  let alice = person(&report, &PersonKey::login("alice"));
  assert_eq!((alice.metrics.lines_added, alice.metrics.lines_deleted), (30, 10));
  assert_eq!(alice.derived.avg_review_time_hours, None);
  assert_eq!(report.summary.totals.issues_closed, 1);
  assert_eq!(report.summary.totals.lines_added, 30);
}

#[test]
fn ranking_orders_matched_people_and_labels_the_leader() {
  let report = reconcile(&scenario_input(), &ReconcileConfig::new(30)).unwrap();
  let rows = &report.ranking.rows;
  assert_eq!(rows.len(), 2);
  assert_eq!(rows[0].person, PersonKey::login("alice"));
  assert_eq!(rows[0].label, RankLabel::TopPerformer);
  assert_eq!(rows[1].rank, 2);
  assert_eq!(rows[1].percentile, 50.0);
  assert!(rows.iter().all(|r| (0.0..=100.0).contains(&r.composite_score)));
  assert_eq!(report.ranking.summary.as_ref().unwrap().top_performer, PersonKey::login("alice"));
}

#[test]
fn fixture_records_are_all_counted_without_a_window() {
  let activity: Vec<ActivityRecord> = test_support::read_fixture_json("activity.json");
  let input = ReconcileInput { activity, ..Default::default() };
  let report = reconcile(&input, &ReconcileConfig::new(60)).unwrap();
  assert_eq!(report.summary.totals.commits, 5);
  assert_eq!(report.summary.totals.pull_requests, 2);
  assert_eq!(report.summary.totals.pr_lines_changed, 50);
}

#[test]
fn identical_inputs_render_identical_bytes() {
  let input = scenario_input();
  let config = ReconcileConfig::new(30);
  let first = report_json(&reconcile(&input, &config).unwrap()).unwrap();
  let second = report_json(&reconcile(&input, &config).unwrap()).unwrap();
  assert_eq!(first, second);
}

#[test]
fn structural_errors_name_the_input_and_field() {
  let empty = ReconcileInput::default();
  assert_eq!(reconcile(&empty, &ReconcileConfig::new(30)).unwrap_err(), ReconcileError::NoRecords);

  let no_authors = ReconcileInput { activity: vec![activity(" ", ActivityKind::Commit, 1)], ..Default::default() };
  let err = reconcile(&no_authors, &ReconcileConfig::new(30)).unwrap_err();
  assert!(err.to_string().contains("author_login"));

  assert_eq!(
    reconcile(&scenario_input(), &ReconcileConfig::new(0)).unwrap_err(),
    ReconcileError::InvalidWindow(0)
  );
}
