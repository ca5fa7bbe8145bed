use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use team_activity_report::model::{ActivityKind, ActivityRecord, Priority, TicketRecord};
use team_activity_report::{reconcile, ReconcileConfig, ReconcileInput};

const LOGINS: &[&str] = &["alice", "bob", "carol", "dave", ""];
const ASSIGNEES: &[&str] = &["Alice", "BOB", "Carol Jones", "zed", ""];

fn arb_activity() -> impl Strategy<Value = ActivityRecord> {
  (0..LOGINS.len(), 0..3u8, 0..LOGINS.len(), any::<bool>(), 0..500i64, 1..29u32).prop_map(
    |(author, kind, target, merged, lines, day)| {
      let kind = match kind {
        0 => ActivityKind::Commit,
        1 => ActivityKind::PullRequest,
        _ => ActivityKind::Review,
      };
      ActivityRecord {
        author_login: LOGINS[author].into(),
        author_name: None,
        repository: if day % 2 == 0 { "api".into() } else { "web".into() },
        kind,
        timestamp: Utc.with_ymd_and_hms(2025, 8, day, 9, 0, 0).unwrap(),
        pr_merged: kind == ActivityKind::PullRequest && merged,
        pr_lines_changed: if kind == ActivityKind::PullRequest { lines } else { 0 },
        review_target_author: (kind == ActivityKind::Review).then(|| LOGINS[target].to_string()),
        source_id: None,
        ..Default::default()
      }
    },
  )
}

fn arb_ticket() -> impl Strategy<Value = TicketRecord> {
  (0..ASSIGNEES.len(), 1..28u32, 0..72u32, any::<bool>()).prop_map(|(assignee, day, hours, closed)| {
    let reported = format!("8/{}/2025 08:00:00", day);
    let closed_at = closed.then(|| format!("8/{}/2025 {:02}:00:00", day + hours / 24, 8 + hours % 12));
    TicketRecord {
      row: 2,
      title: "t".into(),
      priority: Priority::Low,
      assignee: ASSIGNEES[assignee].into(),
      reported_at: Some(reported),
      closed_at,
      ..Default::default()
    }
  })
}

fn arb_input() -> impl Strategy<Value = ReconcileInput> {
  (prop::collection::vec(arb_activity(), 1..40), prop::collection::vec(arb_ticket(), 0..12)).prop_map(
    |(mut activity, tickets)| {
      // keep every collection structurally valid
      activity[0].author_login = "alice".into();
      activity[0].repository = "api".into();
      let mut tickets = tickets;
      if let Some(first) = tickets.first_mut() {
        first.assignee = "Alice".into();
      }
      ReconcileInput { activity, tickets, ..Default::default() }
    },
  )
}

proptest! {
  #[test]
  fn commits_and_reviews_are_conserved(input in arb_input()) {
    let report = reconcile(&input, &ReconcileConfig::new(31)).unwrap();

    let commits_in = input.activity.iter().filter(|a| a.kind == ActivityKind::Commit).count() as u64;
    let reviews_in = input.activity.iter().filter(|a| a.kind == ActivityKind::Review).count() as u64;
    let commits_out: u64 = report.people.iter().map(|p| p.metrics.commits).sum();
    let received_out: u64 = report.people.iter().map(|p| p.metrics.reviews_received).sum();

    prop_assert_eq!(commits_in, commits_out);
    prop_assert_eq!(reviews_in, received_out);
    prop_assert_eq!(report.summary.totals.commits, commits_in);

    let tickets_out: u64 = report.people.iter().map(|p| p.metrics.tickets_assigned).sum();
    prop_assert_eq!(tickets_out, input.tickets.len() as u64);
  }

  #[test]
  fn derived_metrics_stay_in_bounds(input in arb_input()) {
    let report = reconcile(&input, &ReconcileConfig::new(31)).unwrap();
    for row in &report.people {
      prop_assert!((0.0..=1.0).contains(&row.derived.pr_merge_rate));
      prop_assert!((0.0..=1.0).contains(&row.derived.closure_rate));
      prop_assert!(row.derived.activity_score >= 0.0);
      prop_assert!(row.derived.commit_frequency >= 0.0);
    }
  }

  #[test]
  fn reruns_are_identical(input in arb_input()) {
    let config = ReconcileConfig::new(31);
    prop_assert_eq!(reconcile(&input, &config).unwrap(), reconcile(&input, &config).unwrap());
  }
}
