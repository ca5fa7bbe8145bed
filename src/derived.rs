// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Compute ratios and composite scores from finalized per-person metrics
// role: core/derived
// inputs: PersonMetrics (consumed), window_days (non-zero)
// outputs: PersonSummary = PersonMetrics + DerivedMetrics
// invariants:
// - All division goes through safe_ratio; no NaN or infinity reaches the report
// - pr_merge_rate and closure_rate stay within [0, 1]; activity_score is never negative
// - No rounding; renderers decide presentation
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::num::NonZeroU32;

use serde::Serialize;

use crate::model::PersonMetrics;

/// What a ratio evaluates to when its denominator is zero.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ZeroDenominator {
  /// The ratio is 0. Used for rates over an empty population (no PRs, no tickets).
  Zero,
  /// The ratio is the numerator itself. Used for review participation: someone
  /// who gave reviews but received none scores their raw review count
  /// (3 given / 0 received = 3).
  Numerator,
}

pub fn safe_ratio(num: f64, den: f64, policy: ZeroDenominator) -> f64 {
  if den == 0.0 {
    match policy {
      ZeroDenominator::Zero => 0.0,
      ZeroDenominator::Numerator => num,
    }
  } else {
    num / den
  }
}

fn mean(samples: &[f64]) -> Option<f64> {
  if samples.is_empty() {
    None
  } else {
    Some(samples.iter().sum::<f64>() / samples.len() as f64)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedMetrics {
  pub activity_score: f64,
  pub review_participation_ratio: f64,
  pub pr_merge_rate: f64,
  pub commit_frequency: f64,
  pub avg_resolution_time_hours: Option<f64>,
  pub avg_first_response_time_hours: Option<f64>,
  /// Mean hours from a pull request being opened to this person's review of it.
  pub avg_review_time_hours: Option<f64>,
  pub tickets_with_github_link_ratio: f64,
  pub closure_rate: f64,
  pub commits_per_ticket: f64,
  pub avg_pr_size: f64,
}

pub fn derive_metrics(m: &PersonMetrics, window_days: NonZeroU32) -> DerivedMetrics {
  let commits = m.commits as f64;
  let prs = m.pull_requests as f64;
  let tickets = m.tickets_assigned as f64;
  let reviews_given = m.reviews_given as f64;

  DerivedMetrics {
    activity_score: commits + 2.0 * prs + 1.5 * reviews_given + tickets,
    review_participation_ratio: safe_ratio(reviews_given, m.reviews_received as f64, ZeroDenominator::Numerator),
    pr_merge_rate: safe_ratio(m.merged_prs as f64, prs, ZeroDenominator::Zero),
    commit_frequency: commits / f64::from(window_days.get()),
    avg_resolution_time_hours: mean(&m.resolution_hours),
    avg_first_response_time_hours: mean(&m.first_response_hours),
    avg_review_time_hours: mean(&m.review_hours),
    tickets_with_github_link_ratio: safe_ratio(m.tickets_with_github_issue as f64, tickets, ZeroDenominator::Zero),
    closure_rate: safe_ratio(m.tickets_closed as f64, tickets, ZeroDenominator::Zero),
    commits_per_ticket: safe_ratio(commits, tickets, ZeroDenominator::Zero),
    avg_pr_size: safe_ratio(m.pr_lines_changed as f64, prs, ZeroDenominator::Zero),
  }
}

/// Finalized metrics for one person. Built by consuming the accumulator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonSummary {
  pub metrics: PersonMetrics,
  pub derived: DerivedMetrics,
}

impl PersonSummary {
  pub fn finalize(metrics: PersonMetrics, window_days: NonZeroU32) -> Self {
    let derived = derive_metrics(&metrics, window_days);
    Self { metrics, derived }
  }
}
