// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Rank team members by a normalized composite of commit frequency, merge rate and review participation
// role: core/ranking
// inputs: (PersonKey, DerivedMetrics) pairs for every matched person
// outputs: RankingTable (ranked rows with percentile and label, plus a summary)
// side_effects: none
// invariants:
// - UNMATCHED is never ranked
// - Every component and the composite lie in [0, 100]
// - Order: composite desc, ties by ascending PersonKey; ranks are 1..=n without gaps
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use serde::Serialize;

use crate::derived::DerivedMetrics;
use crate::model::PersonKey;

/// Component value when every person has the same raw value.
pub const FLAT_COMPONENT: f64 = 50.0;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RankLabel {
  TopPerformer,
  HighPerformer,
  AboveAverage,
  Developing,
}

impl RankLabel {
  fn for_rank(rank: usize, total: usize) -> Self {
    let position = rank as f64 / total as f64;
    if rank == 1 {
      RankLabel::TopPerformer
    } else if position <= 0.10 {
      RankLabel::HighPerformer
    } else if position <= 0.50 {
      RankLabel::AboveAverage
    } else {
      RankLabel::Developing
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankRow {
  pub rank: usize,
  pub person: PersonKey,
  pub composite_score: f64,
  pub commit_frequency_component: f64,
  pub pr_merge_component: f64,
  pub review_participation_component: f64,
  pub percentile: f64,
  pub label: RankLabel,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreDistribution {
  pub top_10_percent: usize,
  pub top_50_percent: usize,
  pub bottom_50_percent: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankSummary {
  pub ranked_people: usize,
  pub avg_composite_score: f64,
  pub min_composite_score: f64,
  pub max_composite_score: f64,
  pub top_performer: PersonKey,
  pub top_performer_score: f64,
  pub distribution: ScoreDistribution,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RankingTable {
  /// Absent when nobody could be ranked.
  pub summary: Option<RankSummary>,
  pub rows: Vec<RankRow>,
}

/// Min-max scale into [0, 100]; a flat population gets [`FLAT_COMPONENT`].
pub fn normalize_to_100(value: f64, min: f64, max: f64) -> f64 {
  if max == min {
    FLAT_COMPONENT
  } else {
    (value - min) / (max - min) * 100.0
  }
}

fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
  values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)))
}

/// Composite = mean of the non-zero components; zero when all are zero.
fn composite(components: &[f64]) -> f64 {
  let present: Vec<f64> = components.iter().copied().filter(|c| *c > 0.0).collect();
  if present.is_empty() {
    0.0
  } else {
    present.iter().sum::<f64>() / present.len() as f64
  }
}

pub fn rank_people<'a>(people: impl IntoIterator<Item = (&'a PersonKey, &'a DerivedMetrics)>) -> RankingTable {
  let people: Vec<(&PersonKey, &DerivedMetrics)> = people.into_iter().filter(|(k, _)| !k.is_unmatched()).collect();
  if people.is_empty() {
    return RankingTable::default();
  }

  let (freq_lo, freq_hi) = bounds(people.iter().map(|(_, d)| d.commit_frequency));
  let (review_lo, review_hi) = bounds(people.iter().map(|(_, d)| d.review_participation_ratio));

  let mut scored: Vec<(PersonKey, [f64; 3])> = people
    .iter()
    .map(|(key, d)| {
      let components = [
        normalize_to_100(d.commit_frequency, freq_lo, freq_hi),
        d.pr_merge_rate * 100.0,
        normalize_to_100(d.review_participation_ratio, review_lo, review_hi),
      ];
      ((*key).clone(), components)
    })
    .collect();
  scored.sort_by(|(ka, ca), (kb, cb)| composite(cb).total_cmp(&composite(ca)).then_with(|| ka.cmp(kb)));

  let total = scored.len();
  let rows: Vec<RankRow> = scored
    .into_iter()
    .enumerate()
    .map(|(i, (person, c))| {
      let rank = i + 1;
      RankRow {
        rank,
        composite_score: composite(&c),
        commit_frequency_component: c[0],
        pr_merge_component: c[1],
        review_participation_component: c[2],
        percentile: (1.0 - i as f64 / total as f64) * 100.0,
        label: RankLabel::for_rank(rank, total),
        person,
      }
    })
    .collect();

  RankingTable { summary: rank_summary(&rows), rows }
}

pub fn rank_summary(rows: &[RankRow]) -> Option<RankSummary> {
  let top = rows.first()?;
  let scores = rows.iter().map(|r| r.composite_score);
  let (min, max) = bounds(scores.clone());

  Some(RankSummary {
    ranked_people: rows.len(),
    avg_composite_score: scores.sum::<f64>() / rows.len() as f64,
    min_composite_score: min,
    max_composite_score: max,
    top_performer: top.person.clone(),
    top_performer_score: top.composite_score,
    distribution: ScoreDistribution {
      top_10_percent: rows.iter().filter(|r| r.percentile >= 90.0).count(),
      top_50_percent: rows.iter().filter(|r| r.percentile >= 50.0).count(),
      bottom_50_percent: rows.iter().filter(|r| r.percentile < 50.0).count(),
    },
  })
}
