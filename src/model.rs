// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Define the record and metrics model (activity, tickets, person keys, per-person and per-repo accumulators)
// role: model/types
// outputs: Serializable structs with stable field names shared by sources, core and rendering
// invariants: PersonKey orders logins before the UNMATCHED bucket; accumulators only grow during aggregation
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

/// Label used wherever the UNMATCHED bucket is rendered as text.
pub const UNMATCHED_LABEL: &str = "(unmatched)";

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
  #[default]
  Commit,
  PullRequest,
  Review,
  IssueClosed,
}

const REVERT_MARKERS: &[&str] = &["revert \"", "revert:", "revert ", "reverts commit", "reverted", "revert of", "revert pr"];

/// Whether a commit message opens like a revert. Only the first 50 characters count.
pub fn is_revert_message(message: &str) -> bool {
  let head: String = message.chars().take(50).collect::<String>().to_lowercase();
  REVERT_MARKERS.iter().any(|m| head.contains(m))
}

/// One commit, pull request, review or closed issue observed on the hosting platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
  #[serde(default)]
  pub author_login: String,
  /// Display name reported by the platform, when known.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub author_name: Option<String>,
  #[serde(default)]
  pub repository: String,
  pub kind: ActivityKind,
  pub timestamp: DateTime<Utc>,
  #[serde(default)]
  pub pr_merged: bool,
  #[serde(default)]
  pub pr_lines_changed: i64,
  /// Added and deleted lines of a commit or pull request, when the source reports them.
  #[serde(default)]
  pub lines_added: i64,
  #[serde(default)]
  pub lines_deleted: i64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub review_target_author: Option<String>,
  /// Creation time of the reviewed pull request.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub pr_created_at: Option<DateTime<Utc>>,
  /// Commit message; sources use it to drop reverts.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub message: Option<String>,
  /// Commit sha, PR number, review id or issue number; only used to deduplicate fetches.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub source_id: Option<String>,
}

impl ActivityRecord {
  pub fn is_revert(&self) -> bool {
    self.kind == ActivityKind::Commit && self.message.as_deref().is_some_and(is_revert_message)
  }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
  High,
  Medium,
  Low,
  #[default]
  Other,
}

impl Priority {
  /// Classify a free-text priority cell ("P1 - High", "med", ...).
  pub fn classify(raw: &str) -> Self {
    let p = raw.trim().to_lowercase();

    if p.contains("high") {
      Priority::High
    } else if p.contains("med") {
      Priority::Medium
    } else if p.contains("low") {
      Priority::Low
    } else {
      Priority::Other
    }
  }
}

/// One support ticket row. Timestamp cells stay as the spreadsheet text; the
/// aggregator parses them so malformed values surface as warnings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TicketRecord {
  /// 1-based spreadsheet row (header is row 1).
  pub row: usize,
  pub title: String,
  pub priority: Priority,
  #[serde(default)]
  pub priority_label: String,
  #[serde(rename = "type", default)]
  pub ticket_type: String,
  #[serde(default)]
  pub assignee: String,
  #[serde(default)]
  pub reporter: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub reported_at: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub first_response_at: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub closed_at: Option<String>,
  #[serde(default)]
  pub duration: String,
  #[serde(default)]
  pub bucket: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub github_issue_ref: Option<String>,
  #[serde(default)]
  pub notes: String,
  #[serde(default)]
  pub root_cause_status: String,
}

impl TicketRecord {
  pub fn is_closed(&self) -> bool {
    self.closed_at.as_deref().is_some_and(|c| !c.trim().is_empty())
  }

  pub fn has_github_issue(&self) -> bool {
    self.github_issue_ref.as_deref().is_some_and(|r| !r.trim().is_empty())
  }
}

/// Canonical identity of one team member, or the bucket for tickets nobody could be matched to.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PersonKey {
  Login(String),
  Unmatched,
}

impl PersonKey {
  /// Logins compare case-insensitively, so the key is the trimmed lowercase form.
  pub fn login(raw: &str) -> Self {
    PersonKey::Login(raw.trim().to_lowercase())
  }

  pub fn is_unmatched(&self) -> bool {
    matches!(self, PersonKey::Unmatched)
  }

  pub fn as_str(&self) -> &str {
    match self {
      PersonKey::Login(login) => login,
      PersonKey::Unmatched => UNMATCHED_LABEL,
    }
  }
}

impl fmt::Display for PersonKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl Serialize for PersonKey {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(self.as_str())
  }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoStatus {
  Active,
  Archived,
  #[default]
  Unknown,
}

/// Where a person's numbers came from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSources {
  GithubAndTickets,
  GithubOnly,
  Unmatched,
}

/// Running totals for one PersonKey.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PersonMetrics {
  pub commits: u64,
  pub pull_requests: u64,
  pub merged_prs: u64,
  pub pr_lines_changed: i64,
  pub lines_added: i64,
  pub lines_deleted: i64,
  pub reviews_given: u64,
  pub reviews_received: u64,
  /// Hours from pull request creation to each review this person gave.
  #[serde(skip_serializing)]
  pub review_hours: Vec<f64>,
  pub issues_closed: u64,
  pub repositories: BTreeSet<String>,
  pub last_active: Option<DateTime<Utc>>,

  pub tickets_assigned: u64,
  pub tickets_open: u64,
  pub tickets_closed: u64,
  pub tickets_high_priority: u64,
  pub tickets_medium_priority: u64,
  pub tickets_low_priority: u64,
  pub tickets_other_priority: u64,
  pub ticket_types: BTreeMap<String, u64>,
  pub tickets_with_github_issue: u64,
  /// Hours from report to close, one sample per ticket with a valid pair.
  #[serde(skip_serializing)]
  pub resolution_hours: Vec<f64>,
  /// Hours from report to first response, one sample per ticket with a valid pair.
  #[serde(skip_serializing)]
  pub first_response_hours: Vec<f64>,
  /// Tickets whose timestamps were out of order and were left out of the averages.
  pub duration_anomalies: u64,
}

impl PersonMetrics {
  pub fn touch(&mut self, at: DateTime<Utc>) {
    if self.last_active.map_or(true, |prev| at > prev) {
      self.last_active = Some(at);
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RepositoryMetrics {
  pub name: String,
  pub status: RepoStatus,
  pub commits: u64,
  pub pull_requests: u64,
  pub reviews: u64,
  pub issues_closed: u64,
  pub contributors: BTreeSet<String>,
  pub last_activity: Option<DateTime<Utc>>,
}
