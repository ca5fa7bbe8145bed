// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Resolve free-text ticket assignees to GitHub identities (manual map, exact, bounded fuzzy)
// role: core/identity
// inputs: GitHub identities (login + display names), distinct assignee strings, manual assignee→login map
// outputs: IdentityMap with login keys, per-assignee resolutions and matcher warnings
// invariants:
// - Every GitHub login is self-mapped to exactly one PersonKey
// - Ties and multi-candidate exact hits resolve to UNMATCHED, never to an arbitrary login
// - Iteration is over ordered collections only; identical inputs give identical maps
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Warning, WarningKind};
use crate::model::PersonKey;

/// Fuzzy candidates must score strictly above this.
pub const FUZZY_THRESHOLD: f64 = 0.7;
/// Score given when every token of one name appears in the other ("alice" vs "Alice Smith").
pub const TOKEN_SUBSET_SCORE: f64 = 0.85;
const TIE_EPSILON: f64 = 1e-9;

static RE_BOT_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:\s*\(bot\)|\s*\[bot\])$").unwrap());
static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// A login plus every display name seen for it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct GithubIdentity {
  pub login: String,
  pub display_names: BTreeSet<String>,
}

impl GithubIdentity {
  pub fn new(login: &str) -> Self {
    Self { login: login.trim().to_string(), display_names: BTreeSet::new() }
  }

  pub fn key(&self) -> PersonKey {
    PersonKey::login(&self.login)
  }

  fn names(&self) -> impl Iterator<Item = &str> {
    std::iter::once(self.login.as_str()).chain(self.display_names.iter().map(String::as_str))
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum MatchMethod {
  Manual,
  Exact,
  Fuzzy { score: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AssigneeResolution {
  Matched { key: PersonKey, method: MatchMethod },
  Ambiguous { candidates: Vec<String> },
  NoCandidate,
  Empty,
}

impl AssigneeResolution {
  pub fn person_key(&self) -> PersonKey {
    match self {
      AssigneeResolution::Matched { key, .. } => key.clone(),
      _ => PersonKey::Unmatched,
    }
  }

  pub fn is_matched(&self) -> bool {
    matches!(self, AssigneeResolution::Matched { .. })
  }
}

#[derive(Debug, Clone, Default)]
pub struct IdentityMap {
  pub identities: BTreeMap<PersonKey, GithubIdentity>,
  /// Keyed by the assignee text exactly as it appeared on the ticket.
  pub assignees: BTreeMap<String, AssigneeResolution>,
  pub warnings: Vec<Warning>,
}

impl IdentityMap {
  /// Logins never observed by the matcher still get their own key.
  pub fn key_for_login(&self, login: &str) -> PersonKey {
    PersonKey::login(login)
  }

  pub fn key_for_assignee(&self, assignee: &str) -> PersonKey {
    self
      .assignees
      .get(assignee)
      .map(AssigneeResolution::person_key)
      .unwrap_or(PersonKey::Unmatched)
  }

  pub fn resolution(&self, assignee: &str) -> Option<&AssigneeResolution> {
    self.assignees.get(assignee)
  }

  /// Assignee strings (sorted) matched to `key`.
  pub fn assignees_for(&self, key: &PersonKey) -> Vec<String> {
    self
      .assignees
      .iter()
      .filter(|(_, r)| matches!(r, AssigneeResolution::Matched { key: k, .. } if k == key))
      .map(|(a, _)| a.clone())
      .collect()
  }

  pub fn matched_keys(&self) -> BTreeSet<PersonKey> {
    self
      .assignees
      .values()
      .filter_map(|r| match r {
        AssigneeResolution::Matched { key, .. } => Some(key.clone()),
        _ => None,
      })
      .collect()
  }

  /// Non-empty assignees that could not be resolved (no candidate or ambiguous).
  pub fn tickets_only(&self) -> Vec<String> {
    self
      .assignees
      .iter()
      .filter(|(_, r)| matches!(r, AssigneeResolution::NoCandidate | AssigneeResolution::Ambiguous { .. }))
      .map(|(a, _)| a.clone())
      .collect()
  }

  pub fn display_name(&self, key: &PersonKey) -> Option<String> {
    self.identities.get(key).and_then(|i| i.display_names.iter().next().cloned())
  }
}

/// Case-fold, trim, collapse whitespace and drop bot suffixes.
pub fn normalize_identity(raw: &str) -> String {
  let lowered = raw.trim().to_lowercase();
  let stripped = RE_BOT_SUFFIX.replace(&lowered, "");
  RE_WHITESPACE.replace_all(stripped.trim(), " ").into_owned()
}

fn compact(normalized: &str) -> String {
  normalized.chars().filter(|c| !matches!(c, ' ' | '-' | '_' | '.')).collect()
}

fn tokens(normalized: &str) -> BTreeSet<&str> {
  normalized
    .split(|c: char| c.is_whitespace() || matches!(c, '-' | '_' | '.'))
    .filter(|t| !t.is_empty())
    .collect()
}

/// Similarity in [0, 1] between two normalized names.
pub fn name_similarity(a: &str, b: &str) -> f64 {
  let (ca, cb) = (compact(a), compact(b));
  if ca.is_empty() || cb.is_empty() {
    return 0.0;
  }

  let edit = strsim::normalized_levenshtein(&ca, &cb);
  let (ta, tb) = (tokens(a), tokens(b));
  let subset = !ta.is_empty() && !tb.is_empty() && (ta.is_subset(&tb) || tb.is_subset(&ta));

  if subset {
    edit.max(TOKEN_SUBSET_SCORE)
  } else {
    edit
  }
}

/// Build the assignee → PersonKey map.
///
/// Resolution order per assignee: manual map, exact normalized match against
/// logins, exact match against display names, then the best fuzzy candidate
/// above [`FUZZY_THRESHOLD`]. A login hit always wins over display names.
/// Several logins sharing the best exact or fuzzy score leave the assignee
/// UNMATCHED.
pub fn match_identities(
  identities: &[GithubIdentity],
  assignees: &BTreeSet<String>,
  manual_map: &BTreeMap<String, String>,
) -> IdentityMap {
  let mut map = IdentityMap::default();

  for identity in identities {
    let entry = map.identities.entry(identity.key()).or_insert_with(|| GithubIdentity::new(&identity.login));
    entry.display_names.extend(identity.display_names.iter().cloned());
  }

  let manual: BTreeMap<String, PersonKey> = manual_map
    .iter()
    .map(|(assignee, login)| (normalize_identity(assignee), PersonKey::login(login)))
    .collect();

  // Pre-normalize every candidate name once.
  let candidates: Vec<(PersonKey, Vec<String>)> = map
    .identities
    .iter()
    .map(|(key, identity)| (key.clone(), identity.names().map(normalize_identity).collect()))
    .collect();

  for assignee in assignees {
    let resolution = resolve_one(assignee, &manual, &candidates, &map.identities, &mut map.warnings);
    map.assignees.insert(assignee.clone(), resolution);
  }

  map
}

fn resolve_one(
  assignee: &str,
  manual: &BTreeMap<String, PersonKey>,
  candidates: &[(PersonKey, Vec<String>)],
  known: &BTreeMap<PersonKey, GithubIdentity>,
  warnings: &mut Vec<Warning>,
) -> AssigneeResolution {
  let normalized = normalize_identity(assignee);
  if normalized.is_empty() {
    return AssigneeResolution::Empty;
  }

  // Phase 1: manual mapping
  if let Some(key) = manual.get(&normalized) {
    if known.contains_key(key) {
      debug!(assignee, key = %key, "manual identity mapping");
      return AssigneeResolution::Matched { key: key.clone(), method: MatchMethod::Manual };
    }
    warnings.push(Warning::new(
      WarningKind::UnknownMappingTarget,
      format!("user mapping sends '{}' to '{}', which has no GitHub activity; ignoring", assignee, key),
    ));
  }

  // Phase 2: exact normalized match, logins before display names
  let login_hits: Vec<&PersonKey> = candidates
    .iter()
    .filter(|(_, names)| names.first() == Some(&normalized))
    .map(|(key, _)| key)
    .collect();
  let exact: Vec<&PersonKey> = if login_hits.is_empty() {
    candidates
      .iter()
      .filter(|(_, names)| names.iter().skip(1).any(|n| *n == normalized))
      .map(|(key, _)| key)
      .collect()
  } else {
    login_hits
  };

  match exact.as_slice() {
    [only] => {
      debug!(assignee, key = %only, "exact identity match");
      return AssigneeResolution::Matched { key: (*only).clone(), method: MatchMethod::Exact };
    }
    [] => {}
    many => return ambiguous(assignee, many.iter().map(|k| k.to_string()).collect(), warnings),
  }

  // Phase 3: bounded fuzzy match
  let scored: Vec<(&PersonKey, f64)> = candidates
    .iter()
    .map(|(key, names)| {
      let best = names.iter().map(|n| name_similarity(&normalized, n)).fold(0.0_f64, f64::max);
      (key, best)
    })
    .filter(|(_, score)| *score > FUZZY_THRESHOLD)
    .collect();

  let Some(best) = scored.iter().map(|(_, s)| *s).reduce(f64::max) else {
    debug!(assignee, "no identity candidate");
    return AssigneeResolution::NoCandidate;
  };

  let top: Vec<&PersonKey> = scored
    .iter()
    .filter(|(_, s)| (best - *s).abs() < TIE_EPSILON)
    .map(|(k, _)| *k)
    .collect();

  if let [only] = top.as_slice() {
    info!(assignee, key = %only, score = best, "fuzzy identity match");
    AssigneeResolution::Matched { key: (*only).clone(), method: MatchMethod::Fuzzy { score: best } }
  } else {
    ambiguous(assignee, top.iter().map(|k| k.to_string()).collect(), warnings)
  }
}

fn ambiguous(assignee: &str, candidates: Vec<String>, warnings: &mut Vec<Warning>) -> AssigneeResolution {
  warnings.push(Warning::new(
    WarningKind::AmbiguousIdentity,
    format!("assignee '{}' matches several GitHub users ({}); left unmatched", assignee, candidates.join(", ")),
  ));
  AssigneeResolution::Ambiguous { candidates }
}
