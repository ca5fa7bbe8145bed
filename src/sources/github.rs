// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Fetch commits, pull requests, reviews and closed issues for every repository of a GitHub organization (REST)
// role: sources/github
// inputs: org name; reporting window; env GITHUB_TOKEN / GH_TOKEN; optional `gh` CLI for token fallback; TAR_TEST_* fixtures
// outputs: GithubFetch { activity (deduplicated, window-filtered, sorted), repository_status }
// side_effects: Network calls to api.github.com; spawns `gh` subprocess when needed
// invariants:
// - Per-repository failures are logged and skipped; only a failed repository listing is an error
// - Repositories are fetched in parallel; output order is independent of completion order
// - Bot accounts are excluded unless asked for: their commits, PRs, reviews and reviews of their PRs
// - Revert commits and pull requests without a number are skipped
// - Token discovery prefers GITHUB_TOKEN, then GH_TOKEN, then `gh auth token`
// errors: Repository listing failure bubbles as anyhow::Error with the org named
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::ext::serde_json::JsonFetch;
use crate::model::{ActivityKind, ActivityRecord, RepoStatus};
use crate::sources::activity_file::filter_to_window;
use crate::window::ReportWindow;

const GITHUB_API: &str = "https://api.github.com";
const PER_PAGE: &str = "100";

const KNOWN_BOTS: &[&str] = &[
  "claude",
  "dependabot",
  "github-actions",
  "github-code-quality",
  "renovate",
  "snyk",
  "snyk-bot",
  "greenkeeper",
  "codecov",
  "sonarcloud",
];

/// Discover a GitHub token: env vars first, then `gh auth token` if available.
pub fn get_github_token() -> Option<String> {
  for var in ["GITHUB_TOKEN", "GH_TOKEN"] {
    if let Ok(t) = std::env::var(var) {
      if !t.trim().is_empty() {
        return Some(t.trim().to_string());
      }
    }
  }

  if let Ok(output) = std::process::Command::new("gh").args(["auth", "token"]).output() {
    if output.status.success() {
      let t = String::from_utf8_lossy(&output.stdout).trim().to_string();

      if !t.is_empty() {
        return Some(t);
      }
    }
  }

  None
}

pub fn is_bot_login(login: &str) -> bool {
  let l = login.trim().to_lowercase();
  if l.is_empty() {
    return false;
  }
  l.ends_with("[bot]")
    || l.ends_with("-bot")
    || l.starts_with("bot-")
    || l.starts_with("bot_")
    || KNOWN_BOTS.contains(&l.as_str())
}

fn is_bot_user(user: &Value) -> bool {
  let typed_bot = user.fetch("type").to::<String>().is_some_and(|t| t.eq_ignore_ascii_case("Bot"));
  typed_bot || user.fetch("login").to::<String>().is_some_and(|l| is_bot_login(&l))
}

// --- Trait seam for GitHub API ---
pub trait GithubApi: Send + Sync {
  fn list_org_repos_json(&self, org: &str) -> Option<Value>;
  fn list_commits_json(&self, owner: &str, repo: &str, since: &str, until: &str) -> Option<Value>;
  fn list_pulls_json(&self, owner: &str, repo: &str) -> Option<Value>;
  fn get_pull_details_json(&self, owner: &str, repo: &str, number: i64) -> Option<Value>;
  fn list_reviews_for_pull_json(&self, owner: &str, repo: &str, number: i64) -> Option<Value>;
  fn list_closed_issues_json(&self, owner: &str, repo: &str, since: &str) -> Option<Value>;
  fn get_issue_json(&self, owner: &str, repo: &str, number: i64) -> Option<Value>;
}

// --- In-memory caching wrapper ---
// One entry per distinct request for the lifetime of the run.
struct GithubCachedApi {
  inner: Box<dyn GithubApi>,
  responses: Mutex<HashMap<String, Option<Value>>>,
}

impl GithubCachedApi {
  fn new(inner: Box<dyn GithubApi>) -> Self {
    Self { inner, responses: Mutex::new(HashMap::new()) }
  }

  fn cached(&self, key: String, fetch: impl FnOnce() -> Option<Value>) -> Option<Value> {
    if let Some(v) = self.responses.lock().ok().and_then(|m| m.get(&key).cloned()) {
      return v;
    }
    let v = fetch();
    if let Ok(mut m) = self.responses.lock() {
      m.insert(key, v.clone());
    }

    v
  }
}

impl GithubApi for GithubCachedApi {
  fn list_org_repos_json(&self, org: &str) -> Option<Value> {
    self.cached(format!("repos:{}", org), || self.inner.list_org_repos_json(org))
  }

  fn list_commits_json(&self, owner: &str, repo: &str, since: &str, until: &str) -> Option<Value> {
    self.cached(format!("commits:{}/{}:{}:{}", owner, repo, since, until), || {
      self.inner.list_commits_json(owner, repo, since, until)
    })
  }

  fn list_pulls_json(&self, owner: &str, repo: &str) -> Option<Value> {
    self.cached(format!("pulls:{}/{}", owner, repo), || self.inner.list_pulls_json(owner, repo))
  }

  fn get_pull_details_json(&self, owner: &str, repo: &str, number: i64) -> Option<Value> {
    self.cached(format!("pull:{}/{}#{}", owner, repo, number), || {
      self.inner.get_pull_details_json(owner, repo, number)
    })
  }

  fn list_reviews_for_pull_json(&self, owner: &str, repo: &str, number: i64) -> Option<Value> {
    self.cached(format!("reviews:{}/{}#{}", owner, repo, number), || {
      self.inner.list_reviews_for_pull_json(owner, repo, number)
    })
  }

  fn list_closed_issues_json(&self, owner: &str, repo: &str, since: &str) -> Option<Value> {
    self.cached(format!("issues:{}/{}:{}", owner, repo, since), || {
      self.inner.list_closed_issues_json(owner, repo, since)
    })
  }

  fn get_issue_json(&self, owner: &str, repo: &str, number: i64) -> Option<Value> {
    self.cached(format!("issue:{}/{}#{}", owner, repo, number), || self.inner.get_issue_json(owner, repo, number))
  }
}

struct GithubHttpApi {
  token: String,
  agent: ureq::Agent,
}

impl GithubHttpApi {
  fn new(token: String) -> Self {
    let agent: ureq::Agent = ureq::Agent::config_builder().timeout_global(Some(Duration::from_secs(30))).build().into();
    Self { token, agent }
  }

  fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Option<Value> {
    let mut req = self
      .agent
      .get(url)
      .header("Accept", "application/vnd.github+json")
      .header("User-Agent", "team-activity-report")
      .header("Authorization", &format!("Bearer {}", self.token));
    for (k, v) in query {
      req = req.query(*k, *v);
    }

    match req.call() {
      Ok(mut r) => match r.body_mut().read_json::<Value>() {
        Ok(v) => Some(v),
        Err(e) => {
          warn!(url, error = %e, "GitHub response was not JSON");
          None
        }
      },
      Err(e) => {
        warn!(url, error = %e, "GitHub request failed");
        None
      }
    }
  }
}

impl GithubApi for GithubHttpApi {
  fn list_org_repos_json(&self, org: &str) -> Option<Value> {
    let url = format!("{}/orgs/{}/repos", GITHUB_API, org);
    self.get_json(&url, &[("per_page", PER_PAGE), ("type", "all")])
  }

  fn list_commits_json(&self, owner: &str, repo: &str, since: &str, until: &str) -> Option<Value> {
    let url = format!("{}/repos/{}/{}/commits", GITHUB_API, owner, repo);
    self.get_json(&url, &[("per_page", PER_PAGE), ("since", since), ("until", until)])
  }

  fn list_pulls_json(&self, owner: &str, repo: &str) -> Option<Value> {
    let url = format!("{}/repos/{}/{}/pulls", GITHUB_API, owner, repo);
    self.get_json(&url, &[("per_page", PER_PAGE), ("state", "all"), ("sort", "created"), ("direction", "desc")])
  }

  fn get_pull_details_json(&self, owner: &str, repo: &str, number: i64) -> Option<Value> {
    let url = format!("{}/repos/{}/{}/pulls/{}", GITHUB_API, owner, repo, number);
    self.get_json(&url, &[])
  }

  fn list_reviews_for_pull_json(&self, owner: &str, repo: &str, number: i64) -> Option<Value> {
    let url = format!("{}/repos/{}/{}/pulls/{}/reviews", GITHUB_API, owner, repo, number);
    self.get_json(&url, &[("per_page", PER_PAGE)])
  }

  fn list_closed_issues_json(&self, owner: &str, repo: &str, since: &str) -> Option<Value> {
    let url = format!("{}/repos/{}/{}/issues", GITHUB_API, owner, repo);
    self.get_json(&url, &[("per_page", PER_PAGE), ("state", "closed"), ("since", since)])
  }

  fn get_issue_json(&self, owner: &str, repo: &str, number: i64) -> Option<Value> {
    let url = format!("{}/repos/{}/{}/issues/{}", GITHUB_API, owner, repo, number);
    self.get_json(&url, &[])
  }
}

/// Fixture-backed API. Each variable holds JSON:
/// - TAR_TEST_REPOS_JSON: the org repository array
/// - TAR_TEST_COMMITS_JSON / TAR_TEST_PULLS_JSON / TAR_TEST_ISSUES_JSON: `{ "<repo>": [...] }`
/// - TAR_TEST_PULL_DETAILS_JSON / TAR_TEST_REVIEWS_JSON / TAR_TEST_ISSUE_DETAILS_JSON: `{ "<repo>#<number>": ... }`
struct GithubEnvApi;

impl GithubEnvApi {
  fn var_json(name: &str) -> Option<Value> {
    std::env::var(name).ok().and_then(|s| serde_json::from_str::<Value>(&s).ok())
  }

  fn keyed(name: &str, key: &str) -> Option<Value> {
    Self::var_json(name).and_then(|v| v.get(key).cloned())
  }
}

impl GithubApi for GithubEnvApi {
  fn list_org_repos_json(&self, _org: &str) -> Option<Value> {
    Self::var_json("TAR_TEST_REPOS_JSON")
  }

  fn list_commits_json(&self, _owner: &str, repo: &str, _since: &str, _until: &str) -> Option<Value> {
    Self::keyed("TAR_TEST_COMMITS_JSON", repo).or_else(|| Some(serde_json::json!([])))
  }

  fn list_pulls_json(&self, _owner: &str, repo: &str) -> Option<Value> {
    Self::keyed("TAR_TEST_PULLS_JSON", repo).or_else(|| Some(serde_json::json!([])))
  }

  fn get_pull_details_json(&self, _owner: &str, repo: &str, number: i64) -> Option<Value> {
    Self::keyed("TAR_TEST_PULL_DETAILS_JSON", &format!("{}#{}", repo, number))
  }

  fn list_reviews_for_pull_json(&self, _owner: &str, repo: &str, number: i64) -> Option<Value> {
    Self::keyed("TAR_TEST_REVIEWS_JSON", &format!("{}#{}", repo, number))
  }

  fn list_closed_issues_json(&self, _owner: &str, repo: &str, _since: &str) -> Option<Value> {
    Self::keyed("TAR_TEST_ISSUES_JSON", repo).or_else(|| Some(serde_json::json!([])))
  }

  fn get_issue_json(&self, _owner: &str, repo: &str, number: i64) -> Option<Value> {
    Self::keyed("TAR_TEST_ISSUE_DETAILS_JSON", &format!("{}#{}", repo, number))
  }
}

pub fn env_wants_mock() -> bool {
  std::env::vars().any(|(k, _)| k.starts_with("TAR_TEST_") && k.ends_with("_JSON"))
}

/// Pick a backend: fixtures when TAR_TEST_* is set, otherwise HTTP when a token exists.
pub fn build_api(token: Option<String>) -> Option<Box<dyn GithubApi>> {
  let inner: Box<dyn GithubApi> = if env_wants_mock() {
    Box::new(GithubEnvApi)
  } else {
    Box::new(GithubHttpApi::new(token?))
  };

  Some(Box::new(GithubCachedApi::new(inner)))
}

#[cfg(test)]
fn make_env_api() -> Box<dyn GithubApi> {
  Box::new(GithubCachedApi::new(Box::new(GithubEnvApi)))
}

#[derive(Debug, Clone, Default)]
pub struct GithubFetch {
  pub activity: Vec<ActivityRecord>,
  pub repository_status: BTreeMap<String, RepoStatus>,
}

/// Fetch activity for every repository of `org` inside `window`.
pub fn fetch_org_activity(api: &dyn GithubApi, org: &str, window: &ReportWindow, include_bots: bool) -> Result<GithubFetch> {
  // Phase 1: repositories and their status
  let Some(repos_json) = api.list_org_repos_json(org) else {
    bail!("listing repositories for GitHub org '{}' failed", org);
  };
  let mut repository_status = BTreeMap::new();
  for repo in repos_json.fetch("").items() {
    let Some(name) = repo.fetch("name").to::<String>() else { continue };
    let status = if repo.fetch("archived").to_or_default::<bool>() { RepoStatus::Archived } else { RepoStatus::Active };
    repository_status.insert(name, status);
  }
  info!(org, repositories = repository_status.len(), "listed organization repositories");

  // Phase 2: per-repository fetch in parallel
  let names: Vec<&String> = repository_status.keys().collect();
  let per_repo: Vec<Vec<ActivityRecord>> =
    names.par_iter().map(|name| fetch_repo_activity(api, org, name, window, include_bots)).collect();

  // Phase 3: merge, dedup, window-filter, order
  let merged: Vec<ActivityRecord> = dedup_activity(per_repo.into_iter().flatten().collect());
  let (mut activity, outside) = filter_to_window(merged, window);
  activity.sort_by(|a, b| {
    (a.timestamp, &a.repository, a.kind, &a.source_id).cmp(&(b.timestamp, &b.repository, b.kind, &b.source_id))
  });
  info!(records = activity.len(), outside_window = outside, "fetched GitHub activity");

  Ok(GithubFetch { activity, repository_status })
}

/// Drop repeated (kind, repository, source_id) records; records without an id are kept.
pub fn dedup_activity(records: Vec<ActivityRecord>) -> Vec<ActivityRecord> {
  let mut seen: BTreeSet<(ActivityKind, String, String)> = BTreeSet::new();
  records
    .into_iter()
    .filter(|r| match &r.source_id {
      Some(id) => seen.insert((r.kind, r.repository.clone(), id.clone())),
      None => true,
    })
    .collect()
}

fn parse_ts(v: &Value, path: &str) -> Option<DateTime<Utc>> {
  let s = v.fetch(path).to::<String>()?;
  DateTime::parse_from_rfc3339(&s).ok().map(|dt| dt.with_timezone(&Utc))
}

fn fetch_repo_activity(
  api: &dyn GithubApi,
  org: &str,
  repo: &str,
  window: &ReportWindow,
  include_bots: bool,
) -> Vec<ActivityRecord> {
  let mut out = Vec::new();

  // Commits
  match api.list_commits_json(org, repo, &window.start_iso(), &window.end_iso()) {
    Some(commits) => {
      let mut reverts = 0;
      for c in commits.fetch("").items() {
        if !include_bots && c.get("author").is_some_and(is_bot_user) {
          continue;
        }
        match commit_record(repo, c) {
          Some(rec) if rec.is_revert() => reverts += 1,
          Some(rec) => out.push(rec),
          None => {}
        }
      }
      if reverts > 0 {
        debug!(repo, reverts, "skipped revert commits");
      }
    }
    None => warn!(repo, "could not list commits; skipping"),
  }

  // Issues closed in the window, credited to whoever closed them
  match api.list_closed_issues_json(org, repo, &window.start_iso()) {
    Some(issues) => {
      for issue in issues.fetch("").items() {
        if let Some(rec) = closed_issue_record(api, org, repo, issue, window, include_bots) {
          out.push(rec);
        }
      }
    }
    None => warn!(repo, "could not list closed issues; skipping"),
  }

  // Pull requests created in the window, with their reviews
  let Some(pulls) = api.list_pulls_json(org, repo) else {
    warn!(repo, "could not list pull requests; skipping");
    return out;
  };
  for pr in pulls.fetch("").items() {
    let Some(created) = parse_ts(pr, "created_at") else { continue };
    if !window.contains(created) {
      continue;
    }
    let author = pr.fetch("user.login").to::<String>().unwrap_or_default();
    if !include_bots && pr.get("user").is_some_and(is_bot_user) {
      debug!(repo, author = %author, "skipping bot pull request");
      continue;
    }
    let Some(number) = pr.fetch("number").to::<i64>() else {
      debug!(repo, author = %author, "skipping pull request without a number");
      continue;
    };
    let details = api.get_pull_details_json(org, repo, number);
    out.push(pull_record(repo, pr, details.as_ref(), created));

    let reviews = api.list_reviews_for_pull_json(org, repo, number).unwrap_or(Value::Null);
    for review in reviews.fetch("").items() {
      let reviewer = review.get("user").cloned().unwrap_or(Value::Null);
      if !include_bots && is_bot_user(&reviewer) {
        continue;
      }
      let Some(login) = reviewer.fetch("login").to::<String>() else { continue };
      let submitted = parse_ts(review, "submitted_at").unwrap_or(created);
      out.push(ActivityRecord {
        author_login: login,
        repository: repo.to_string(),
        kind: ActivityKind::Review,
        timestamp: submitted,
        review_target_author: Some(author.clone()).filter(|a| !a.is_empty()),
        pr_created_at: Some(created),
        source_id: review.fetch("id").text(),
        ..Default::default()
      });
    }
  }

  debug!(repo, records = out.len(), "fetched repository activity");
  out
}

fn commit_record(repo: &str, c: &Value) -> Option<ActivityRecord> {
  let timestamp = parse_ts(c, "commit.committer.date").or_else(|| parse_ts(c, "commit.author.date"))?;
  let author_login = c.fetch("author.login").to::<String>().unwrap_or_default();
  let author_name = if author_login.is_empty() { None } else { c.fetch("commit.author.name").text() };

  Some(ActivityRecord {
    author_login,
    author_name,
    repository: repo.to_string(),
    kind: ActivityKind::Commit,
    timestamp,
    lines_added: c.fetch("stats.additions").to_or_default::<i64>(),
    lines_deleted: c.fetch("stats.deletions").to_or_default::<i64>(),
    message: c.fetch("commit.message").text(),
    source_id: c.fetch("sha").text(),
    ..Default::default()
  })
}

fn pull_record(repo: &str, pr: &Value, details: Option<&Value>, created: DateTime<Utc>) -> ActivityRecord {
  let merged = details.and_then(|d| d.fetch("merged").to::<bool>()).unwrap_or(false) || pr.fetch("merged_at").exists();
  let source = details.unwrap_or(pr);
  let added = source.fetch("additions").to_or_default::<i64>();
  let deleted = source.fetch("deletions").to_or_default::<i64>();

  ActivityRecord {
    author_login: pr.fetch("user.login").to::<String>().unwrap_or_default(),
    repository: repo.to_string(),
    kind: ActivityKind::PullRequest,
    timestamp: created,
    pr_merged: merged,
    pr_lines_changed: added + deleted,
    lines_added: added,
    lines_deleted: deleted,
    source_id: pr.fetch("number").text(),
    ..Default::default()
  }
}

/// A closed issue credited to the account that closed it. `closed_by` is only
/// present on the single-issue endpoint.
fn closed_issue_record(
  api: &dyn GithubApi,
  org: &str,
  repo: &str,
  issue: &Value,
  window: &ReportWindow,
  include_bots: bool,
) -> Option<ActivityRecord> {
  // The issues listing includes pull requests
  if issue.get("pull_request").is_some() {
    return None;
  }
  let closed = parse_ts(issue, "closed_at").filter(|at| window.contains(*at))?;
  let number = issue.fetch("number").to::<i64>()?;
  let details = api.get_issue_json(org, repo, number)?;
  let closer = details.get("closed_by").filter(|u| !u.is_null())?;
  if !include_bots && is_bot_user(closer) {
    return None;
  }

  Some(ActivityRecord {
    author_login: closer.fetch("login").to::<String>()?,
    repository: repo.to_string(),
    kind: ActivityKind::IssueClosed,
    timestamp: closed,
    source_id: Some(number.to_string()),
    ..Default::default()
  })
}
