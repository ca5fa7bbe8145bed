// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Command-line surface (clap derive + env fallbacks) normalized into an EffectiveConfig
// role: config/cli
// inputs: argv, environment (GITHUB_ORG, GOOGLE_SHEET_ID, GOOGLE_SHEET_NAME, USER_MAPPING_FILE, DAYS_BACK, OUTPUT_DIR, ...)
// outputs: EffectiveConfig with exactly one activity source, one ticket source and one window spec
// invariants:
// - At most one of --month | --for | --since/--until; --days-back applies otherwise
// - Activity comes from --activity-file or --github-org, never both
// errors: Conflicting or missing selections bail with the flags named
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use serde::Serialize;

use crate::util;
use crate::window::WindowSpec;

#[derive(Parser, Debug)]
#[command(
    name = "team-activity-report",
    version,
    about = "Reconcile GitHub activity with support tickets into per-person team metrics",
    long_about = None
)]
pub struct Cli {
  /// JSON file of activity records (alternative to --github-org)
  #[arg(long)]
  pub activity_file: Option<PathBuf>,

  /// GitHub organization to fetch commits, pull requests and reviews from
  #[arg(long, env = "GITHUB_ORG")]
  pub github_org: Option<String>,

  /// Keep activity from bot accounts (dependabot, renovate, *[bot], ...)
  #[arg(long)]
  pub include_bots: bool,

  /// Ticket sheet exported as a Sheets `values` JSON document
  #[arg(long)]
  pub tickets_file: Option<PathBuf>,

  /// Google Sheet id to read tickets from (needs GOOGLE_SHEETS_API_KEY)
  #[arg(long, env = "GOOGLE_SHEET_ID")]
  pub sheet_id: Option<String>,

  /// Worksheet tab holding the tickets
  #[arg(long, env = "GOOGLE_SHEET_NAME", default_value = "Sheet1")]
  pub sheet_name: String,

  /// API key for the Sheets REST API
  #[arg(long, env = "GOOGLE_SHEETS_API_KEY", hide_env_values = true)]
  pub sheets_api_key: Option<String>,

  /// JSON object mapping ticket assignee names to GitHub logins
  #[arg(long, env = "USER_MAPPING_FILE")]
  pub user_mapping: Option<PathBuf>,

  /// JSON object mapping repository names to "active" or "archived"
  #[arg(long)]
  pub repo_status: Option<PathBuf>,

  /// Calendar month, e.g. 2025-08
  #[arg(long)]
  pub month: Option<String>,

  /// Natural language window, e.g. "last week" or "3 weeks"
  #[arg(long = "for")]
  pub for_str: Option<String>,

  /// Window start (RFC3339 or YYYY-MM-DD, UTC); must be paired with --until
  #[arg(long, alias = "start")]
  pub since: Option<String>,

  /// Window end (RFC3339 or YYYY-MM-DD, UTC); must be paired with --since
  #[arg(long, alias = "end")]
  pub until: Option<String>,

  /// Trailing window ending now, used when no other window flag is given
  #[arg(long, env = "DAYS_BACK", default_value_t = 30)]
  pub days_back: u32,

  /// Output location:
  /// - single report: file path, an existing directory (gets `team_metrics_<timestamp>.json`), or "-" for stdout (default)
  /// - with `--split-tables`: directory (default: auto-named temp dir)
  #[arg(long, env = "OUTPUT_DIR", default_value = "-")]
  pub out: String,

  /// Write one JSON file per table plus manifest.json instead of a single report
  #[arg(long)]
  pub split_tables: bool,

  /// Log filter when RUST_LOG is unset (error, warn, info, debug, trace)
  #[arg(long, default_value = "info")]
  pub log_level: String,

  /// Emit a troff man page to stdout (internal; for packaging)
  #[arg(long, hide = true)]
  pub gen_man: bool,

  /// Override the "now" instant for window resolution (hidden; tests only)
  #[arg(long = "now-override", hide = true)]
  pub now_override: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum ActivitySource {
  File(String),
  GithubOrg { org: String, include_bots: bool },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum TicketSource {
  None,
  File(String),
  Sheet { sheet_id: String, tab: String, api_key: String },
}

#[derive(Debug, Serialize)]
pub struct EffectiveConfig {
  pub activity: ActivitySource,
  pub tickets: TicketSource,
  pub user_mapping: Option<String>,
  pub repo_status: Option<String>,
  pub window: WindowSpec,
  pub out: String,
  pub split_tables: bool,
  pub now_override: Option<String>,
}

pub fn normalize(cli: Cli) -> Result<EffectiveConfig> {
  let window = match (&cli.month, &cli.for_str, &cli.since, &cli.until) {
    (Some(ym), None, None, None) => WindowSpec::Month { ym: ym.clone() },
    (None, Some(p), None, None) => WindowSpec::ForPhrase { phrase: p.clone() },
    (None, None, Some(s), Some(u)) => WindowSpec::SinceUntil { since: s.clone(), until: u.clone() },
    (None, None, None, None) => WindowSpec::DaysBack { days: cli.days_back },
    (None, None, Some(_), None) | (None, None, None, Some(_)) => bail!("--since and --until must be given together"),
    _ => bail!("Ambiguous time selection: choose only one of --month | --for | --since/--until"),
  };

  let activity = match (&cli.activity_file, &cli.github_org) {
    (Some(path), None) => ActivitySource::File(util::canonicalize_lossy(path)),
    (None, Some(org)) if !org.trim().is_empty() => {
      ActivitySource::GithubOrg { org: org.trim().to_string(), include_bots: cli.include_bots }
    }
    (Some(_), Some(_)) => bail!("choose one activity source: --activity-file or --github-org"),
    _ => bail!("no activity source: pass --activity-file or --github-org (or set GITHUB_ORG)"),
  };

  let tickets = match (&cli.tickets_file, &cli.sheet_id) {
    (Some(path), _) => TicketSource::File(util::canonicalize_lossy(path)),
    (None, Some(id)) if !id.trim().is_empty() => {
      let Some(api_key) = cli.sheets_api_key.clone().filter(|k| !k.trim().is_empty()) else {
        bail!("--sheet-id needs an API key: pass --sheets-api-key or set GOOGLE_SHEETS_API_KEY");
      };
      TicketSource::Sheet { sheet_id: id.trim().to_string(), tab: cli.sheet_name.clone(), api_key }
    }
    _ => TicketSource::None,
  };

  Ok(EffectiveConfig {
    activity,
    tickets,
    user_mapping: cli.user_mapping.as_deref().map(util::canonicalize_lossy),
    repo_status: cli.repo_status.as_deref().map(util::canonicalize_lossy),
    window,
    out: cli.out,
    split_tables: cli.split_tables,
    now_override: cli.now_override,
  })
}
