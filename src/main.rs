use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use team_activity_report::cli::{normalize, ActivitySource, Cli, EffectiveConfig, TicketSource};
use team_activity_report::reconcile::{reconcile, ReconcileConfig, ReconcileInput};
use team_activity_report::render::{render_report, RenderOptions};
use team_activity_report::sources::{activity_file, github, lookup, sheet};
use team_activity_report::util;
use team_activity_report::window::{parse_now_override, resolve_window, ReportWindow};

fn init_logging(level: &str) {
  let filter = EnvFilter::try_from_default_env()
    .or_else(|_| EnvFilter::try_new(level))
    .unwrap_or_else(|_| EnvFilter::new("info"));
  let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

fn main() -> Result<()> {
  dotenvy::dotenv().ok();
  let cli = Cli::parse();

  if cli.gen_man {
    let page = util::render_man_page::<Cli>()?;
    print!("{}", page);
    return Ok(());
  }

  init_logging(&cli.log_level);

  // Phase 1: normalize CLI
  let cfg = normalize(cli)?;

  // Phase 2: resolve now and the window
  let now_opt = parse_now_override(cfg.now_override.as_deref());
  let window = resolve_window(&cfg.window, now_opt)?;
  info!(label = %window.label, start = %window.start_iso(), end = %window.end_iso(), days = window.window_days(), "reporting window");

  // Phase 3: load sources
  let input = load_input(&cfg, &window)?;
  let mut config = ReconcileConfig::new(window.window_days());
  config.window_label = Some(window.label.clone());
  config.window_start = Some(window.start_iso());
  config.window_end = Some(window.end_iso());
  if let Some(path) = &cfg.user_mapping {
    config.user_mapping = lookup::load_user_mapping(Path::new(path))?;
  }

  // Phase 4: reconcile and render
  let report = reconcile(&input, &config)?;
  let opts = RenderOptions { out: cfg.out.clone(), split_tables: cfg.split_tables, now: now_opt };
  if let Some(text) = render_report(&report, &opts)? {
    println!("{}", text);
  }
  Ok(())
}

fn load_input(cfg: &EffectiveConfig, window: &ReportWindow) -> Result<ReconcileInput> {
  let mut input = ReconcileInput::default();

  match &cfg.activity {
    ActivitySource::File(path) => {
      input.activity = activity_file::load_activity_file(path.as_ref(), window)?;
    }
    ActivitySource::GithubOrg { org, include_bots } => {
      let api = github::build_api(github::get_github_token())
        .context("no GitHub token: set GITHUB_TOKEN or GH_TOKEN, or log in with `gh auth login`")?;
      let fetched = github::fetch_org_activity(api.as_ref(), org, window, *include_bots)?;
      input.activity = fetched.activity;
      input.repository_status = fetched.repository_status;
    }
  }

  let tickets = match &cfg.tickets {
    TicketSource::None => {
      warn!("no ticket source configured; reporting GitHub activity only");
      sheet::SheetLoad::default()
    }
    TicketSource::File(path) => sheet::load_sheet_file(Path::new(path))?,
    TicketSource::Sheet { sheet_id, tab, api_key } => sheet::fetch_sheet(sheet_id, tab, api_key)?,
  };
  input.tickets = tickets.tickets;
  input.upstream_warnings = tickets.warnings;

  if let Some(path) = &cfg.repo_status {
    let overrides = lookup::load_repo_status(Path::new(path))?;
    input.repository_status = lookup::merge_repo_status(std::mem::take(&mut input.repository_status), overrides);
  }

  Ok(input)
}
