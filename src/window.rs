// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Resolve the reporting window (month, natural-language phrase, explicit bounds or trailing days) to UTC bounds
// role: config/window
// inputs: WindowSpec from the CLI, optional "now" override
// outputs: ReportWindow { label, start, end } with window_days and containment checks
// invariants:
// - All bounds are UTC; the window is closed on both ends
// - window_days is the ceiling of the span in days and never below 1
// - Natural-language phrases never produce a window ending after "now"
// errors: Malformed month/bounds/phrases bail with the offending flag named
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_english::{parse_duration, Interval};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use two_timer::{parse as parse_natural, Config as NaturalConfig};

static RE_LAST_WEEKDAY: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^last\s+(monday|tuesday|wednesday|thursday|friday|saturday|sunday)$").unwrap());

#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub enum WindowSpec {
  Month { ym: String },
  ForPhrase { phrase: String },
  SinceUntil { since: String, until: String },
  DaysBack { days: u32 },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReportWindow {
  pub label: String,
  pub start: DateTime<Utc>,
  pub end: DateTime<Utc>,
}

impl ReportWindow {
  pub fn window_days(&self) -> u32 {
    let secs = (self.end - self.start).num_seconds().max(0);
    let days = (secs + 86_399) / 86_400;
    u32::try_from(days).unwrap_or(u32::MAX).max(1)
  }

  pub fn contains(&self, at: DateTime<Utc>) -> bool {
    self.start <= at && at <= self.end
  }

  pub fn start_iso(&self) -> String {
    self.start.format("%Y-%m-%dT%H:%M:%SZ").to_string()
  }

  pub fn end_iso(&self) -> String {
    self.end.format("%Y-%m-%dT%H:%M:%SZ").to_string()
  }
}

/// Parse `--now-override`: RFC3339 or a naive `%Y-%m-%dT%H:%M:%S` taken as UTC.
pub fn parse_now_override(s: Option<&str>) -> Option<DateTime<Utc>> {
  s.and_then(|raw| {
    DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.with_timezone(&Utc)).or_else(|| {
      NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").ok().map(|ndt| Utc.from_utc_datetime(&ndt))
    })
  })
}

pub fn resolve_window(spec: &WindowSpec, now: Option<DateTime<Utc>>) -> Result<ReportWindow> {
  let now = now.unwrap_or_else(Utc::now);

  let (label, start, end) = match spec {
    WindowSpec::Month { ym } => {
      let (start, next) = month_bounds(ym)?;
      (ym.clone(), start, next - Duration::seconds(1))
    }
    WindowSpec::ForPhrase { phrase } => {
      let (start, end) = for_phrase_bounds(phrase, now)?;
      (phrase.trim().to_lowercase(), start, end)
    }
    WindowSpec::SinceUntil { since, until } => {
      let start = parse_bound(since).with_context(|| format!("parsing --since '{}'", since))?;
      let end = parse_bound(until).with_context(|| format!("parsing --until '{}'", until))?;
      (format!("{}..{}", since, until), start, end)
    }
    WindowSpec::DaysBack { days } => {
      if *days == 0 {
        bail!("--days-back must be at least 1");
      }
      (format!("last {} days", days), days_before(now, i64::from(*days))?, now)
    }
  };

  if end < start {
    bail!("window end {} is before start {}", end, start);
  }

  Ok(ReportWindow { label, start, end })
}

/// First instant of `YYYY-MM` and of the following month.
pub fn month_bounds(year_month: &str) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
  let parts: Vec<&str> = year_month.split('-').collect();

  if parts.len() != 2 {
    bail!("invalid --month, expected YYYY-MM");
  }
  let y: i32 = parts[0].parse().context("parsing year in --month")?;
  let m: u32 = parts[1].parse().context("parsing month in --month")?;

  if !(1..=12).contains(&m) {
    bail!("invalid month in --month");
  }
  let (next_y, next_m) = if m == 12 { (y.checked_add(1).context("year in --month out of range")?, 1) } else { (y, m + 1) };

  Ok((day_start(y, m, 1)?, day_start(next_y, next_m, 1)?))
}

fn days_before(now: DateTime<Utc>, days: i64) -> Result<DateTime<Utc>> {
  seconds_before(now, days.saturating_mul(86_400))
}

fn seconds_before(now: DateTime<Utc>, secs: i64) -> Result<DateTime<Utc>> {
  Duration::try_seconds(secs)
    .and_then(|d| now.checked_sub_signed(d))
    .with_context(|| format!("window reaching {} seconds back is out of range", secs))
}

fn day_start(y: i32, m: u32, d: u32) -> Result<DateTime<Utc>> {
  let date = NaiveDate::from_ymd_opt(y, m, d).with_context(|| format!("invalid date {y:04}-{m:02}-{d:02}"))?;
  Ok(Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN)))
}

fn midnight(dt: DateTime<Utc>) -> DateTime<Utc> {
  Utc.from_utc_datetime(&dt.date_naive().and_time(chrono::NaiveTime::MIN))
}

/// `--since` / `--until`: RFC3339, naive `%Y-%m-%dT%H:%M:%S` (UTC) or a bare date.
fn parse_bound(raw: &str) -> Result<DateTime<Utc>> {
  let s = raw.trim();
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Ok(dt.with_timezone(&Utc));
  }
  if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
    return Ok(Utc.from_utc_datetime(&ndt));
  }
  let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").context("expected RFC3339, YYYY-MM-DDTHH:MM:SS or YYYY-MM-DD")?;
  day_start(date.year(), date.month(), date.day())
}

fn for_phrase_bounds(input: &str, now: DateTime<Utc>) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
  let phrase = input.trim().to_lowercase();

  if phrase == "today" {
    return Ok((midnight(now), now));
  }

  if phrase == "yesterday" {
    return Ok((days_before(now, 1)?, now));
  }

  // Previous calendar week, Monday through Sunday
  if phrase == "last week" {
    let this_week = days_before(midnight(now), i64::from(now.weekday().num_days_from_monday()))?;
    return Ok((days_before(this_week, 7)?, this_week - Duration::seconds(1)));
  }

  if phrase == "last month" {
    let (y, m) = if now.month() == 1 { (now.year() - 1, 12) } else { (now.year(), now.month() - 1) };
    return Ok((day_start(y, m, 1)?, day_start(now.year(), now.month(), 1)? - Duration::seconds(1)));
  }

  // Strictly previous occurrence of the weekday, through now
  if let Some(caps) = RE_LAST_WEEKDAY.captures(&phrase) {
    let target = match &caps[1] {
      "monday" => 0,
      "tuesday" => 1,
      "wednesday" => 2,
      "thursday" => 3,
      "friday" => 4,
      "saturday" => 5,
      _ => 6,
    };
    let today = midnight(now);
    let mut delta = i64::from(today.weekday().num_days_from_monday()) - target;
    if delta <= 0 {
      delta += 7;
    }
    return Ok((days_before(today, delta)?, now));
  }

  // "2 weeks", "3 days ago": always a trailing span ending at now
  if let Ok(interval) = parse_duration(&phrase) {
    let start = match interval {
      Interval::Seconds(secs) => seconds_before(now, i64::from(secs).abs())?,
      Interval::Days(days) => days_before(now, i64::from(days).abs())?,
      Interval::Months(months) => subtract_months(now, months.unsigned_abs())?,
    };
    return Ok((start, now));
  }

  let config = NaturalConfig::new().now(now.naive_utc());
  if let Ok((start, end, _)) = parse_natural(&phrase, Some(config)) {
    let start = Utc.from_utc_datetime(&start);
    let end = Utc.from_utc_datetime(&end).min(now);
    return Ok((start, end));
  }

  bail!("could not understand --for '{}'", input)
}

fn subtract_months(dt: DateTime<Utc>, n: u32) -> Result<DateTime<Utc>> {
  let n = i32::try_from(n).context("month count out of range")?;
  let total = (dt.year() * 12 + dt.month0() as i32)
    .checked_sub(n)
    .context("month arithmetic out of range")?;
  let (y, m) = (total.div_euclid(12), total.rem_euclid(12) as u32 + 1);
  let (ny, nm) = if m == 12 { (y + 1, 1) } else { (y, m + 1) };
  let last_day = day_start(ny, nm, 1)?.date_naive().pred_opt().map(|d| d.day()).unwrap_or(28);
  let date = NaiveDate::from_ymd_opt(y, m, dt.day().min(last_day)).context("month arithmetic out of range")?;
  Ok(Utc.from_utc_datetime(&date.and_time(dt.time())))
}
