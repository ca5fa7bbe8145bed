use predicates::prelude::*;
use serde_json::Value;
use test_support::{fixture_arg, report_cmd, stdout_json};

fn person<'a>(report: &'a Value, key: &str) -> &'a Value {
  report["people"]
    .as_array()
    .unwrap()
    .iter()
    .find(|p| p["person"] == key)
    .unwrap_or_else(|| panic!("no person row {}", key))
}

fn month_run(extra: &[&str]) -> Value {
  let activity = fixture_arg("activity.json");
  let tickets = fixture_arg("tickets.json");
  let mut cmd = report_cmd();
  cmd.args(["--activity-file", &activity, "--tickets-file", &tickets, "--month", "2025-08"]);
  cmd.args(extra);
  let out = cmd.output().unwrap();
  assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
  stdout_json(&out)
}

#[test]
fn month_report_from_files() {
  let v = month_run(&[]);

  let window = &v["summary"]["window"];
  assert_eq!(window["label"], "2025-08");
  assert_eq!(window["start"], "2025-08-01T00:00:00Z");
  assert_eq!(window["end"], "2025-08-31T23:59:59Z");
  assert_eq!(window["window_days"], 31);

  // bob's July commit falls outside the window
  let totals = &v["summary"]["totals"];
  assert_eq!(totals["commits"], 4);
  assert_eq!(totals["people"], 2);
  assert_eq!(totals["tickets"], 3);
  assert_eq!(totals["tickets_closed"], 1);
  assert_eq!(totals["unmatched_tickets"], 1);

  let alice = person(&v, "alice");
  assert_eq!(alice["display_name"], "Alice Smith");
  assert_eq!(alice["data_sources"], "github_and_tickets");
  assert_eq!(alice["activity_score"], 9.0);
  assert_eq!(alice["pr_merge_rate"], 0.5);
  assert_eq!(alice["avg_resolution_time_hours"], 48.0);
  assert_eq!(alice["avg_first_response_time_hours"], 1.0);
  assert_eq!(alice["avg_pr_size"], 25.0);
  assert_eq!(alice["ticket_types"]["Bug"], 1);
  assert_eq!(alice["assignee_aliases"], serde_json::json!(["Alice"]));

  let bob = person(&v, "bob");
  assert_eq!(bob["data_sources"], "github_only");
  assert_eq!(bob["activity_score"], 1.0);

  let unmatched = person(&v, "(unmatched)");
  assert_eq!(unmatched["tickets_assigned"], 1);
  assert_eq!(unmatched["tickets_medium_priority"], 1);

  let top = v["summary"]["top_contributors"].as_array().unwrap();
  assert_eq!(top.len(), 2);
  assert_eq!(top[0]["person"], "alice");
  assert_eq!(top[0]["rank"], 1);

  assert_eq!(v["tickets"][0]["status"], "closed");
  assert_eq!(v["tickets"][0]["resolved_person"], "alice");
  assert_eq!(v["tickets"][2]["matched_by"], "no_candidate");
  assert_eq!(v["warnings"], serde_json::json!([]));
}

#[test]
fn user_mapping_and_repo_status_are_applied() {
  let mapping = fixture_arg("user_mapping.json");
  let status = fixture_arg("repo_status.json");
  let v = month_run(&["--user-mapping", &mapping, "--repo-status", &status]);

  let q = &v["match_quality"];
  assert_eq!(q["matched"], 2);
  assert_eq!(q["github_only"], 0);
  assert_eq!(q["tickets_only"], 0);
  assert_eq!(person(&v, "bob")["tickets_assigned"], 1);
  assert_eq!(v["tickets"][2]["matched_by"], "manual");

  let repos: Vec<&str> = v["repositories"].as_array().unwrap().iter().map(|r| r["name"].as_str().unwrap()).collect();
  assert_eq!(repos, vec!["api", "legacy", "web"]);
  assert_eq!(v["summary"]["totals"]["archived_repositories"], 1);
  assert_eq!(v["repositories"][1]["commits"], 0);
}

#[test]
fn malformed_rows_surface_as_warnings() {
  let activity = fixture_arg("activity.json");
  let tickets = fixture_arg("tickets_malformed.json");
  let out = report_cmd()
    .args(["--activity-file", &activity, "--tickets-file", &tickets, "--month", "2025-08"])
    .output()
    .unwrap();
  assert!(out.status.success());
  let v = stdout_json(&out);

  let kinds: Vec<&str> = v["warnings"].as_array().unwrap().iter().map(|w| w["kind"].as_str().unwrap()).collect();
  assert_eq!(kinds, vec!["dropped_row", "malformed_date"]);
  assert_eq!(v["tickets"].as_array().unwrap().len(), 1);
  assert_eq!(v["tickets"][0]["status"], "closed");
  assert_eq!(v["tickets"][0]["resolution_hours"], Value::Null);
  assert_eq!(v["tickets"][0]["flags"], serde_json::json!(["malformed_closed_at"]));
}

#[test]
fn report_can_be_written_to_a_file() {
  let td = test_support::tempdir();
  let path = td.path().join("report.json");
  let activity = fixture_arg("activity.json");
  report_cmd()
    .args(["--activity-file", &activity, "--days-back", "14", "--out", path.to_str().unwrap()])
    .assert()
    .success()
    .stdout(predicate::str::is_empty());

  let v: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
  assert_eq!(v["summary"]["window"]["label"], "last 14 days");
  assert_eq!(v["summary"]["window"]["window_days"], 14);
  assert_eq!(v["summary"]["window"]["start"], "2025-08-01T12:00:00Z");
  // 2025-08-02 .. 2025-08-07 records only
  assert_eq!(v["summary"]["totals"]["commits"], 4);
  assert_eq!(v["summary"]["totals"]["tickets"], 0);
}

#[test]
fn output_dir_gets_a_timestamped_report() {
  let td = test_support::tempdir();
  let activity = fixture_arg("activity.json");
  report_cmd()
    .env("OUTPUT_DIR", td.path())
    .args(["--activity-file", &activity, "--month", "2025-08"])
    .assert()
    .success()
    .stdout(predicate::str::is_empty());

  let path = td.path().join("team_metrics_20250815_120000.json");
  let v: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
  assert_eq!(v["summary"]["totals"]["commits"], 4);
  assert_eq!(v["ranking"]["rows"][0]["person"], "alice");
}

#[test]
fn huge_days_back_is_rejected() {
  let activity = fixture_arg("activity.json");
  report_cmd()
    .args(["--activity-file", &activity, "--days-back", "200000000"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("out of range"));
}

#[test]
fn reruns_produce_identical_stdout() {
  let activity = fixture_arg("activity.json");
  let tickets = fixture_arg("tickets.json");
  let run = || {
    report_cmd()
      .args(["--activity-file", &activity, "--tickets-file", &tickets, "--month", "2025-08"])
      .output()
      .unwrap()
      .stdout
  };
  assert_eq!(run(), run());
}

#[test]
fn conflicting_windows_fail() {
  let activity = fixture_arg("activity.json");
  report_cmd()
    .args(["--activity-file", &activity, "--month", "2025-08", "--for", "last week"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("Ambiguous time selection"));
}

#[test]
fn missing_activity_source_fails() {
  report_cmd()
    .args(["--month", "2025-08"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("no activity source"));
}

#[test]
fn activity_outside_the_window_is_a_structural_error() {
  let activity = fixture_arg("activity.json");
  report_cmd()
    .args(["--activity-file", &activity, "--month", "2024-01"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("no input records"));
}

#[test]
fn schema_violations_name_the_file() {
  let td = test_support::tempdir();
  let path = td.path().join("bad.json");
  std::fs::write(&path, r#"[{"author_login": "alice", "kind": "push", "timestamp": "2025-08-02T10:00:00Z"}]"#).unwrap();
  report_cmd()
    .args(["--activity-file", path.to_str().unwrap(), "--month", "2025-08"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("bad.json"));
}
