use serde_json::Value;
use test_support::{fixture_arg, report_cmd, stdout_json};

#[test]
fn split_tables_write_manifest_and_pointer() {
  let td = test_support::tempdir();
  let dir = td.path().join("out");
  let activity = fixture_arg("activity.json");
  let tickets = fixture_arg("tickets.json");

  let out = report_cmd()
    .args([
      "--activity-file",
      &activity,
      "--tickets-file",
      &tickets,
      "--month",
      "2025-08",
      "--split-tables",
      "--out",
      dir.to_str().unwrap(),
    ])
    .output()
    .unwrap();
  assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

  let pointer = stdout_json(&out);
  assert_eq!(pointer["manifest"], "manifest.json");
  assert_eq!(pointer["dir"], dir.to_str().unwrap());

  let manifest: Value = serde_json::from_slice(&std::fs::read(dir.join("manifest.json")).unwrap()).unwrap();
  assert_eq!(manifest["generated_at"], "2025-08-15T12:00:00Z");
  assert_eq!(manifest["window"]["label"], "2025-08");

  let tables = manifest["tables"].as_array().unwrap();
  let names: Vec<&str> = tables.iter().map(|t| t["name"].as_str().unwrap()).collect();
  assert_eq!(names, vec!["summary", "people", "repositories", "tickets", "ranking", "match_quality", "warnings"]);
  for t in tables {
    assert!(dir.join(t["file"].as_str().unwrap()).exists());
  }
  assert_eq!(tables[1]["rows"], 3);
  assert_eq!(tables[3]["rows"], 3);
  assert_eq!(tables[4]["rows"], 2);
  assert_eq!(tables[6]["rows"], 0);

  let people: Value = serde_json::from_slice(&std::fs::read(dir.join("people.json")).unwrap()).unwrap();
  assert_eq!(people[0]["person"], "alice");
  assert_eq!(people[2]["person"], "(unmatched)");

  let ranking: Value = serde_json::from_slice(&std::fs::read(dir.join("ranking.json")).unwrap()).unwrap();
  assert_eq!(ranking["rows"][0]["person"], "alice");
  assert_eq!(ranking["summary"]["top_performer"], "alice");
}
