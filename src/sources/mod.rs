// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Thin I/O collaborators that produce the core's input records
// role: module/aggregation
// outputs: activity_file (JSON records), github (REST fetch), sheet (ticket rows), lookup (user mapping, repo status)
// invariants: Sources never compute metrics; they load, validate, filter to the window and deduplicate
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

pub mod activity_file;
pub mod github;
pub mod lookup;
pub mod sheet;
