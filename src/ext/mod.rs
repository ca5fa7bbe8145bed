// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Extension traits over third-party types, grouped under `crate::ext`
// role: module/aggregation
// outputs: JsonFetch (dotted-path JSON access used by the GitHub and sheet sources)
// invariants: No side effects; pure extensions only
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

pub mod serde_json;
