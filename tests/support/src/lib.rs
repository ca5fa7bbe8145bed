//! test-support: helpers for robust, nextest-friendly tests.
//!
//! Add as a dev-dependency in your top-level `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test_support = { path = "tests/support", features = ["serde"] }
//! ```
//!
//! Then in tests:
//! ```rust
//! use test_support::{init_tracing, fixtures_dir, read_fixture_json};
//!
//! #[test]
//! fn example() {
//!     init_tracing();
//!     let _root = fixtures_dir();
//! }
//! ```

use once_cell::sync::Lazy;
use tracing_subscriber::{fmt, EnvFilter};

use std::path::{Path, PathBuf};

/// Binary under test.
pub const BIN: &str = "team-activity-report";

/// Fixed "now" used by CLI tests so trailing windows are reproducible.
pub const NOW: &str = "2025-08-15T12:00:00Z";

/// Initialize `tracing` once, honoring `RUST_LOG` and writing via the test writer.
///
/// Safe to call from multiple tests; only the first call configures the global subscriber.
pub fn init_tracing() {
    static INIT: Lazy<()> = Lazy::new(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new("warn,test=info"))
            .unwrap();
        // with_test_writer() causes logs to appear alongside failing tests only (cargo/nextest)
        let _ = fmt().with_env_filter(filter).with_test_writer().try_init();
    });
    Lazy::force(&INIT);
}

/// Initialize insta snapshot settings once per test process.
///
/// - Centralizes snapshot files in `tests/snapshots` (relative to the test binary's CWD)
/// - Omits `Expression:` in snapshot headers for cleaner diffs
pub fn init_insta() {
    static INIT: Lazy<()> = Lazy::new(|| {
        let mut settings = insta::Settings::clone_current();
        // Point to the central snapshots directory in the workspace
        settings.set_snapshot_path("../snapshots");
        settings.set_omit_expression(true);
        // Bind settings to the thread for the remainder of the test process by leaking the guard
        let guard = settings.bind_to_scope();
        std::mem::forget(guard);
    });
    Lazy::force(&INIT);
}

/// Return the path to the repository's `tests/fixtures` directory.
///
/// Uses this crate's directory (`tests/support`), so it's stable regardless
/// of the runner's working directory (cargo vs nextest).
pub fn fixtures_dir() -> PathBuf {
    let support = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    support.parent().map(|tests| tests.join("fixtures")).unwrap_or_else(|| support.join("fixtures"))
}

/// Absolute path of a fixture file as a string, ready for CLI arguments.
pub fn fixture_arg<P: AsRef<Path>>(rel_path: P) -> String {
    fixtures_dir().join(rel_path).to_string_lossy().to_string()
}

/// Deserialize a JSON fixture into `T` (enable `serde` feature).
#[cfg(feature = "serde")]
pub fn read_fixture_json<T, P>(rel_path: P) -> T
where
    T: serde::de::DeserializeOwned,
    P: AsRef<Path>,
{
    let path = fixtures_dir().join(rel_path);
    let file = std::fs::File::open(&path)
        .unwrap_or_else(|e| panic!("failed to open fixture {}: {e}", path.display()));
    serde_json::from_reader::<_, T>(file)
        .unwrap_or_else(|e| panic!("failed to parse JSON fixture {}: {e}", path.display()))
}

/// Parse command stdout as JSON, showing stderr on failure.
#[cfg(feature = "serde")]
pub fn stdout_json(out: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&out.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout is not JSON ({e}); stderr:\n{}",
            String::from_utf8_lossy(&out.stderr)
        )
    })
}

/// Create a temp directory that deletes on drop.
pub fn tempdir() -> tempfile::TempDir {
    tempfile::tempdir().expect("create tempdir")
}

/// Run a binary target with `assert_cmd`, returning the ready-to-run `Command`.
///
/// Example:
/// ```no_run
/// use test_support::cmd_bin;
/// use predicates::prelude::*;
///
/// let mut cmd = cmd_bin("my-cli");
/// cmd.arg("--help").assert().success().stdout(predicate::str::contains("Usage"));
/// ```
pub fn cmd_bin(bin: &str) -> assert_cmd::Command {
    init_tracing();
    assert_cmd::Command::cargo_bin(bin).expect("binary target not found")
}

/// The report binary with a pinned clock, quiet logs and the configuration
/// environment cleared so a developer's `.env` or shell cannot leak in.
pub fn report_cmd() -> assert_cmd::Command {
    let mut cmd = cmd_bin(BIN);
    for var in [
        "GITHUB_ORG",
        "GOOGLE_SHEET_ID",
        "GOOGLE_SHEET_NAME",
        "GOOGLE_SHEETS_API_KEY",
        "USER_MAPPING_FILE",
        "DAYS_BACK",
        "OUTPUT_DIR",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd.args(["--now-override", NOW, "--log-level", "warn"]);
    cmd
}
