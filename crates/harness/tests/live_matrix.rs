//! Full-matrix run against real browsers
//!
//! Requires `node` with Playwright browsers installed and the workspace
//! built (`cargo build -p uiregress-web`). Run with:
//! `cargo test -p uiregress-harness --test live_matrix -- --ignored`

use std::path::PathBuf;
use std::time::Duration;

use uiregress_harness::runner::RunnerConfig;
use uiregress_harness::server::ServerConfig;
use uiregress_harness::{Browser, Config, LaunchOptions, TestRunner, WaitPolicy};

const CONFIG: &str = r#"
base_url = "http://127.0.0.1:5000"
headless = true

[credentials]
valid_username = "standard_user"
valid_password = "secret_sauce"
invalid_username = "locked_out_user"
invalid_password = "wrong_password"
"#;

#[tokio::test]
#[ignore = "requires node + playwright browsers and a built uiregress-web binary"]
async fn full_matrix_produces_four_passing_outcomes() {
    let scratch = tempfile::tempdir().unwrap();

    let mut runner = TestRunner::new(RunnerConfig {
        settings: Config::from_toml(CONFIG).unwrap(),
        browsers: vec![Browser::Chromium, Browser::Firefox],
        launch: LaunchOptions::default(),
        wait: WaitPolicy::with_timeout(Duration::from_secs(10)),
        artifact_dir: scratch.path().join("artifacts"),
        report_dir: scratch.path().join("results"),
    });

    // Test binaries run from the crate directory.
    runner
        .start_server(ServerConfig {
            binary_path: PathBuf::from("../../target/debug/uiregress-web"),
            static_dir: PathBuf::from("../web/static"),
            ..Default::default()
        })
        .await
        .expect("static server should come up");

    let result = runner.run_all().await.expect("matrix should complete");

    assert_eq!(result.total, 4);
    assert_eq!(result.passed + result.failed, 4);
    assert!(
        result.all_passed(),
        "expected a clean run, got: {:?}",
        result
            .outcomes
            .iter()
            .filter(|o| !o.passed())
            .map(|o| o.scenario.slug())
            .collect::<Vec<_>>()
    );

    let report = runner.write_report(&result).unwrap();
    assert!(report.exists());
}
