//! Report writing against a real filesystem

use std::path::PathBuf;

use uiregress_harness::runner::{RunnerConfig, ScenarioOutcome, Status, SuiteResult, TestRunner};
use uiregress_harness::scenario::Scenario;
use uiregress_harness::{Browser, Config, LaunchOptions, WaitPolicy};

const CONFIG: &str = r#"
base_url = "http://127.0.0.1:5000"
headless = true

[credentials]
valid_username = "standard_user"
valid_password = "secret_sauce"
invalid_username = "locked_out_user"
invalid_password = "wrong_password"
"#;

fn runner(report_dir: PathBuf, artifact_dir: PathBuf) -> TestRunner {
    TestRunner::new(RunnerConfig {
        settings: Config::from_toml(CONFIG).unwrap(),
        browsers: vec![Browser::Chromium, Browser::Firefox],
        launch: LaunchOptions::default(),
        wait: WaitPolicy::default(),
        artifact_dir,
        report_dir,
    })
}

#[test]
fn report_round_trips_every_outcome_with_its_identity() {
    let dir = tempfile::tempdir().unwrap();
    let runner = runner(dir.path().join("results"), dir.path().join("artifacts"));

    let settings = Config::from_toml(CONFIG).unwrap();
    let matrix = Scenario::matrix(&settings, &[Browser::Chromium, Browser::Firefox]);
    assert_eq!(matrix.len(), 4);

    let outcomes: Vec<ScenarioOutcome> = matrix
        .into_iter()
        .enumerate()
        .map(|(i, scenario)| ScenarioOutcome {
            scenario,
            status: if i == 3 {
                Status::Failed {
                    reason: "expected error containing 'Username and password do not match'"
                        .to_string(),
                    screenshot: Some(PathBuf::from("artifacts/firefox-invalid.png")),
                }
            } else {
                Status::Passed
            },
            duration_ms: 42,
        })
        .collect();

    let result = SuiteResult::from_outcomes(outcomes, 200);
    assert_eq!(result.passed, 3);
    assert_eq!(result.failed, 1);

    let path = runner.write_report(&result).unwrap();
    let raw = std::fs::read_to_string(path).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();

    assert_eq!(json["total"], 4);
    assert_eq!(json["outcomes"].as_array().unwrap().len(), 4);

    // Every outcome keeps its (browser, scenario) identity and exactly one
    // terminal status.
    for outcome in json["outcomes"].as_array().unwrap() {
        assert!(outcome["scenario"]["browser"].is_string());
        assert!(outcome["scenario"]["name"].is_string());
        assert!(matches!(
            outcome["status"].as_str().unwrap(),
            "passed" | "failed"
        ));
    }
    assert_eq!(
        json["outcomes"][3]["reason"],
        "expected error containing 'Username and password do not match'"
    );
}
