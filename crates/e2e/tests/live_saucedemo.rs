//! Live run of the built-in suites against www.saucedemo.com
//!
//! Needs network access, node and Playwright browsers, so it is opt-in:
//!
//!   SAUCEDEMO_LIVE=1 cargo test --package saucedemo-e2e --test live_saucedemo

use saucedemo_e2e::{scenarios, RunnerConfig, TestRunner};

fn live_enabled() -> bool {
    std::env::var("SAUCEDEMO_LIVE").as_deref() == Ok("1")
}

/// Runner writing into a temp dir that lives as long as the returned guard
fn live_runner() -> (tempfile::TempDir, TestRunner) {
    let output = tempfile::tempdir().expect("create output dir");
    let mut config = RunnerConfig::default();
    config.apply_env().expect("valid environment");
    config.playwright.artifacts_dir = output.path().join("artifacts");
    config.output_dir = output.path().to_path_buf();
    (output, TestRunner::with_config(config))
}

#[tokio::test]
async fn sauce_demo_e2e_suite_passes() {
    if !live_enabled() {
        eprintln!("skipping live Sauce Demo test");
        return;
    }

    let (_output, runner) = live_runner();
    let suite = runner
        .run_specs(scenarios::sauce_demo_e2e())
        .await
        .expect("suite should run");

    runner.write_results(&suite).expect("write results");
    for result in &suite.results {
        assert!(result.success, "{} failed: {:?}", result.full_name(), result.error);
    }
    assert_eq!(suite.total, 2);
}

#[tokio::test]
async fn smoke_suite_passes() {
    if !live_enabled() {
        eprintln!("skipping live Sauce Demo test");
        return;
    }

    let (_output, runner) = live_runner();
    let suite = runner
        .run_specs(scenarios::smoke_tests())
        .await
        .expect("suite should run");

    for result in &suite.results {
        assert!(result.success, "{} failed: {:?}", result.full_name(), result.error);
    }
    assert_eq!(suite.passed, 6);
}

#[tokio::test]
async fn wrong_expectation_reports_failed_step() {
    if !live_enabled() {
        eprintln!("skipping live Sauce Demo test");
        return;
    }

    let spec = scenarios::SpecBuilder::new("badge shows two after one click")
        .login(scenarios::STANDARD_USER, scenarios::PASSWORD)
        .click(saucedemo_e2e::Locator::button("Add to cart").first())
        .expect_text(saucedemo_e2e::Locator::test_id("shopping-cart-badge"), "2")
        .build();

    let (_output, runner) = live_runner();
    let result = runner
        .run_specs(vec![spec])
        .await
        .expect("suite should run")
        .results
        .remove(0);

    assert!(!result.success);
    assert_eq!(result.failed_step.map(|s| s.index), Some(6));
    assert!(result.screenshot.is_some());
}
