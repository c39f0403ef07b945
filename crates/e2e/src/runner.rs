//! Main test runner: selection, parallel execution, retries and results

use std::collections::HashSet;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::RunnerConfig;
use crate::error::{E2eError, E2eResult};
use crate::playwright::{PlaywrightHandle, ScriptReport};
use crate::scenarios;
use crate::site::SiteProbe;
use crate::spec::TestSpec;

/// Step a test stopped at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedStep {
    /// 1-based, as shown in the generated script comments
    pub index: usize,
    pub description: String,
}

/// Result of running a single test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub suite: String,
    pub success: bool,
    /// Passed, but only after a retry
    pub flaky: bool,
    pub attempts: u32,
    pub duration_ms: u64,
    pub failed_step: Option<FailedStep>,
    pub error: Option<String>,
    pub screenshot: Option<PathBuf>,
    pub trace: Option<PathBuf>,
}

impl TestResult {
    /// Build a result from the outcome of one attempt
    pub fn from_attempt(
        spec: &TestSpec,
        attempt: u32,
        duration_ms: u64,
        outcome: E2eResult<ScriptReport>,
    ) -> Self {
        let mut result = Self {
            name: spec.name.clone(),
            suite: spec.suite.clone(),
            success: false,
            flaky: false,
            attempts: attempt,
            duration_ms,
            failed_step: None,
            error: None,
            screenshot: None,
            trace: None,
        };

        match outcome {
            Ok(report) if report.success => {
                result.success = true;
                result.flaky = attempt > 1;
                result.trace = report.trace;
            }
            Ok(report) => {
                let failed_step = report.failed_step.and_then(|i| {
                    spec.steps.get(i).map(|step| FailedStep {
                        index: i + 1,
                        description: step.describe(),
                    })
                });
                let reason = report.error.unwrap_or_else(|| "unknown error".to_string());
                result.error = Some(match &failed_step {
                    Some(step) => E2eError::StepFailed {
                        step: format!("#{} {}", step.index, step.description),
                        reason,
                    }
                    .to_string(),
                    None => reason,
                });
                result.failed_step = failed_step;
                result.screenshot = report.screenshot;
                result.trace = report.trace;
            }
            Err(e) => {
                result.error = Some(e.to_string());
            }
        }

        result
    }

    pub fn full_name(&self) -> String {
        if self.suite.is_empty() {
            self.name.clone()
        } else {
            format!("{} > {}", self.suite, self.name)
        }
    }
}

/// Result of running all tests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub flaky: usize,
    pub duration_ms: u64,
    pub results: Vec<TestResult>,
}

impl TestSuiteResult {
    pub fn summarize(started_at: DateTime<Utc>, duration_ms: u64, results: Vec<TestResult>) -> Self {
        let passed = results.iter().filter(|r| r.success).count();
        let flaky = results.iter().filter(|r| r.flaky).count();
        Self {
            started_at,
            total: results.len(),
            passed,
            failed: results.len() - passed,
            flaky,
            duration_ms,
            results,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// Main E2E test runner
pub struct TestRunner {
    config: RunnerConfig,
}

impl Default for TestRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRunner {
    /// Create a new test runner with default configuration
    pub fn new() -> Self {
        Self::with_config(RunnerConfig::default())
    }

    /// Create a test runner with custom configuration
    pub fn with_config(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// Built-in scenarios followed by YAML specs from the specs directory
    pub fn collect_specs(&self) -> E2eResult<Vec<TestSpec>> {
        let mut specs = scenarios::all();

        if let Some(dir) = &self.config.specs_dir {
            if dir.is_dir() {
                let loaded = TestSpec::load_all(dir)?;
                debug!("Loaded {} spec(s) from {}", loaded.len(), dir.display());
                specs.extend(loaded);
            } else {
                warn!("Specs directory {} does not exist", dir.display());
            }
        }

        let mut seen = HashSet::new();
        for spec in &specs {
            if !seen.insert(spec.full_name()) {
                return Err(E2eError::invalid_spec(&spec.name, "duplicate test name"));
            }
        }

        Ok(specs)
    }

    /// Apply the configured tag and grep filters
    pub fn select(&self, specs: Vec<TestSpec>) -> Vec<TestSpec> {
        specs
            .into_iter()
            .filter(|s| match &self.config.tag {
                Some(tag) => s.tags.iter().any(|t| t == tag),
                None => true,
            })
            .filter(|s| match &self.config.grep {
                Some(text) => s.full_name().to_lowercase().contains(&text.to_lowercase()),
                None => true,
            })
            .collect()
    }

    /// Run every selected test
    pub async fn run_all(&self) -> E2eResult<TestSuiteResult> {
        let specs = self.select(self.collect_specs()?);
        self.run_specs(specs).await
    }

    /// Run a specific test by name or `suite > name`
    pub async fn run_test(&self, name: &str) -> E2eResult<TestResult> {
        let spec = self
            .collect_specs()?
            .into_iter()
            .find(|s| s.name == name || s.full_name() == name)
            .ok_or_else(|| E2eError::TestNotFound(name.to_string()))?;

        let mut suite = self.run_specs(vec![spec]).await?;
        suite
            .results
            .pop()
            .ok_or_else(|| E2eError::TestNotFound(name.to_string()))
    }

    /// Run a list of test specs, each in its own browser
    pub async fn run_specs(&self, specs: Vec<TestSpec>) -> E2eResult<TestSuiteResult> {
        let started_at = Utc::now();
        let start = Instant::now();

        for spec in &specs {
            spec.validate()?;
        }

        if specs.is_empty() {
            warn!("No tests selected");
            return Ok(TestSuiteResult::summarize(started_at, 0, Vec::new()));
        }

        if self.config.probe.enabled {
            SiteProbe::new(&self.config.playwright.base_url, self.config.probe.clone())?
                .wait_until_reachable()
                .await?;
        }

        let handle = Arc::new(PlaywrightHandle::new(self.config.playwright.clone())?);
        let workers = self.config.effective_workers();
        let retries = self.config.effective_retries();

        info!("Running {} test(s) using {} worker(s)...", specs.len(), workers);

        let results = run_pool(specs, workers, retries, move |spec, attempt| {
            let handle = Arc::clone(&handle);
            async move { handle.run_spec(&spec, attempt).await }
        })
        .await?;

        let duration_ms = start.elapsed().as_millis() as u64;
        let suite = TestSuiteResult::summarize(started_at, duration_ms, results);

        info!("");
        info!(
            "Test Results: {} passed ({} flaky), {} failed ({} ms)",
            suite.passed, suite.flaky, suite.failed, suite.duration_ms
        );

        Ok(suite)
    }

    /// Write test results to JSON file
    pub fn write_results(&self, results: &TestSuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

/// Run `specs` on at most `workers` concurrent tasks.
///
/// `run_attempt` executes one attempt (1-based) of a test. Results come back
/// in the order of `specs`, whatever order the tasks finish in.
async fn run_pool<F, Fut>(
    specs: Vec<TestSpec>,
    workers: usize,
    retries: u32,
    run_attempt: F,
) -> E2eResult<Vec<TestResult>>
where
    F: Fn(Arc<TestSpec>, u32) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = E2eResult<ScriptReport>> + Send + 'static,
{
    let run_attempt = Arc::new(run_attempt);
    let permits = Arc::new(Semaphore::new(workers.max(1)));

    let total = specs.len();
    let mut tasks = JoinSet::new();
    for (index, spec) in specs.into_iter().enumerate() {
        let run_attempt = Arc::clone(&run_attempt);
        let permits = Arc::clone(&permits);
        let spec = Arc::new(spec);
        tasks.spawn(async move {
            // The semaphore is never closed
            let _permit = permits.acquire_owned().await.ok();
            (index, run_with_retries(run_attempt.as_ref(), &spec, retries).await)
        });
    }

    let mut slots: Vec<Option<TestResult>> = vec![None; total];
    while let Some(joined) = tasks.join_next().await {
        let (index, result) = joined
            .map_err(|e| E2eError::Playwright(format!("test task failed: {}", e)))?;
        slots[index] = Some(result);
    }
    Ok(slots.into_iter().flatten().collect())
}

/// Run one test, retrying failed attempts up to `retries` times
async fn run_with_retries<F, Fut>(run_attempt: &F, spec: &Arc<TestSpec>, retries: u32) -> TestResult
where
    F: Fn(Arc<TestSpec>, u32) -> Fut,
    Fut: Future<Output = E2eResult<ScriptReport>>,
{
    let max_attempts = retries + 1;
    let mut attempt = 1;

    loop {
        let start = Instant::now();
        let outcome = run_attempt(Arc::clone(spec), attempt).await;
        let duration_ms = start.elapsed().as_millis() as u64;
        let result = TestResult::from_attempt(spec, attempt, duration_ms, outcome);

        if result.success {
            if result.flaky {
                warn!("✓ {} passed on attempt {} (flaky, {} ms)", result.full_name(), attempt, duration_ms);
            } else {
                info!("✓ {} ({} ms)", result.full_name(), duration_ms);
            }
            return result;
        }

        let reason = result.error.as_deref().unwrap_or("unknown error");
        if attempt >= max_attempts {
            error!("✗ {} - {}", result.full_name(), reason);
            return result;
        }

        warn!("Retrying {} (attempt {} of {}): {}", result.full_name(), attempt + 1, max_attempts, reason);
        attempt += 1;
    }
}
