//! Playwright browser automation
//!
//! Each test attempt is compiled into one standalone node script that launches
//! a fresh browser and context, runs every step in order and prints a single
//! `E2E_REPORT {json}` line on stdout. Assertions use Playwright's `expect`,
//! so auto-waiting and retrying is left to Playwright.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::str::FromStr;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use tokio::process::Command as TokioCommand;
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};
use crate::locator::{js_regex, js_string};
use crate::spec::{TestSpec, TestStep, UrlMatch};

/// Site under test unless overridden
pub const DEFAULT_BASE_URL: &str = "https://www.saucedemo.com/";

/// Marker prefixing the result line printed by generated scripts
pub const REPORT_MARKER: &str = "E2E_REPORT ";

/// Extra time allowed on top of the test timeout for browser launch/teardown
const LAUNCH_GRACE: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl FromStr for Browser {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" | "safari" => Ok(Browser::Webkit),
            other => Err(E2eError::Config(format!("unknown browser '{}'", other))),
        }
    }
}

/// When to record a Playwright trace
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceMode {
    Off,
    #[default]
    OnFirstRetry,
    On,
}

impl TraceMode {
    /// `attempt` is 1-based
    pub fn enabled_for(&self, attempt: u32) -> bool {
        match self {
            TraceMode::Off => false,
            TraceMode::OnFirstRetry => attempt == 2,
            TraceMode::On => true,
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaywrightConfig {
    /// Base URL that relative `goto` targets and exact URL checks are resolved against
    pub base_url: String,
    pub browser: Browser,
    pub headless: bool,
    /// Timeout for each `expect` assertion
    pub expect_timeout_ms: u64,
    /// Timeout for actions (click, fill, goto). 0 keeps Playwright's default.
    pub action_timeout_ms: u64,
    /// Attribute behind `getByTestId`
    pub test_id_attribute: String,
    /// `node_modules` directory holding `playwright` and `@playwright/test`
    pub node_path: Option<PathBuf>,
    /// Where screenshots and traces are written
    pub artifacts_dir: PathBuf,
    pub screenshot_on_failure: bool,
    pub trace: TraceMode,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            browser: Browser::Chromium,
            headless: true,
            expect_timeout_ms: 5000,
            action_timeout_ms: 0,
            test_id_attribute: "data-test".to_string(),
            node_path: None,
            artifacts_dir: PathBuf::from("test-results/artifacts"),
            screenshot_on_failure: true,
            trace: TraceMode::OnFirstRetry,
        }
    }
}

/// Output locations for one test attempt
#[derive(Debug, Clone)]
pub struct AttemptArtifacts {
    pub dir: PathBuf,
    pub failure_screenshot: Option<PathBuf>,
    pub trace: Option<PathBuf>,
}

impl AttemptArtifacts {
    pub fn for_attempt(config: &PlaywrightConfig, spec: &TestSpec, attempt: u32) -> Self {
        let dir = config
            .artifacts_dir
            .join(slug(&spec.full_name()))
            .join(format!("attempt-{}", attempt));
        Self {
            failure_screenshot: config
                .screenshot_on_failure
                .then(|| dir.join("failure.png")),
            trace: config.trace.enabled_for(attempt).then(|| dir.join("trace.zip")),
            dir,
        }
    }
}

/// What a generated script reports back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptReport {
    pub success: bool,
    /// 0-based index of the step that failed
    #[serde(default)]
    pub failed_step: Option<usize>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub screenshot: Option<PathBuf>,
    #[serde(default)]
    pub trace: Option<PathBuf>,
}

/// Playwright browser handle
pub struct PlaywrightHandle {
    config: PlaywrightConfig,
}

impl PlaywrightHandle {
    /// Create a new Playwright handle
    pub fn new(mut config: PlaywrightConfig) -> E2eResult<Self> {
        Self::check_playwright_installed()?;
        std::fs::create_dir_all(&config.artifacts_dir)?;
        // Scripts run from a temp dir, so artifact and module paths must be absolute
        config.artifacts_dir = std::fs::canonicalize(&config.artifacts_dir)?;
        config.node_path = resolve_node_path(config.node_path.take(), &std::env::current_dir()?)?;
        match &config.node_path {
            Some(path) => debug!("Loading Playwright from {}", path.display()),
            None => warn!("No node_modules with Playwright found; relying on node's global lookup"),
        }
        Ok(Self { config })
    }

    /// Check if Playwright is installed
    fn check_playwright_installed() -> E2eResult<()> {
        let output = Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    /// Run one attempt of a test in a fresh browser
    pub async fn run_spec(&self, spec: &TestSpec, attempt: u32) -> E2eResult<ScriptReport> {
        let artifacts = AttemptArtifacts::for_attempt(&self.config, spec, attempt);
        std::fs::create_dir_all(&artifacts.dir)?;

        let script = build_script(&self.config, spec, &artifacts);
        self.run_script(spec, &script).await
    }

    /// Execute a generated script via node and collect its report
    pub async fn run_script(&self, spec: &TestSpec, script: &str) -> E2eResult<ScriptReport> {
        let temp_dir = tempfile::tempdir()?;
        let script_path = temp_dir.path().join("test.js");
        std::fs::write(&script_path, script)?;

        debug!("Running Playwright script for '{}': {}", spec.name, script_path.display());

        let mut cmd = node_command(&self.config, &script_path, temp_dir.path());
        let limit = Duration::from_millis(spec.timeout_ms) + LAUNCH_GRACE;
        let output = tokio::time::timeout(limit, cmd.output())
            .await
            .map_err(|_| E2eError::Timeout(format!("'{}' after {} ms", spec.name, limit.as_millis())))??;

        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines().filter(|l| !l.starts_with(REPORT_MARKER)) {
            info!("[{}] {}", spec.name, line);
        }

        match parse_report(&stdout)? {
            Some(report) => Ok(report),
            None => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                warn!("No report from script for '{}' (status: {})", spec.name, output.status);
                Err(E2eError::Playwright(format!(
                    "Script failed:\nstdout: {}\nstderr: {}",
                    stdout, stderr
                )))
            }
        }
    }
}

/// `node` invocation for a script written to `work_dir`
fn node_command(config: &PlaywrightConfig, script_path: &Path, work_dir: &Path) -> TokioCommand {
    let mut cmd = TokioCommand::new("node");
    cmd.arg(script_path)
        .current_dir(work_dir)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(node_path) = &config.node_path {
        cmd.env("NODE_PATH", node_path);
    }
    cmd
}

/// Pick the `node_modules` directory scripts load Playwright from.
///
/// A configured path is made absolute against `cwd`. Otherwise `cwd` and its
/// ancestors are searched for `node_modules/playwright`, then `npm root`.
pub fn resolve_node_path(configured: Option<PathBuf>, cwd: &Path) -> E2eResult<Option<PathBuf>> {
    if let Some(path) = configured {
        let path = std::fs::canonicalize(cwd.join(&path)).map_err(|e| {
            E2eError::Config(format!("node_path '{}': {}", path.display(), e))
        })?;
        return Ok(Some(path));
    }
    Ok(find_node_modules(cwd).or_else(|| npm_root(cwd)))
}

/// Nearest `node_modules` at or above `start` that contains `playwright`
pub fn find_node_modules(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join("node_modules"))
        .find(|dir| dir.join("playwright").is_dir())
}

fn npm_root(cwd: &Path) -> Option<PathBuf> {
    let output = Command::new("npm")
        .arg("root")
        .current_dir(cwd)
        .stderr(Stdio::null())
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let root = PathBuf::from(String::from_utf8_lossy(&output.stdout).trim());
    root.join("playwright").is_dir().then_some(root)
}

/// Find the report line in script output
pub fn parse_report(stdout: &str) -> E2eResult<Option<ScriptReport>> {
    stdout
        .lines()
        .rev()
        .find_map(|line| line.strip_prefix(REPORT_MARKER))
        .map(|json| serde_json::from_str(json.trim()).map_err(E2eError::from))
        .transpose()
}

/// Resolve a `goto` target or expected URL against the base URL
pub fn resolve_url(base_url: &str, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("{}/{}", base_url.trim_end_matches('/'), url.trim_start_matches('/'))
    }
}

/// Build the Playwright script for one test attempt
pub fn build_script(config: &PlaywrightConfig, spec: &TestSpec, artifacts: &AttemptArtifacts) -> String {
    let mut script = String::new();

    // Header
    let _ = write!(script, r#"
const {{ chromium, firefox, webkit, selectors }} = require('playwright');
const {{ expect }} = require('@playwright/test');

(async () => {{
  selectors.setTestIdAttribute({test_id});
  const browser = await {browser}.launch({{ headless: {headless} }});
  const context = await browser.newContext({{
    viewport: {{ width: {width}, height: {height} }}
  }});
  const page = await context.newPage();
  const check = expect.configure({{ timeout: {expect_timeout} }});
  const report = {{ success: false, failed_step: null, error: null, screenshot: null, trace: null }};
  let step = 0;
"#,
        test_id = js_string(&config.test_id_attribute),
        browser = config.browser.as_str(),
        headless = config.headless,
        width = spec.viewport.width,
        height = spec.viewport.height,
        expect_timeout = config.expect_timeout_ms,
    );

    if config.action_timeout_ms > 0 {
        let _ = writeln!(script, "  page.setDefaultTimeout({});", config.action_timeout_ms);
    }
    if artifacts.trace.is_some() {
        script.push_str("  await context.tracing.start({ screenshots: true, snapshots: true });\n");
    }

    script.push_str("\n  const steps = (async () => {\n");
    for (i, step) in spec.steps.iter().enumerate() {
        let _ = writeln!(script, "    // Step {}: {}", i + 1, step.describe().replace('\n', " "));
        let _ = writeln!(script, "    step = {};", i);
        let _ = writeln!(script, "    {}", step_to_js(config, step, artifacts));
    }

    // The deadline fails whichever step is running, so the report still names it
    let _ = write!(script, r#"  }})();
  steps.catch(() => {{}});
  let timer;
  const deadline = new Promise((_, reject) => {{
    timer = setTimeout(() => reject(new Error({timeout_message})), {timeout_ms});
  }});

  try {{
    await Promise.race([steps, deadline]);
    report.success = true;
  }} catch (error) {{"#,
        timeout_message = js_string(&format!("Test timeout of {}ms exceeded", spec.timeout_ms)),
        timeout_ms = spec.timeout_ms,
    );
    script.push_str(r#"
    report.failed_step = step;
    report.error = String((error && error.message) || error);
"#);

    if let Some(path) = &artifacts.failure_screenshot {
        let path = js_string(&path.to_string_lossy());
        let _ = writeln!(
            script,
            "    try {{ await page.screenshot({{ path: {path}, fullPage: true }}); report.screenshot = {path}; }} catch (_) {{}}",
        );
    }

    script.push_str("  } finally {\n    clearTimeout(timer);\n");
    if let Some(path) = &artifacts.trace {
        let path = js_string(&path.to_string_lossy());
        let _ = writeln!(
            script,
            "    try {{ await context.tracing.stop({{ path: {path} }}); report.trace = {path}; }} catch (_) {{}}",
        );
    }

    // Footer
    let _ = write!(script, r#"    await browser.close().catch(() => {{}});
    console.log({marker} + JSON.stringify(report));
  }}
}})();
"#,
        marker = js_string(REPORT_MARKER),
    );

    script
}

/// Convert a step to JavaScript code
fn step_to_js(config: &PlaywrightConfig, step: &TestStep, artifacts: &AttemptArtifacts) -> String {
    match step {
        TestStep::Goto { url } => {
            format!("await page.goto({});", js_string(&resolve_url(&config.base_url, url)))
        }
        TestStep::Fill { locator, value } => {
            format!("await {}.fill({});", locator.to_js(), js_string(value))
        }
        TestStep::Click { locator } => format!("await {}.click();", locator.to_js()),
        TestStep::ExpectUrl { url } => {
            let expected = match url {
                UrlMatch::Exact(url) => js_string(&resolve_url(&config.base_url, url)),
                UrlMatch::Pattern { pattern } => js_regex(pattern, false),
            };
            format!("await check(page).toHaveURL({});", expected)
        }
        TestStep::ExpectTitle { title } => {
            format!("await check(page).toHaveTitle({});", title.to_js())
        }
        TestStep::ExpectVisible { locator } => {
            format!("await check({}).toBeVisible();", locator.to_js())
        }
        TestStep::ExpectHidden { locator } => {
            format!("await check({}).not.toBeVisible();", locator.to_js())
        }
        TestStep::ExpectEnabled { locator } => {
            format!("await check({}).toBeEnabled();", locator.to_js())
        }
        TestStep::ExpectText { locator, text } => {
            format!("await check({}).toHaveText({});", locator.to_js(), js_string(text))
        }
        TestStep::ExpectCount { locator, count } => {
            format!("await check({}).toHaveCount({});", locator.to_js(), count)
        }
        TestStep::Screenshot { name, full_page } => {
            let path = artifacts.dir.join(format!("{}.png", name));
            format!(
                "await page.screenshot({{ path: {}, fullPage: {} }});",
                js_string(&path.to_string_lossy()),
                full_page
            )
        }
        TestStep::Log { message } => {
            format!("console.log({});", js_string(&format!("[TEST] {}", message)))
        }
    }
}

/// Filesystem-safe name for a test
pub fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}
