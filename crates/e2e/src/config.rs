//! Runner configuration
//!
//! Sources, lowest priority first: built-in defaults, a TOML file, environment
//! variables, then command-line [`Overrides`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{E2eError, E2eResult};
use crate::playwright::{Browser, PlaywrightConfig};
use crate::site::ProbeConfig;

/// Configuration for the test runner
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub playwright: PlaywrightConfig,
    pub probe: ProbeConfig,

    /// Parallel tests. Unset means 1 on CI, otherwise one per CPU.
    pub workers: Option<usize>,

    /// Extra attempts for a failing test. Unset means 2 on CI, otherwise 0.
    pub retries: Option<u32>,

    /// Running under CI
    pub ci: bool,

    /// Directory of additional YAML specs
    pub specs_dir: Option<PathBuf>,

    /// Output directory for results
    pub output_dir: PathBuf,

    /// Only run tests carrying this tag
    pub tag: Option<String>,

    /// Only run tests whose full name contains this text
    pub grep: Option<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            playwright: PlaywrightConfig::default(),
            probe: ProbeConfig::default(),
            workers: None,
            retries: None,
            ci: false,
            specs_dir: None,
            output_dir: PathBuf::from("test-results"),
            tag: None,
            grep: None,
        }
    }
}

impl RunnerConfig {
    /// Load a TOML configuration file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            E2eError::Config(format!("failed to read '{}': {}", path.display(), e))
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) -> E2eResult<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_env_from<F>(&mut self, lookup: F) -> E2eResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("SAUCEDEMO_BASE_URL").filter(|v| !v.is_empty()) {
            self.playwright.base_url = url;
        }
        if let Some(workers) = lookup("E2E_WORKERS") {
            self.workers = Some(parse_number("E2E_WORKERS", &workers)?);
        }
        if let Some(retries) = lookup("E2E_RETRIES") {
            self.retries = Some(parse_number("E2E_RETRIES", &retries)?);
        }
        if let Some(ci) = lookup("CI") {
            self.ci = !matches!(ci.trim().to_ascii_lowercase().as_str(), "" | "0" | "false");
        }
        Ok(())
    }

    /// Number of tests allowed to run at once
    pub fn effective_workers(&self) -> usize {
        let default = if self.ci {
            1
        } else {
            std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
        };
        self.workers.unwrap_or(default).max(1)
    }

    pub fn effective_retries(&self) -> u32 {
        self.retries.unwrap_or(if self.ci { 2 } else { 0 })
    }
}

/// Command-line settings layered over the file and environment
#[derive(Debug, Clone, Default, clap::Args)]
pub struct Overrides {
    /// Directory of additional YAML specs
    #[arg(short, long)]
    pub specs: Option<PathBuf>,

    /// Run only tests matching this tag
    #[arg(short, long)]
    pub tag: Option<String>,

    /// Run only tests whose name contains this text
    #[arg(short, long)]
    pub grep: Option<String>,

    /// Browser to use (chromium, firefox, webkit)
    #[arg(long)]
    pub browser: Option<Browser>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Number of tests to run in parallel
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Retries for failing tests
    #[arg(long)]
    pub retries: Option<u32>,

    /// Override the site base URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// Skip the reachability probe
    #[arg(long)]
    pub skip_probe: bool,

    /// Output directory for results
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl RunnerConfig {
    /// Build the effective configuration: `file` (or defaults), then the
    /// environment seen through `lookup`, then `overrides`
    pub fn layered<F>(file: Option<&Path>, lookup: F, overrides: &Overrides) -> E2eResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_from(lookup)?;
        config.apply_overrides(overrides);
        Ok(config)
    }

    /// Apply command-line settings; unset flags leave the value alone
    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(specs) = &overrides.specs {
            self.specs_dir = Some(specs.clone());
        }
        if overrides.tag.is_some() {
            self.tag = overrides.tag.clone();
        }
        if overrides.grep.is_some() {
            self.grep = overrides.grep.clone();
        }
        if let Some(browser) = overrides.browser {
            self.playwright.browser = browser;
        }
        if overrides.headed {
            self.playwright.headless = false;
        }
        if overrides.workers.is_some() {
            self.workers = overrides.workers;
        }
        if overrides.retries.is_some() {
            self.retries = overrides.retries;
        }
        if let Some(url) = &overrides.base_url {
            self.playwright.base_url = url.clone();
        }
        if overrides.skip_probe {
            self.probe.enabled = false;
        }
        if let Some(output) = &overrides.output {
            self.output_dir = output.clone();
            self.playwright.artifacts_dir = output.join("artifacts");
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> E2eResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| E2eError::Config(format!("{} must be a number, got '{}'", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playwright::TraceMode;
    use clap::Parser;
    use std::collections::HashMap;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        overrides: Overrides,
    }

    fn cli(args: &[&str]) -> Overrides {
        Cli::parse_from(std::iter::once("saucedemo-e2e").chain(args.iter().copied())).overrides
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = RunnerConfig::default();
        assert_eq!(config.effective_retries(), 0);
        assert!(config.effective_workers() >= 1);
        assert_eq!(config.playwright.base_url, "https://www.saucedemo.com/");
        assert_eq!(config.playwright.test_id_attribute, "data-test");
    }

    #[test]
    fn test_ci_defaults() {
        let mut config = RunnerConfig::default();
        config.apply_env_from(env(&[("CI", "true")])).unwrap();
        assert_eq!(config.effective_workers(), 1);
        assert_eq!(config.effective_retries(), 2);

        config.apply_env_from(env(&[("CI", "false"), ("E2E_WORKERS", "3")])).unwrap();
        assert!(!config.ci);
        assert_eq!(config.effective_workers(), 3);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = RunnerConfig::default();
        config
            .apply_env_from(env(&[
                ("SAUCEDEMO_BASE_URL", "http://localhost:3000/"),
                ("E2E_RETRIES", "1"),
            ]))
            .unwrap();
        assert_eq!(config.playwright.base_url, "http://localhost:3000/");
        assert_eq!(config.effective_retries(), 1);

        let err = config.apply_env_from(env(&[("E2E_WORKERS", "many")])).unwrap_err();
        assert!(err.to_string().contains("E2E_WORKERS"));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("e2e.toml");
        std::fs::write(
            &path,
            r#"
workers = 2
retries = 1
tag = "smoke"

[playwright]
browser = "firefox"
headless = false
expect_timeout_ms = 8000
trace = "on"

[probe]
enabled = false
"#,
        )
        .unwrap();

        let config = RunnerConfig::from_file(&path).unwrap();
        assert_eq!(config.effective_workers(), 2);
        assert_eq!(config.effective_retries(), 1);
        assert_eq!(config.tag.as_deref(), Some("smoke"));
        assert_eq!(config.playwright.browser, Browser::Firefox);
        assert!(!config.playwright.headless);
        assert_eq!(config.playwright.expect_timeout_ms, 8000);
        assert_eq!(config.playwright.trace, TraceMode::On);
        assert_eq!(config.playwright.base_url, "https://www.saucedemo.com/");
        assert!(!config.probe.enabled);
        assert_eq!(config.probe.timeout_ms, 30_000);
    }

    #[test]
    fn test_missing_file() {
        let err = RunnerConfig::from_file(Path::new("/nonexistent/e2e.toml")).unwrap_err();
        assert!(matches!(err, E2eError::Config(_)));
    }

    #[test]
    fn test_cli_overrides_config() {
        let overrides = cli(&[
            "--browser", "webkit", "--headed", "--workers", "3", "--skip-probe", "--output", "out",
        ]);
        let config = RunnerConfig::layered(None, env(&[]), &overrides).unwrap();
        assert_eq!(config.playwright.browser, Browser::Webkit);
        assert!(!config.playwright.headless);
        assert_eq!(config.effective_workers(), 3);
        assert!(!config.probe.enabled);
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.playwright.artifacts_dir, PathBuf::from("out/artifacts"));
    }

    #[test]
    fn test_layering_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("e2e.toml");
        std::fs::write(
            &path,
            "workers = 2\nretries = 1\ngrep = \"cart\"\n\n[playwright]\nbase_url = \"http://file.local/\"\n",
        )
        .unwrap();
        let lookup = env(&[("E2E_WORKERS", "4"), ("SAUCEDEMO_BASE_URL", "http://env.local/")]);

        // No flags: the environment beats the file, the file beats defaults
        let config = RunnerConfig::layered(Some(&path), &lookup, &Overrides::default()).unwrap();
        assert_eq!(config.effective_workers(), 4);
        assert_eq!(config.effective_retries(), 1);
        assert_eq!(config.grep.as_deref(), Some("cart"));
        assert_eq!(config.playwright.base_url, "http://env.local/");

        // Flags beat both
        let overrides = cli(&["--workers", "6", "--base-url", "http://cli.local/", "--retries", "0"]);
        let config = RunnerConfig::layered(Some(&path), &lookup, &overrides).unwrap();
        assert_eq!(config.effective_workers(), 6);
        assert_eq!(config.effective_retries(), 0);
        assert_eq!(config.grep.as_deref(), Some("cart"));
        assert_eq!(config.playwright.base_url, "http://cli.local/");
    }
}
