//! Declarative test specification
//!
//! Specs are built in Rust (see [`crate::scenarios`]) or parsed from YAML.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::{E2eError, E2eResult};
use crate::locator::{validate_pattern, Locator, TextMatch};

/// A complete test specification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSpec {
    /// Unique name for this test
    pub name: String,

    /// Suite the test belongs to (the `describe` block)
    #[serde(default)]
    pub suite: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering tests
    #[serde(default)]
    pub tags: Vec<String>,

    /// Viewport size for the browser
    #[serde(default)]
    pub viewport: Viewport,

    /// Whole-test timeout
    #[serde(default = "default_test_timeout")]
    pub timeout_ms: u64,

    /// Steps to execute in order
    pub steps: Vec<TestStep>,
}

fn default_test_timeout() -> u64 {
    30_000
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { width: 1280, height: 720 }
    }
}

/// Expected page URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UrlMatch {
    /// Whole URL, compared exactly. A relative URL is resolved against the
    /// base URL.
    Exact(String),
    /// Regular expression searched in the URL
    Pattern { pattern: String },
}

impl UrlMatch {
    pub fn exact(url: impl Into<String>) -> Self {
        Self::Exact(url.into())
    }

    pub fn pattern(pattern: impl Into<String>) -> Self {
        Self::Pattern { pattern: pattern.into() }
    }
}

impl fmt::Display for UrlMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(url) => write!(f, "{}", url),
            Self::Pattern { pattern } => write!(f, "/{}/", pattern),
        }
    }
}

/// A single step in a test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TestStep {
    /// Navigate to a URL (absolute, or relative to the base URL)
    Goto { url: String },

    /// Fill an input field
    Fill { locator: Locator, value: String },

    /// Click an element
    Click { locator: Locator },

    /// Assert the page URL
    ExpectUrl { url: UrlMatch },

    /// Assert the page title
    ExpectTitle { title: TextMatch },

    /// Assert an element is visible
    ExpectVisible { locator: Locator },

    /// Assert an element is not visible
    ExpectHidden { locator: Locator },

    /// Assert an element is enabled
    ExpectEnabled { locator: Locator },

    /// Assert an element's full text
    ExpectText { locator: Locator, text: String },

    /// Assert how many elements match
    ExpectCount { locator: Locator, count: usize },

    /// Take a screenshot
    Screenshot {
        name: String,
        #[serde(default)]
        full_page: bool,
    },

    /// Log a message (for debugging)
    Log { message: String },
}

impl TestStep {
    /// Short label used in script comments and failure reports
    pub fn describe(&self) -> String {
        match self {
            TestStep::Goto { url } => format!("goto:{}", url),
            TestStep::Fill { locator, .. } => format!("fill:{}", locator),
            TestStep::Click { locator } => format!("click:{}", locator),
            TestStep::ExpectUrl { url } => format!("expect-url:{}", url),
            TestStep::ExpectTitle { title } => format!("expect-title:{}", title),
            TestStep::ExpectVisible { locator } => format!("expect-visible:{}", locator),
            TestStep::ExpectHidden { locator } => format!("expect-hidden:{}", locator),
            TestStep::ExpectEnabled { locator } => format!("expect-enabled:{}", locator),
            TestStep::ExpectText { locator, text } => format!("expect-text:{}='{}'", locator, text),
            TestStep::ExpectCount { locator, count } => format!("expect-count:{}={}", locator, count),
            TestStep::Screenshot { name, .. } => format!("screenshot:{}", name),
            TestStep::Log { message } => {
                let end = message.char_indices().nth(30).map(|(i, _)| i).unwrap_or(message.len());
                format!("log:{}", &message[..end])
            }
        }
    }

    fn validate(&self) -> Result<(), String> {
        let checked = match self {
            TestStep::Fill { locator, .. }
            | TestStep::Click { locator }
            | TestStep::ExpectVisible { locator }
            | TestStep::ExpectHidden { locator }
            | TestStep::ExpectEnabled { locator }
            | TestStep::ExpectText { locator, .. }
            | TestStep::ExpectCount { locator, .. } => locator.validate(),
            TestStep::ExpectTitle { title } => title.validate(),
            TestStep::ExpectUrl { url: UrlMatch::Pattern { pattern } } => validate_pattern(pattern),
            TestStep::Screenshot { name, .. } => {
                if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
                    return Err(format!("screenshot name '{}' must be a plain file stem", name));
                }
                Ok(())
            }
            TestStep::Goto { url } if url.is_empty() => {
                return Err("goto needs a url".to_string());
            }
            _ => Ok(()),
        };
        checked.map_err(|e| e.to_string())
    }
}

impl TestSpec {
    /// Parse a test spec from YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let spec: Self = serde_yaml::from_str(yaml)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Parse a test spec from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| E2eError::SpecParse(format!("{}: {}", path.display(), e)))
    }

    /// Load all test specs from a directory, sorted by path
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        let mut specs = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            let spec = Self::from_file(entry.path())?;
            specs.push(spec);
        }

        Ok(specs)
    }

    /// Reject specs that cannot produce a meaningful script
    pub fn validate(&self) -> E2eResult<()> {
        if self.name.trim().is_empty() {
            return Err(E2eError::invalid_spec(&self.name, "name is empty"));
        }
        if self.steps.is_empty() {
            return Err(E2eError::invalid_spec(&self.name, "no steps"));
        }
        for (i, step) in self.steps.iter().enumerate() {
            step.validate()
                .map_err(|reason| E2eError::invalid_spec(&self.name, format!("step {}: {}", i + 1, reason)))?;
        }
        Ok(())
    }

    /// `suite > name`, or just the name outside a suite
    pub fn full_name(&self) -> String {
        if self.suite.is_empty() {
            self.name.clone()
        } else {
            format!("{} > {}", self.suite, self.name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_spec() {
        let yaml = r#"
name: locked out user
suite: Login
tags:
  - auth
  - smoke
steps:
  - action: goto
    url: /
  - action: fill
    locator:
      placeholder: Username
    value: locked_out_user
  - action: click
    locator:
      role:
        role: button
        name: Login
  - action: expect_url
    url: /
  - action: expect_count
    locator:
      css: .cart_item
    count: 0
"#;
        let spec = TestSpec::from_yaml(yaml).unwrap();
        assert_eq!(spec.full_name(), "Login > locked out user");
        assert_eq!(spec.steps.len(), 5);
        assert_eq!(spec.timeout_ms, 30_000);
        assert_eq!(spec.viewport, Viewport::default());
        assert_eq!(
            spec.steps[3],
            TestStep::ExpectUrl { url: UrlMatch::exact("/") }
        );
    }

    #[test]
    fn test_url_pattern_form() {
        let yaml = r#"
name: pattern
steps:
  - action: expect_url
    url:
      pattern: '.*inventory\.html'
"#;
        let spec = TestSpec::from_yaml(yaml).unwrap();
        assert_eq!(spec.steps[0], TestStep::ExpectUrl { url: UrlMatch::pattern(r".*inventory\.html") });
        assert_eq!(spec.steps[0].describe(), r"expect-url:/.*inventory\.html/");
    }

    #[test]
    fn test_rejects_inline_flags_in_url_pattern() {
        let yaml = r#"
name: flags
steps:
  - action: expect_url
    url:
      pattern: '(?i).*INVENTORY\.html'
"#;
        let err = TestSpec::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("inline flags"));
    }

    #[test]
    fn test_rejects_empty_steps() {
        let err = TestSpec::from_yaml("name: empty\nsteps: []\n").unwrap_err();
        assert!(err.to_string().contains("no steps"));
    }

    #[test]
    fn test_rejects_bad_screenshot_name() {
        let yaml = r#"
name: shot
steps:
  - action: screenshot
    name: ../escape
"#;
        let err = TestSpec::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("step 1"));
    }

    #[test]
    fn test_log_description_is_truncated_on_char_boundary() {
        let step = TestStep::Log { message: "é".repeat(40) };
        assert_eq!(step.describe(), format!("log:{}", "é".repeat(30)));
    }
}
