//! Playwright locator model
//!
//! A [`Locator`] describes how to find an element on the page. It is plain data
//! so it can be written in YAML specs as well as built in Rust; [`Locator::to_js`]
//! turns it into the matching `page.getBy*()` expression. All user text is
//! emitted as JSON string literals, which are valid JavaScript literals.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{E2eError, E2eResult};

/// Text matcher used for accessible names, text content and page titles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextMatch {
    /// Literal text. Playwright matches it as a case-insensitive substring.
    Literal(String),

    /// Regular expression, compiled in the browser with `new RegExp`
    Pattern {
        pattern: String,
        #[serde(default)]
        ignore_case: bool,
    },
}

impl TextMatch {
    pub fn literal(text: impl Into<String>) -> Self {
        Self::Literal(text.into())
    }

    pub fn pattern(pattern: impl Into<String>) -> Self {
        Self::Pattern {
            pattern: pattern.into(),
            ignore_case: false,
        }
    }

    /// Case-insensitive pattern, the `/.../i` form
    pub fn pattern_ci(pattern: impl Into<String>) -> Self {
        Self::Pattern {
            pattern: pattern.into(),
            ignore_case: true,
        }
    }

    /// Check that a pattern compiles. Literals always pass.
    pub fn validate(&self) -> E2eResult<()> {
        if let Self::Pattern { pattern, .. } = self {
            validate_pattern(pattern)?;
        }
        Ok(())
    }

    pub fn to_js(&self) -> String {
        match self {
            Self::Literal(text) => js_string(text),
            Self::Pattern { pattern, ignore_case } => js_regex(pattern, *ignore_case),
        }
    }
}

impl fmt::Display for TextMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(text) => write!(f, "'{}'", text),
            Self::Pattern { pattern, ignore_case: true } => write!(f, "/{}/i", pattern),
            Self::Pattern { pattern, .. } => write!(f, "/{}/", pattern),
        }
    }
}

/// Element locator, one variant per Playwright locator strategy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locator {
    /// `page.getByPlaceholder(text)`
    Placeholder(String),

    /// `page.getByRole(role, { name })`
    Role {
        role: String,
        #[serde(default)]
        name: Option<TextMatch>,
    },

    /// `page.getByText(text)`
    Text(TextMatch),

    /// `page.locator(css)`
    Css(String),

    /// `page.getByTestId(id)`, resolved against the configured test-id attribute
    TestId(String),

    /// The `index`-th match of another locator
    Nth { of: Box<Locator>, index: usize },

    /// The first match of another locator
    First(Box<Locator>),
}

impl Locator {
    pub fn placeholder(text: impl Into<String>) -> Self {
        Self::Placeholder(text.into())
    }

    pub fn role(role: impl Into<String>, name: TextMatch) -> Self {
        Self::Role {
            role: role.into(),
            name: Some(name),
        }
    }

    /// Shorthand for `getByRole('button', { name })`
    pub fn button(name: impl Into<String>) -> Self {
        Self::role("button", TextMatch::literal(name))
    }

    pub fn heading(name: impl Into<String>) -> Self {
        Self::role("heading", TextMatch::literal(name))
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(TextMatch::literal(text))
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    pub fn test_id(id: impl Into<String>) -> Self {
        Self::TestId(id.into())
    }

    pub fn nth(self, index: usize) -> Self {
        Self::Nth {
            of: Box::new(self),
            index,
        }
    }

    pub fn first(self) -> Self {
        Self::First(Box::new(self))
    }

    /// Validate every text pattern reachable from this locator
    pub fn validate(&self) -> E2eResult<()> {
        match self {
            Self::Role { name: Some(name), .. } => name.validate(),
            Self::Text(text) => text.validate(),
            Self::Nth { of, .. } | Self::First(of) => of.validate(),
            _ => Ok(()),
        }
    }

    /// Playwright expression rooted at the `page` variable
    pub fn to_js(&self) -> String {
        match self {
            Self::Placeholder(text) => format!("page.getByPlaceholder({})", js_string(text)),
            Self::Role { role, name: Some(name) } => {
                format!("page.getByRole({}, {{ name: {} }})", js_string(role), name.to_js())
            }
            Self::Role { role, name: None } => format!("page.getByRole({})", js_string(role)),
            Self::Text(text) => format!("page.getByText({})", text.to_js()),
            Self::Css(selector) => format!("page.locator({})", js_string(selector)),
            Self::TestId(id) => format!("page.getByTestId({})", js_string(id)),
            Self::Nth { of, index } => format!("{}.nth({})", of.to_js(), index),
            Self::First(of) => format!("{}.first()", of.to_js()),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Placeholder(text) => write!(f, "placeholder='{}'", text),
            Self::Role { role, name: Some(name) } => write!(f, "role={}[name={}]", role, name),
            Self::Role { role, name: None } => write!(f, "role={}", role),
            Self::Text(text) => write!(f, "text={}", text),
            Self::Css(selector) => write!(f, "{}", selector),
            Self::TestId(id) => write!(f, "test-id={}", id),
            Self::Nth { of, index } => write!(f, "{} >> nth={}", of, index),
            Self::First(of) => write!(f, "{} >> nth=0", of),
        }
    }
}

/// Quote a string as a JavaScript literal
pub fn js_string(value: &str) -> String {
    // A JSON string is always a valid JS string literal
    serde_json::Value::String(value.to_string()).to_string()
}

/// Check a pattern before it is handed to the browser's `RegExp`.
///
/// Validation uses the `regex` crate, so it only approximates JavaScript
/// syntax: lookaround is rejected although `RegExp` supports it. Inline flag
/// groups such as `(?i)` compile here but are a `SyntaxError` in JavaScript,
/// so they are refused; use `ignore_case` instead.
pub fn validate_pattern(pattern: &str) -> E2eResult<()> {
    let bytes = pattern.as_bytes();
    let mut escaped = false;
    let mut in_class = false;
    for (i, &b) in bytes.iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' => escaped = true,
            b'[' => in_class = true,
            b']' => in_class = false,
            b'(' if !in_class
                && bytes.get(i + 1) == Some(&b'?')
                && bytes.get(i + 2).map_or(false, |c| c.is_ascii_alphabetic() || *c == b'-') =>
            {
                return Err(E2eError::SpecParse(format!(
                    "inline flags are not supported in pattern '{}'",
                    pattern
                )));
            }
            _ => {}
        }
    }
    regex::Regex::new(pattern)?;
    Ok(())
}

/// `new RegExp(...)` expression for a pattern
pub fn js_regex(pattern: &str, ignore_case: bool) -> String {
    let flags = if ignore_case { "i" } else { "" };
    format!("new RegExp({}, {})", js_string(pattern), js_string(flags))
}
