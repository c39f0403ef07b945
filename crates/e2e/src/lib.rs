//! Sauce Demo E2E Test Framework
//!
//! This crate drives the public Sauce Demo shop (`https://www.saucedemo.com/`)
//! from Rust:
//! - Describes each test as a typed list of Playwright-style steps
//! - Compiles every test into a node script using Playwright's locators and
//!   auto-waiting `expect`
//! - Runs tests in parallel, one fresh browser per test, with retries
//! - Loads extra declarative YAML specs
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    E2E Test Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    ├── collect_specs() -> built-in scenarios + YAML         │
//! │    ├── SiteProbe::wait_until_reachable()                    │
//! │    ├── run_specs(specs) -> TestSuiteResult                  │
//! │    └── write_results() -> test-results.json                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestSpec                                                   │
//! │    ├── name, suite, tags, viewport, timeout_ms              │
//! │    └── steps: [TestStep]                                    │
//! │          ├── goto { url }                                   │
//! │          ├── fill { locator, value } / click { locator }    │
//! │          ├── expect_url / expect_title                      │
//! │          ├── expect_visible / expect_hidden / expect_enabled│
//! │          ├── expect_text / expect_count                     │
//! │          └── screenshot / log                               │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod locator;
pub mod playwright;
pub mod runner;
pub mod scenarios;
pub mod site;
pub mod spec;

pub use config::RunnerConfig;
pub use error::{E2eError, E2eResult};
pub use locator::{Locator, TextMatch};
pub use runner::{TestResult, TestRunner, TestSuiteResult};
pub use spec::{TestSpec, TestStep, UrlMatch};
