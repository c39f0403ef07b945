//! Built-in Sauce Demo scenarios
//!
//! [`SpecBuilder`] mirrors the Playwright page API (`goto`, `fill`, `click`,
//! `expect_*`) so each scenario reads as the linear script it is.

use crate::locator::{Locator, TextMatch};
use crate::spec::{TestSpec, TestStep, UrlMatch, Viewport};

/// Login page, relative to the configured base URL
pub const LOGIN_PATH: &str = "/";

pub const STANDARD_USER: &str = "standard_user";
pub const PASSWORD: &str = "secret_sauce";
pub const INVALID_USER: &str = "invalid_user";
pub const INVALID_PASSWORD: &str = "wrong_password";

pub const SUITE_E2E: &str = "Sauce Demo E2E";
pub const SUITE_SMOKE: &str = "Smoke Tests";

const INVENTORY_URL: &str = r".*inventory\.html";
const CART_URL: &str = r".*cart\.html";

/// Fluent builder producing a [`TestSpec`]
#[derive(Debug, Clone)]
pub struct SpecBuilder {
    spec: TestSpec,
}

impl SpecBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            spec: TestSpec {
                name: name.into(),
                suite: String::new(),
                description: String::new(),
                tags: Vec::new(),
                viewport: Viewport::default(),
                timeout_ms: 30_000,
                steps: Vec::new(),
            },
        }
    }

    pub fn suite(mut self, suite: &str) -> Self {
        self.spec.suite = suite.to_string();
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.spec.description = description.to_string();
        self
    }

    pub fn tags(mut self, tags: &[&str]) -> Self {
        self.spec.tags.extend(tags.iter().map(|t| t.to_string()));
        self
    }

    pub fn step(mut self, step: TestStep) -> Self {
        self.spec.steps.push(step);
        self
    }

    pub fn goto(self, url: &str) -> Self {
        self.step(TestStep::Goto { url: url.to_string() })
    }

    pub fn fill(self, locator: Locator, value: &str) -> Self {
        self.step(TestStep::Fill { locator, value: value.to_string() })
    }

    pub fn click(self, locator: Locator) -> Self {
        self.step(TestStep::Click { locator })
    }

    pub fn expect_url(self, url: UrlMatch) -> Self {
        self.step(TestStep::ExpectUrl { url })
    }

    pub fn expect_title(self, title: TextMatch) -> Self {
        self.step(TestStep::ExpectTitle { title })
    }

    pub fn expect_visible(self, locator: Locator) -> Self {
        self.step(TestStep::ExpectVisible { locator })
    }

    pub fn expect_hidden(self, locator: Locator) -> Self {
        self.step(TestStep::ExpectHidden { locator })
    }

    pub fn expect_enabled(self, locator: Locator) -> Self {
        self.step(TestStep::ExpectEnabled { locator })
    }

    pub fn expect_text(self, locator: Locator, text: &str) -> Self {
        self.step(TestStep::ExpectText { locator, text: text.to_string() })
    }

    pub fn expect_count(self, locator: Locator, count: usize) -> Self {
        self.step(TestStep::ExpectCount { locator, count })
    }

    /// Open the site and submit the login form
    pub fn login(self, username: &str, password: &str) -> Self {
        self.goto(LOGIN_PATH)
            .fill(Locator::placeholder("Username"), username)
            .fill(Locator::placeholder("Password"), password)
            .click(Locator::button("Login"))
    }

    pub fn build(self) -> TestSpec {
        self.spec
    }
}

fn add_to_cart_buttons() -> Locator {
    Locator::role("button", TextMatch::pattern_ci("Add to cart"))
}

/// Every built-in scenario, in declaration order
pub fn all() -> Vec<TestSpec> {
    let mut specs = sauce_demo_e2e();
    specs.extend(smoke_tests());
    specs
}

/// Full purchase flow plus the invalid-login check
pub fn sauce_demo_e2e() -> Vec<TestSpec> {
    vec![standard_user_can_complete_a_checkout(), shows_error_on_invalid_login()]
}

/// Quick deployment-health checks
pub fn smoke_tests() -> Vec<TestSpec> {
    vec![
        application_loads_and_displays_login_page(),
        user_can_login_with_valid_credentials(),
        shopping_cart_functionality_works(),
        error_handling_for_invalid_login(),
        navigation_menu_works_correctly(),
        application_handles_empty_states_gracefully(),
    ]
}

pub fn standard_user_can_complete_a_checkout() -> TestSpec {
    SpecBuilder::new("standard user can complete a checkout")
        .suite(SUITE_E2E)
        .description("login -> add to cart -> checkout")
        .tags(&["e2e", "checkout"])
        .login(STANDARD_USER, PASSWORD)
        .expect_url(UrlMatch::pattern(INVENTORY_URL))
        .expect_visible(Locator::heading("Products"))
        .click(add_to_cart_buttons().nth(0))
        .click(add_to_cart_buttons().nth(1))
        .click(Locator::role("link", TextMatch::pattern_ci("shopping cart")))
        .expect_url(UrlMatch::pattern(CART_URL))
        .click(Locator::button("Checkout"))
        .expect_url(UrlMatch::pattern(r".*checkout-step-one\.html"))
        .fill(Locator::placeholder("First Name"), "Jane")
        .fill(Locator::placeholder("Last Name"), "Doe")
        .fill(Locator::placeholder("Zip/Postal Code"), "12345")
        .click(Locator::button("Continue"))
        .expect_url(UrlMatch::pattern(r".*checkout-step-two\.html"))
        .click(Locator::button("Finish"))
        .expect_url(UrlMatch::pattern(r".*checkout-complete\.html"))
        .expect_visible(Locator::heading("Thank you for your order!"))
        .build()
}

pub fn shows_error_on_invalid_login() -> TestSpec {
    SpecBuilder::new("shows error on invalid login")
        .suite(SUITE_E2E)
        .tags(&["e2e", "auth"])
        .login(INVALID_USER, INVALID_PASSWORD)
        .expect_visible(Locator::text("Epic sadface:"))
        .build()
}

pub fn application_loads_and_displays_login_page() -> TestSpec {
    SpecBuilder::new("Application loads and displays login page")
        .suite(SUITE_SMOKE)
        .tags(&["smoke"])
        .goto(LOGIN_PATH)
        .expect_title(TextMatch::pattern("Swag Labs"))
        .expect_visible(Locator::placeholder("Username"))
        .expect_visible(Locator::placeholder("Password"))
        .expect_visible(Locator::button("Login"))
        .expect_enabled(Locator::placeholder("Username"))
        .expect_enabled(Locator::placeholder("Password"))
        .expect_enabled(Locator::button("Login"))
        .build()
}

pub fn user_can_login_with_valid_credentials() -> TestSpec {
    SpecBuilder::new("User can login with valid credentials")
        .suite(SUITE_SMOKE)
        .tags(&["smoke", "auth"])
        .login(STANDARD_USER, PASSWORD)
        .expect_url(UrlMatch::pattern(INVENTORY_URL))
        .expect_visible(Locator::css(r#"#header_container [data-test="title"]"#))
        .expect_visible(Locator::text("Products"))
        .expect_visible(Locator::css(".inventory_item").first())
        .build()
}

pub fn shopping_cart_functionality_works() -> TestSpec {
    SpecBuilder::new("Shopping cart functionality works")
        .suite(SUITE_SMOKE)
        .tags(&["smoke", "cart"])
        .login(STANDARD_USER, PASSWORD)
        .expect_url(UrlMatch::pattern(INVENTORY_URL))
        .click(add_to_cart_buttons().first())
        .expect_visible(Locator::test_id("shopping-cart-badge"))
        .expect_text(Locator::test_id("shopping-cart-badge"), "1")
        .click(Locator::test_id("shopping-cart-link"))
        .expect_url(UrlMatch::pattern(CART_URL))
        .expect_visible(Locator::text("Your Cart"))
        .expect_count(Locator::css(".cart_item"), 1)
        .build()
}

pub fn error_handling_for_invalid_login() -> TestSpec {
    SpecBuilder::new("Error handling for invalid login")
        .suite(SUITE_SMOKE)
        .tags(&["smoke", "auth"])
        .login(INVALID_USER, INVALID_PASSWORD)
        .expect_visible(Locator::text("Epic sadface:"))
        .expect_url(UrlMatch::exact(LOGIN_PATH))
        .build()
}

pub fn navigation_menu_works_correctly() -> TestSpec {
    SpecBuilder::new("Navigation menu works correctly")
        .suite(SUITE_SMOKE)
        .tags(&["smoke", "navigation"])
        .login(STANDARD_USER, PASSWORD)
        .expect_visible(Locator::css("#react-burger-menu-btn"))
        .click(Locator::css("#react-burger-menu-btn"))
        .expect_visible(Locator::text("All Items"))
        .expect_visible(Locator::text("About"))
        .expect_visible(Locator::text("Logout"))
        .expect_visible(Locator::text("Reset App State"))
        .click(Locator::css("#react-burger-cross-btn"))
        .expect_hidden(Locator::text("All Items"))
        .build()
}

pub fn application_handles_empty_states_gracefully() -> TestSpec {
    SpecBuilder::new("Application handles empty states gracefully")
        .suite(SUITE_SMOKE)
        .tags(&["smoke", "cart"])
        .login(STANDARD_USER, PASSWORD)
        .click(Locator::test_id("shopping-cart-link"))
        .expect_visible(Locator::text("Your Cart"))
        .expect_count(Locator::css(".cart_item"), 0)
        .expect_visible(Locator::button("Continue Shopping"))
        .click(Locator::button("Continue Shopping"))
        .expect_url(UrlMatch::pattern(INVENTORY_URL))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_all_scenarios_validate() {
        for spec in all() {
            spec.validate().unwrap();
        }
    }

    #[test]
    fn test_names_are_unique() {
        let specs = all();
        let names: HashSet<String> = specs.iter().map(|s| s.full_name()).collect();
        assert_eq!(names.len(), specs.len());
        assert_eq!(specs.len(), 8);
    }

    #[test]
    fn test_login_expands_to_four_steps() {
        let spec = SpecBuilder::new("login").login(STANDARD_USER, PASSWORD).build();
        assert_eq!(
            spec.steps,
            vec![
                TestStep::Goto { url: LOGIN_PATH.to_string() },
                TestStep::Fill { locator: Locator::placeholder("Username"), value: STANDARD_USER.to_string() },
                TestStep::Fill { locator: Locator::placeholder("Password"), value: PASSWORD.to_string() },
                TestStep::Click { locator: Locator::button("Login") },
            ]
        );
    }

    #[test]
    fn test_invalid_login_stays_on_login_url() {
        let spec = error_handling_for_invalid_login();
        assert_eq!(
            spec.steps.last(),
            Some(&TestStep::ExpectUrl { url: UrlMatch::exact(LOGIN_PATH) })
        );
    }
}
