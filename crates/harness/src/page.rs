//! Page objects for the screens under test
//!
//! Each page type encapsulates one logical screen: its locators (resolved
//! once at construction, never exposed to the orchestrator) and the
//! intention-revealing operations meaningful on that screen. Every browser
//! touch goes through the wait policy first.

use std::fmt;

use crate::browser::BrowserSession;
use crate::error::{HarnessError, HarnessResult};
use crate::wait::WaitPolicy;

/// Element lookup strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum By {
    Id,
    Css,
}

/// A (strategy, selector) pair naming one element on a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    strategy: By,
    selector: &'static str,
}

impl Locator {
    pub const fn id(selector: &'static str) -> Self {
        Self {
            strategy: By::Id,
            selector,
        }
    }

    pub const fn css(selector: &'static str) -> Self {
        Self {
            strategy: By::Css,
            selector,
        }
    }

    /// Render to the CSS selector handed to the driver.
    pub fn to_css(&self) -> String {
        match self.strategy {
            By::Id => format!("#{}", self.selector),
            By::Css => self.selector.to_string(),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.strategy {
            By::Id => write!(f, "id={}", self.selector),
            By::Css => write!(f, "css={}", self.selector),
        }
    }
}

/// The login screen.
pub struct LoginPage<'a> {
    session: &'a BrowserSession,
    url: String,
    wait: WaitPolicy,
    username_field: Locator,
    password_field: Locator,
    login_button: Locator,
    error_message: Locator,
}

impl<'a> LoginPage<'a> {
    pub fn new(session: &'a BrowserSession, base_url: &str, wait: WaitPolicy) -> Self {
        Self {
            session,
            url: base_url.to_string(),
            wait,
            username_field: Locator::id("user-name"),
            password_field: Locator::id("password"),
            login_button: Locator::id("login-button"),
            error_message: Locator::css("h3[data-test='error']"),
        }
    }

    /// Navigate to the login screen and wait for the form to render.
    pub async fn open(&self) -> HarnessResult<()> {
        self.session.goto(&self.url).await?;
        self.wait_for_element(&self.login_button, "login form to render")
            .await?;
        Ok(())
    }

    /// Fill both credential inputs and submit the form.
    pub async fn submit_credentials(&self, username: &str, password: &str) -> HarnessResult<()> {
        self.wait_for_element(&self.username_field, "username input")
            .await?;
        self.session
            .fill(&self.username_field.to_css(), username)
            .await?;
        self.session
            .fill(&self.password_field.to_css(), password)
            .await?;
        self.session.click(&self.login_button.to_css()).await?;
        Ok(())
    }

    /// Text of the rendered error surface, once it appears.
    pub async fn error_message(&self) -> HarnessResult<String> {
        let selector = self.error_message.to_css();
        self.wait
            .until("error message to render", || async {
                self.session.text(&selector).await
            })
            .await
            .map_err(|e| self.not_found_on_timeout(e, &self.error_message))
    }

    /// Wait until the browser has navigated somewhere whose URL contains
    /// `fragment`, returning the full URL.
    pub async fn wait_for_redirect(&self, fragment: &str) -> HarnessResult<String> {
        let description = format!("URL to contain '{fragment}'");
        self.wait
            .until(&description, || async {
                let url = self.session.current_url().await?;
                Ok(url.contains(fragment).then_some(url))
            })
            .await
    }

    async fn wait_for_element(&self, locator: &Locator, what: &str) -> HarnessResult<()> {
        let selector = locator.to_css();
        self.wait
            .until(what, || async {
                Ok(self.session.is_visible(&selector).await?.then_some(()))
            })
            .await
            .map_err(|e| self.not_found_on_timeout(e, locator))
    }

    fn not_found_on_timeout(&self, err: HarnessError, locator: &Locator) -> HarnessError {
        match err {
            HarnessError::Timeout { timeout, .. } => HarnessError::ElementNotFound {
                locator: locator.to_string(),
                timeout,
            },
            other => other,
        }
    }
}

/// The post-login inventory screen.
pub struct InventoryPage<'a> {
    session: &'a BrowserSession,
    wait: WaitPolicy,
    inventory_list: Locator,
}

impl<'a> InventoryPage<'a> {
    pub fn new(session: &'a BrowserSession, wait: WaitPolicy) -> Self {
        Self {
            session,
            wait,
            inventory_list: Locator::id("inventory-list"),
        }
    }

    /// True once the inventory list has rendered.
    pub async fn is_loaded(&self) -> HarnessResult<bool> {
        let selector = self.inventory_list.to_css();
        match self
            .wait
            .until("inventory list to render", || async {
                Ok(self.session.is_visible(&selector).await?.then_some(()))
            })
            .await
        {
            Ok(()) => Ok(true),
            Err(HarnessError::Timeout { .. }) => Ok(false),
            Err(other) => Err(other),
        }
    }
}
