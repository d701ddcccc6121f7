//! Headed browser session used for the login step.

use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::chrome::{ChromeDriver, ChromeOptions};
use super::{BrowserError, BrowserSession, RawCookie};
use crate::identity::Identity;

/// A headed Chrome session.
///
/// This is the session the operator sees: automatic mode drives its login
/// form, manual mode leaves it visible for an out-of-band login.
pub struct InteractiveBrowser {
    driver: ChromeDriver,
    identity: Identity,
    threshold: f64,
}

impl InteractiveBrowser {
    /// Launches the headed session.
    ///
    /// # Errors
    ///
    /// Returns a [`BrowserError`] when the browser process cannot be started.
    #[instrument(skip(identity), fields(headless = false))]
    pub async fn launch(
        identity: Identity,
        threshold: f64,
        options: &ChromeOptions,
    ) -> Result<Self, BrowserError> {
        let driver = ChromeDriver::launch(options).await?;
        Ok(Self {
            driver,
            identity,
            threshold,
        })
    }
}

#[async_trait]
impl BrowserSession for InteractiveBrowser {
    async fn is_authenticated(&self, url: &str) -> Result<bool, BrowserError> {
        self.driver.navigate(url).await?;
        let score = self.driver.authentication_score(&self.identity).await?;
        debug!(url, score, threshold = self.threshold, "authentication check");
        Ok(score >= self.threshold)
    }

    async fn authenticate(&self, url: &str) -> Result<bool, BrowserError> {
        self.driver.navigate(url).await?;

        if !self.driver.submit_login_form(&self.identity).await? {
            return Ok(false);
        }

        let score = self.driver.authentication_score(&self.identity).await?;
        debug!(url, score, threshold = self.threshold, "post-login check");
        Ok(score >= self.threshold)
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        self.driver.url().await
    }

    async fn cookies(&self) -> Result<Vec<RawCookie>, BrowserError> {
        self.driver.cookies().await
    }

    async fn save_screenshot(&self, path: &Path) -> Result<(), BrowserError> {
        self.driver.screenshot(path).await
    }

    async fn quit(&self) -> Result<(), BrowserError> {
        self.driver.shutdown().await
    }
}

impl InteractiveBrowser {
    /// Names the page's own script can read via `document.cookie`.
    ///
    /// # Errors
    ///
    /// Returns a [`BrowserError`] when the evaluation fails.
    pub async fn script_readable_cookie_names(&self) -> Result<Vec<String>, BrowserError> {
        self.driver.script_readable_cookie_names().await
    }

    /// Names the devtools listing flags as HttpOnly.
    ///
    /// # Errors
    ///
    /// Returns a [`BrowserError`] when the cookie listing fails.
    pub async fn http_only_cookie_names(&self) -> Result<Vec<String>, BrowserError> {
        self.driver.http_only_cookie_names().await
    }
}
