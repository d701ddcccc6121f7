//! Headless browser session used for token replay scoring and diagnostics.

use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::chrome::{ChromeDriver, ChromeOptions};
use super::{BrowserError, BrowserSession, RawCookie};
use crate::identity::Identity;

/// A headless Chrome session.
///
/// Satisfies the same capability interface as [`super::InteractiveBrowser`];
/// additionally exposes the cookie install/clear primitives the replay
/// scorer needs to test candidate tokens in a clean session.
pub struct HeadlessBrowser {
    driver: ChromeDriver,
    identity: Identity,
    threshold: f64,
}

impl HeadlessBrowser {
    /// Launches the headless session.
    ///
    /// # Errors
    ///
    /// Returns a [`BrowserError`] when the browser process cannot be started.
    #[instrument(skip(identity), fields(headless = true))]
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

    /// Removes every cookie from the session.
    ///
    /// # Errors
    ///
    /// Returns a [`BrowserError`] when the driver call fails.
    pub async fn clear_cookies(&self) -> Result<(), BrowserError> {
        self.driver.clear_cookies().await
    }

    /// Installs a single candidate cookie into the session.
    ///
    /// # Errors
    ///
    /// Returns a [`BrowserError`] when the driver call fails.
    pub async fn install_cookie(&self, cookie: &RawCookie) -> Result<(), BrowserError> {
        self.driver.install_cookie(cookie).await
    }

    /// Navigates and returns the identity-marker score of the loaded page.
    ///
    /// # Errors
    ///
    /// Returns a [`BrowserError`] when navigation or scoring fails.
    pub async fn replay_score(&self, url: &str) -> Result<f64, BrowserError> {
        self.driver.navigate(url).await?;
        self.driver.authentication_score(&self.identity).await
    }
}

#[async_trait]
impl BrowserSession for HeadlessBrowser {
    async fn is_authenticated(&self, url: &str) -> Result<bool, BrowserError> {
        let score = self.replay_score(url).await?;
        debug!(url, score, threshold = self.threshold, "authentication check");
        Ok(score >= self.threshold)
    }

    async fn authenticate(&self, url: &str) -> Result<bool, BrowserError> {
        self.driver.navigate(url).await?;

        if !self.driver.submit_login_form(&self.identity).await? {
            return Ok(false);
        }

        let score = self.driver.authentication_score(&self.identity).await?;
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
