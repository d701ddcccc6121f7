//! Shared chromiumoxide driver behind both session implementations.
//!
//! One driver owns one browser process and one page. The interactive and
//! headless sessions differ only in launch configuration and in which extra
//! capabilities they expose; everything that talks to the DevTools protocol
//! lives here.

use std::path::Path;
use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    ClearBrowserCookiesParams, CookieParam, SetCookiesParams,
};
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, EventJavascriptDialogOpening, HandleJavaScriptDialogParams,
};
use chromiumoxide::page::{Page, ScreenshotParams};
use futures_util::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use super::{BrowserError, RawCookie, classify_cdp_error};
use crate::identity::Identity;

/// Default per-operation timeout applied to driver requests.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Launch configuration shared by both session kinds.
#[derive(Debug, Clone)]
pub struct ChromeOptions {
    /// Run without a visible window.
    pub headless: bool,
    /// Auto-dismiss JavaScript alert/confirm dialogs.
    pub ignore_alarm_dialogs: bool,
    /// Per-operation driver timeout.
    pub request_timeout: Duration,
}

impl ChromeOptions {
    /// Options for the headed session the operator can interact with.
    #[must_use]
    pub fn interactive(ignore_alarm_dialogs: bool) -> Self {
        Self {
            headless: false,
            ignore_alarm_dialogs,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Options for the headless scoring/diagnostics session.
    #[must_use]
    pub fn headless(ignore_alarm_dialogs: bool) -> Self {
        Self {
            headless: true,
            ignore_alarm_dialogs,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Fraction of identity markers found in the page content.
///
/// This is the authentication heuristic shared by `is_authenticated` and the
/// replay scorer: a logged-in page tends to display the account's email,
/// username or nickname somewhere in its markup. The score is the matched
/// fraction in `[0.0, 1.0]`; an empty marker list scores zero.
#[must_use]
pub fn marker_score(content: &str, markers: &[String]) -> f64 {
    if markers.is_empty() {
        return 0.0;
    }

    let haystack = content.to_lowercase();
    let matched = markers
        .iter()
        .filter(|marker| !marker.is_empty() && haystack.contains(&marker.to_lowercase()))
        .count();

    #[allow(clippy::cast_precision_loss)]
    {
        matched as f64 / markers.len() as f64
    }
}

/// One live Chrome process plus the single page the session drives.
pub(crate) struct ChromeDriver {
    browser: Mutex<Browser>,
    page: Page,
    handler_task: JoinHandle<()>,
    dialog_task: Option<JoinHandle<()>>,
}

impl ChromeDriver {
    /// Launches a Chrome process and opens its working page.
    pub(crate) async fn launch(options: &ChromeOptions) -> Result<Self, BrowserError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .request_timeout(options.request_timeout)
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage");

        if !options.headless {
            builder = builder.with_head();
        }

        let config = builder.build().map_err(BrowserError::transport)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| classify_cdp_error(&e))?;

        // Drain browser events until the process goes away.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| classify_cdp_error(&e))?;

        let dialog_task = if options.ignore_alarm_dialogs {
            Some(Self::spawn_dialog_dismisser(&page).await?)
        } else {
            None
        };

        Ok(Self {
            browser: Mutex::new(browser),
            page,
            handler_task,
            dialog_task,
        })
    }

    /// Spawns a task that accepts every JavaScript dialog as it opens, so
    /// alert/confirm popups cannot wedge a navigation.
    async fn spawn_dialog_dismisser(page: &Page) -> Result<JoinHandle<()>, BrowserError> {
        let mut dialogs = page
            .event_listener::<EventJavascriptDialogOpening>()
            .await
            .map_err(|e| classify_cdp_error(&e))?;
        let page = page.clone();

        Ok(tokio::spawn(async move {
            while let Some(dialog) = dialogs.next().await {
                debug!(message = %dialog.message, "dismissing JavaScript dialog");
                if let Err(error) = page.execute(HandleJavaScriptDialogParams::new(true)).await {
                    warn!(error = %error, "failed to dismiss dialog");
                    break;
                }
            }
        }))
    }

    /// Navigates the working page and waits for the load to settle.
    pub(crate) async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| classify_cdp_error(&e))?;
        self.page
            .wait_for_navigation()
            .await
            .map_err(|e| classify_cdp_error(&e))?;
        Ok(())
    }

    /// Scores the currently displayed page against the identity markers.
    pub(crate) async fn authentication_score(
        &self,
        identity: &Identity,
    ) -> Result<f64, BrowserError> {
        let content = self
            .page
            .content()
            .await
            .map_err(|e| classify_cdp_error(&e))?;
        let score = marker_score(&content, &identity.markers());
        trace!(score, "scored page against identity markers");
        Ok(score)
    }

    /// Attempts a credential form login on the currently displayed page.
    ///
    /// Returns `false` without error when no usable login form is present or
    /// no password was supplied; the caller decides the verdict by re-scoring
    /// the page afterwards.
    pub(crate) async fn submit_login_form(
        &self,
        identity: &Identity,
    ) -> Result<bool, BrowserError> {
        let Some(password) = identity.password() else {
            debug!("no password supplied; skipping form login");
            return Ok(false);
        };

        let account_field = self
            .page
            .find_element("input[type='email'], input[name*='email'], input[name*='user'], input[type='text']")
            .await;
        let Ok(account_field) = account_field else {
            debug!("no account input found on page");
            return Ok(false);
        };

        let Ok(password_field) = self.page.find_element("input[type='password']").await else {
            debug!("no password input found on page");
            return Ok(false);
        };

        account_field
            .click()
            .await
            .map_err(|e| classify_cdp_error(&e))?;
        account_field
            .type_str(&identity.email)
            .await
            .map_err(|e| classify_cdp_error(&e))?;

        password_field
            .click()
            .await
            .map_err(|e| classify_cdp_error(&e))?;
        password_field
            .type_str(password)
            .await
            .map_err(|e| classify_cdp_error(&e))?;

        // Prefer an explicit submit control; fall back to submitting the
        // first form directly.
        if let Ok(submit) = self
            .page
            .find_element("button[type='submit'], input[type='submit']")
            .await
        {
            submit.click().await.map_err(|e| classify_cdp_error(&e))?;
        } else {
            self.page
                .evaluate("document.forms.length > 0 && document.forms[0].submit()")
                .await
                .map_err(|e| classify_cdp_error(&e))?;
        }

        self.page
            .wait_for_navigation()
            .await
            .map_err(|e| classify_cdp_error(&e))?;

        Ok(true)
    }

    /// Returns the URL currently displayed by the working page.
    pub(crate) async fn url(&self) -> Result<String, BrowserError> {
        let url = self
            .page
            .url()
            .await
            .map_err(|e| classify_cdp_error(&e))?
            .unwrap_or_else(|| "about:blank".to_string());
        Ok(url)
    }

    /// Returns all cookies the session currently holds.
    pub(crate) async fn cookies(&self) -> Result<Vec<RawCookie>, BrowserError> {
        let cookies = self
            .page
            .get_cookies()
            .await
            .map_err(|e| classify_cdp_error(&e))?;

        Ok(cookies
            .into_iter()
            .map(|cookie| RawCookie::new(cookie.name, cookie.value, cookie.domain))
            .collect())
    }

    /// Returns the names the page's own script can read via `document.cookie`.
    pub(crate) async fn script_readable_cookie_names(&self) -> Result<Vec<String>, BrowserError> {
        let document_cookie: String = self
            .page
            .evaluate("document.cookie")
            .await
            .map_err(|e| classify_cdp_error(&e))?
            .into_value()
            .map_err(|e| BrowserError::transport(e.to_string()))?;

        Ok(document_cookie
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .map(|(name, _)| name.to_string())
            .collect())
    }

    /// Returns the names the devtools listing flags as HttpOnly.
    pub(crate) async fn http_only_cookie_names(&self) -> Result<Vec<String>, BrowserError> {
        let cookies = self
            .page
            .get_cookies()
            .await
            .map_err(|e| classify_cdp_error(&e))?;

        Ok(cookies
            .into_iter()
            .filter(|cookie| cookie.http_only)
            .map(|cookie| cookie.name)
            .collect())
    }

    /// Removes every cookie from the session's store.
    pub(crate) async fn clear_cookies(&self) -> Result<(), BrowserError> {
        self.page
            .execute(ClearBrowserCookiesParams::default())
            .await
            .map_err(|e| classify_cdp_error(&e))?;
        Ok(())
    }

    /// Installs a single cookie into the session's store.
    pub(crate) async fn install_cookie(&self, cookie: &RawCookie) -> Result<(), BrowserError> {
        let param = CookieParam::builder()
            .name(&cookie.name)
            .value(cookie.value())
            .domain(cookie.domain.trim_start_matches('.'))
            .path("/")
            .build()
            .map_err(BrowserError::transport)?;

        self.page
            .execute(SetCookiesParams::new(vec![param]))
            .await
            .map_err(|e| classify_cdp_error(&e))?;
        Ok(())
    }

    /// Writes a full-page PNG screenshot of the current page to `path`.
    pub(crate) async fn screenshot(&self, path: &Path) -> Result<(), BrowserError> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(true)
            .build();

        self.page
            .save_screenshot(params, path)
            .await
            .map_err(|e| classify_cdp_error(&e))?;
        Ok(())
    }

    /// Closes the browser process and stops the background tasks.
    pub(crate) async fn shutdown(&self) -> Result<(), BrowserError> {
        if let Some(dialog_task) = &self.dialog_task {
            dialog_task.abort();
        }

        let close_result = {
            let mut browser = self.browser.lock().await;
            browser.close().await
        };
        self.handler_task.abort();

        close_result.map_err(|e| classify_cdp_error(&e))?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn markers(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_marker_score_full_match() {
        let score = marker_score(
            "<p>Signed in as alice (alice@example.com)</p>",
            &markers(&["alice@example.com", "alice"]),
        );
        assert!((score - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_marker_score_partial_match() {
        let score = marker_score(
            "<p>Welcome back, alice</p>",
            &markers(&["alice", "alice@example.com"]),
        );
        assert!((score - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_marker_score_is_case_insensitive() {
        let score = marker_score("Hello ALICE", &markers(&["alice"]));
        assert!((score - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_marker_score_no_markers_scores_zero() {
        assert!(marker_score("anything", &[]).abs() < f64::EPSILON);
    }

    #[test]
    fn test_marker_score_unmatched_page_scores_zero() {
        let score = marker_score("<h1>Please sign in</h1>", &markers(&["alice"]));
        assert!(score.abs() < f64::EPSILON);
    }
}
