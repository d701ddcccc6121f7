//! Browser capability interface consumed by the detection pipeline.
//!
//! The pipeline never talks to an automation backend directly; it drives this
//! narrow trait. Two concrete implementations exist:
//! - [`InteractiveBrowser`] - a headed session the operator can see (and log
//!   into manually)
//! - [`HeadlessBrowser`] - a headless session used for token replay scoring
//!   and diagnostic screenshots
//!
//! Both are driven identically by the pipeline.

mod chrome;
mod headless;
mod interactive;

pub use chrome::{ChromeOptions, marker_score};
pub use headless::HeadlessBrowser;
pub use interactive::InteractiveBrowser;

use std::fmt;
use std::path::Path;

use async_trait::async_trait;

/// A cookie as reported by the automation backend, before deduplication and
/// classification.
///
/// The value field is intentionally redacted in Debug output to prevent
/// accidental logging of live session credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct RawCookie {
    /// Cookie name.
    pub name: String,
    /// The domain the cookie belongs to (e.g. `.example.com`).
    pub domain: String,
    /// Cookie value (sensitive — never log).
    value: String,
}

impl RawCookie {
    /// Creates a new raw cookie.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            domain: domain.into(),
            value: value.into(),
        }
    }

    /// Returns the cookie value.
    ///
    /// Cookie values are sensitive — avoid logging the return value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

// Custom Debug impl that redacts the cookie value.
impl fmt::Debug for RawCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawCookie")
            .field("name", &self.name)
            .field("domain", &self.domain)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// Errors surfaced by an automation backend.
#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    /// Network-level failure between the driver and the page (connection
    /// refused/reset, malformed response, navigation failure).
    #[error("transport error: {message}")]
    Transport {
        /// Description of the underlying failure.
        message: String,
    },

    /// The automation session terminated unexpectedly mid-operation.
    #[error("browser session terminated unexpectedly: {message}")]
    Crash {
        /// Description of the termination.
        message: String,
    },

    /// A single driver operation exceeded the backend's own request timeout.
    #[error("browser operation timed out")]
    Timeout,
}

impl BrowserError {
    /// Creates a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a crash error.
    pub fn crash(message: impl Into<String>) -> Self {
        Self::Crash {
            message: message.into(),
        }
    }
}

/// Capability interface over one live browser session.
///
/// The session is launched once and reused for the whole URL batch; `quit`
/// terminates it at the end of the run.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Navigates to `url` and reports whether the page already shows an
    /// authenticated session for the configured identity.
    async fn is_authenticated(&self, url: &str) -> Result<bool, BrowserError>;

    /// Attempts an automatic login on `url` and reports whether it succeeded.
    async fn authenticate(&self, url: &str) -> Result<bool, BrowserError>;

    /// Returns the URL currently displayed (after any redirects).
    async fn current_url(&self) -> Result<String, BrowserError>;

    /// Returns all cookies visible to the session, in the order the backend
    /// reports them (duplicates across redirects included).
    async fn cookies(&self) -> Result<Vec<RawCookie>, BrowserError>;

    /// Writes a screenshot of the current page to `path`.
    async fn save_screenshot(&self, path: &Path) -> Result<(), BrowserError>;

    /// Terminates the session.
    async fn quit(&self) -> Result<(), BrowserError>;
}

/// Classifies a chromiumoxide error into the session error taxonomy.
///
/// Lost websocket/channel conditions mean the browser process is gone
/// (crash); an explicit timeout maps to `Timeout`; everything else is
/// transport-level.
pub(crate) fn classify_cdp_error(error: &chromiumoxide::error::CdpError) -> BrowserError {
    use chromiumoxide::error::CdpError;

    match error {
        CdpError::Timeout => BrowserError::Timeout,
        CdpError::Ws(_) | CdpError::ChannelSendError(_) => BrowserError::crash(error.to_string()),
        _ => BrowserError::transport(error.to_string()),
    }
}
