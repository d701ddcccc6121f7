//! Per-domain cookie metadata capability.
//!
//! Classification needs to know, for a domain, which cookie names page
//! script cannot read and which are flagged HttpOnly. The live-session
//! implementation answers both questions over the DevTools protocol: the
//! devtools cookie listing carries the HttpOnly flag, and diffing that
//! listing against what `document.cookie` exposes yields the
//! script-inaccessible names.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;

use crate::browser::{BrowserError, BrowserSession, InteractiveBrowser};

/// The two name sets classification consults for a domain.
#[derive(Debug, Default, Clone)]
pub struct CookieNameSets {
    /// Names page script cannot read.
    pub script_inaccessible: HashSet<String>,
    /// Names flagged HttpOnly.
    pub http_only: HashSet<String>,
}

/// Capability supplying per-domain cookie name sets.
#[async_trait]
pub trait CookieMetadata: Send + Sync {
    /// Returns the metadata sets for `domain`.
    async fn http_cookie_names(&self, domain: &str) -> Result<CookieNameSets, BrowserError>;
}

/// Metadata sourced from the live interactive session.
pub struct SessionCookieMetadata {
    session: Arc<InteractiveBrowser>,
}

impl SessionCookieMetadata {
    /// Creates a metadata source over the given session.
    #[must_use]
    pub fn new(session: Arc<InteractiveBrowser>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl CookieMetadata for SessionCookieMetadata {
    #[instrument(skip(self))]
    async fn http_cookie_names(&self, domain: &str) -> Result<CookieNameSets, BrowserError> {
        let http_only: HashSet<String> = self
            .session
            .http_only_cookie_names()
            .await?
            .into_iter()
            .collect();

        let script_readable: HashSet<String> = self
            .session
            .script_readable_cookie_names()
            .await?
            .into_iter()
            .collect();

        // Everything the devtools listing reports but document.cookie does
        // not expose is inaccessible to script on this domain.
        let all: HashSet<String> = self
            .session
            .cookies()
            .await?
            .into_iter()
            .filter(|cookie| {
                let trimmed = cookie.domain.trim_start_matches('.');
                trimmed == domain || trimmed.ends_with(&format!(".{domain}")) || domain.is_empty()
            })
            .map(|cookie| cookie.name)
            .collect();

        let script_inaccessible = all
            .difference(&script_readable)
            .cloned()
            .collect::<HashSet<String>>();

        Ok(CookieNameSets {
            script_inaccessible,
            http_only,
        })
    }
}

/// Fixed name sets, for tests and offline runs.
#[derive(Debug, Default, Clone)]
pub struct FixedCookieMetadata {
    sets: CookieNameSets,
}

impl FixedCookieMetadata {
    /// Creates a metadata source that always answers with `sets`.
    #[must_use]
    pub fn new(sets: CookieNameSets) -> Self {
        Self { sets }
    }
}

#[async_trait]
impl CookieMetadata for FixedCookieMetadata {
    async fn http_cookie_names(&self, _domain: &str) -> Result<CookieNameSets, BrowserError> {
        Ok(self.sets.clone())
    }
}
