//! Single-cookie replay scorer.
//!
//! For each unique cookie the headless session is wiped, the lone candidate
//! is installed, the authenticated URL is reloaded, and the resulting page
//! is scored against the identity markers. A cookie whose replay alone
//! restores an authenticated-looking page is an authentication token; its
//! confidence is the marker score of the replayed page.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::{ScorerError, TokenCandidate, TokenScorer, enforce_contract};
use crate::browser::{HeadlessBrowser, RawCookie};
use crate::cookies::CookieRecord;

/// Replay-based token scorer backed by the headless session.
pub struct ReplayScorer {
    session: Arc<HeadlessBrowser>,
}

impl ReplayScorer {
    /// Creates a scorer over the given headless session.
    #[must_use]
    pub fn new(session: Arc<HeadlessBrowser>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl TokenScorer for ReplayScorer {
    #[instrument(skip(self, cookies), fields(cookie_count = cookies.len()))]
    async fn detect_tokens(
        &self,
        url: &str,
        cookies: &[CookieRecord],
        threshold: f64,
        max_tokens: Option<usize>,
    ) -> Result<Vec<TokenCandidate>, ScorerError> {
        let mut candidates = Vec::new();

        for cookie in cookies {
            self.session.clear_cookies().await?;

            let raw = RawCookie::new(&cookie.name, &cookie.value, &cookie.domain);
            self.session.install_cookie(&raw).await?;

            let confidence = self.session.replay_score(url).await?;
            debug!(name = %cookie.name, confidence, "replayed candidate cookie");

            candidates.push(TokenCandidate::new(&cookie.name, &cookie.value, confidence));
        }

        // Leave no candidate cookie behind for the next URL.
        self.session.clear_cookies().await?;

        Ok(enforce_contract(candidates, threshold, max_tokens))
    }
}
