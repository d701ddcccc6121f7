//! Detection pipeline orchestration.
//!
//! Processes the URL batch sequentially: each URL runs to completion
//! (success, failure or skip) before the next begins. Per-URL conditions
//! (ambiguity, failed login, transport errors, deadline expiry, browser
//! crashes) are downgraded to a recorded failure for that URL only. A
//! persistence failure aborts the batch: durability can no longer be
//! guaranteed to the operator.
//!
//! # Overview
//!
//! Per URL: scheme validation → normalization and registrable-domain
//! extraction → deadline armed → authentication state machine → cookie
//! dedup → classification → token scoring → deadline disarmed → verdict
//! (`failed` = empty token list) → failure capture or one-transaction
//! persist → per-domain artifact cleanup.

pub mod auth;
pub mod deadline;
pub mod error;

pub use auth::{AuthMode, AuthState, run_authentication};
pub use deadline::{CancellationError, DeadlineError, DeadlineSupervisor};
pub use error::{PipelineError, UrlFailure};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};
use url::Url;

use crate::artifacts;
use crate::browser::BrowserSession;
use crate::cookies::metadata::CookieMetadata;
use crate::cookies::{CookieRecord, classify_cookies, dedupe_cookies};
use crate::domain::{normalize_url, registrable_domain};
use crate::scorer::{TokenCandidate, TokenScorer};
use crate::store::{Store, WebsiteRecord};

/// Default authentication-confidence threshold.
pub const DEFAULT_THRESHOLD: f64 = 0.3;

/// Default seconds granted for a manual login.
pub const DEFAULT_SECONDS_TO_LOGIN: u64 = 30;

/// Pipeline configuration for one batch run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Authentication-confidence threshold for the scorer.
    pub threshold: f64,
    /// Maximum number of tokens to keep per URL (None = unbounded).
    pub max_tokens: Option<usize>,
    /// Per-URL wall-clock limit (None = unbounded).
    pub per_url_timeout: Option<Duration>,
    /// Login mode.
    pub mode: AuthMode,
    /// Directory for diagnostic captures.
    pub capture_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            max_tokens: None,
            per_url_timeout: None,
            mode: AuthMode::Automatic,
            capture_dir: PathBuf::from(artifacts::DEFAULT_CAPTURE_DIR),
        }
    }
}

/// Statistics from one batch run.
#[derive(Debug, Default, Clone, Copy)]
pub struct BatchStats {
    succeeded: usize,
    failed: usize,
    skipped: usize,
}

impl BatchStats {
    /// URLs whose detection produced at least one token.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.succeeded
    }

    /// URLs recorded with `failed = true`.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed
    }

    /// URLs skipped at validation (no record at all).
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// All URLs seen by the batch.
    #[must_use]
    pub fn total(&self) -> usize {
        self.succeeded + self.failed + self.skipped
    }
}

/// Outcome of one URL's processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlOutcome {
    /// Recorded with tokens.
    Succeeded,
    /// Recorded with `failed = true`.
    Failed,
    /// Not recorded (validation skip).
    Skipped,
}

/// What a successful detection produced.
struct Detection {
    cookies: Vec<CookieRecord>,
    tokens: Vec<TokenCandidate>,
}

/// The sequential per-URL orchestrator.
pub struct Pipeline {
    login: Arc<dyn BrowserSession>,
    probe: Arc<dyn BrowserSession>,
    metadata: Arc<dyn CookieMetadata>,
    scorer: Arc<dyn TokenScorer>,
    store: Store,
    supervisor: DeadlineSupervisor,
    config: PipelineConfig,
}

impl Pipeline {
    /// Creates a pipeline over the shared batch resources.
    ///
    /// `login` performs the authentication step; `probe` supplies diagnostic
    /// screenshots. Both sessions live for the whole batch.
    #[must_use]
    pub fn new(
        login: Arc<dyn BrowserSession>,
        probe: Arc<dyn BrowserSession>,
        metadata: Arc<dyn CookieMetadata>,
        scorer: Arc<dyn TokenScorer>,
        store: Store,
        config: PipelineConfig,
    ) -> Self {
        Self {
            login,
            probe,
            metadata,
            scorer,
            store,
            supervisor: DeadlineSupervisor::new(),
            config,
        }
    }

    /// Reports whether a per-URL deadline is currently armed.
    #[must_use]
    pub fn deadline_armed(&self) -> bool {
        self.supervisor.is_armed()
    }

    /// Processes every URL in order.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] only for batch-fatal conditions (store
    /// failure, supervisor misuse); no URL's own failure aborts the batch.
    #[instrument(skip(self, urls), fields(total = urls.len()))]
    pub async fn run_batch(&self, urls: &[String]) -> Result<BatchStats, PipelineError> {
        let mut stats = BatchStats::default();
        let total = urls.len();

        for (index, url) in urls.iter().enumerate() {
            info!(current = index + 1, total, "processing URL");

            match self.process_url(url).await? {
                UrlOutcome::Succeeded => stats.succeeded += 1,
                UrlOutcome::Failed => stats.failed += 1,
                UrlOutcome::Skipped => stats.skipped += 1,
            }
        }

        Ok(stats)
    }

    /// Processes one URL to completion.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] for batch-fatal conditions only.
    #[instrument(skip(self), fields(url = %raw_url))]
    pub async fn process_url(&self, raw_url: &str) -> Result<UrlOutcome, PipelineError> {
        let Some(url) = normalize_url(raw_url) else {
            info!(url = %raw_url, "url is not valid, skipping");
            return Ok(UrlOutcome::Skipped);
        };

        let Some(domain) = registrable_domain(&url) else {
            info!(url = %url, "url has no usable host, skipping");
            return Ok(UrlOutcome::Skipped);
        };
        info!(domain = %domain, "extracted domain");

        let guard = self.supervisor.arm(self.config.per_url_timeout)?;
        let bounded = guard.bound(self.detect(&url, &domain)).await;
        // Deadline disarmed here on every path: the guard's drop runs before
        // failure capture and persistence.
        drop(guard);

        let detection = match bounded {
            Ok(result) => result,
            Err(_cancelled) => Err(UrlFailure::Cancelled),
        };

        match detection {
            Ok(found) => {
                info!(
                    tokens = found.tokens.len(),
                    cookies = found.cookies.len(),
                    "authentication tokens detected"
                );

                let website = WebsiteRecord {
                    domain: domain.clone(),
                    source_url: url.to_string(),
                    failed: false,
                };
                self.store
                    .record_result(&website, &found.cookies, &found.tokens)
                    .await?;

                self.cleanup(&domain, false);
                Ok(UrlOutcome::Succeeded)
            }
            Err(failure) => {
                warn!(kind = failure.kind(), error = %failure, "url failed");

                self.capture_failure(url.as_str(), &domain, &failure).await;

                // Cookies collected along the way are never persisted on
                // failure.
                let website = WebsiteRecord {
                    domain: domain.clone(),
                    source_url: url.to_string(),
                    failed: true,
                };
                self.store.record_result(&website, &[], &[]).await?;

                self.cleanup(&domain, true);
                Ok(UrlOutcome::Failed)
            }
        }
    }

    /// Runs authentication and token detection for one URL.
    async fn detect(&self, url: &Url, domain: &str) -> Result<Detection, UrlFailure> {
        let state = run_authentication(self.login.as_ref(), url.as_str(), self.config.mode).await?;

        match state {
            AuthState::Ambiguous => return Err(UrlFailure::Ambiguous),
            AuthState::Authenticated => info!("login successful"),
            _ => return Err(UrlFailure::AuthenticationFailed),
        }

        // Current URL and cookies are read after authentication; the login
        // may have redirected.
        let post_auth_url = self.login.current_url().await?;
        let raw_cookies = self.login.cookies().await?;

        let unique = dedupe_cookies(raw_cookies);
        info!(count = unique.len(), "collected unique cookies");

        let sets = self.metadata.http_cookie_names(domain).await?;
        let classified = classify_cookies(unique, &sets.script_inaccessible, &sets.http_only);

        let tokens = self
            .scorer
            .detect_tokens(
                &post_auth_url,
                &classified,
                self.config.threshold,
                self.config.max_tokens,
            )
            .await?;

        if tokens.is_empty() {
            return Err(UrlFailure::NoTokensFound);
        }

        Ok(Detection {
            cookies: classified,
            tokens,
        })
    }

    /// Best-effort failure diagnostics: a screenshot keyed by domain plus a
    /// sidecar report describing what went wrong.
    async fn capture_failure(&self, url: &str, domain: &str, failure: &UrlFailure) {
        let path = artifacts::screenshot_path(&self.config.capture_dir, domain);
        match self.probe.save_screenshot(&path).await {
            Ok(()) => info!(path = %path.display(), "screenshot saved"),
            Err(error) => warn!(error = %error, "failed to capture diagnostic screenshot"),
        }

        let report = artifacts::FailureReport {
            domain,
            url,
            kind: failure.kind(),
            message: failure.to_string(),
        };
        if let Err(error) = artifacts::write_failure_report(&self.config.capture_dir, &report) {
            warn!(error = %error, "failed to write failure report");
        }
    }

    /// Best-effort transient artifact cleanup for a domain.
    fn cleanup(&self, domain: &str, keep_diagnostics: bool) {
        if let Err(error) =
            artifacts::clean_domain_artifacts(&self.config.capture_dir, domain, keep_diagnostics)
        {
            warn!(error = %error, domain, "artifact cleanup failed");
        }
    }
}
