//! Failure taxonomy for the detection pipeline.
//!
//! Each pipeline stage returns explicit result kinds; the orchestrator
//! pattern-matches on them to choose the failure path instead of letting
//! exceptions steer control flow. Per-URL conditions are downgraded at the
//! URL boundary; only persistence failures and supervisor misuse abort the
//! batch.

use thiserror::Error;

use crate::browser::BrowserError;
use crate::pipeline::deadline::DeadlineError;
use crate::scorer::ScorerError;
use crate::store::StoreError;

/// Why one URL's detection failed.
///
/// Every variant follows the failure path: a `failed=true` website row, a
/// diagnostic screenshot attempt, and no cookie/token persistence.
#[derive(Debug, Error)]
pub enum UrlFailure {
    /// The page looked authenticated before any login action.
    #[error("page is ambiguous: authenticated before any login action")]
    Ambiguous,

    /// The login attempt did not produce an authenticated session.
    #[error("login failed")]
    AuthenticationFailed,

    /// Authentication succeeded but the scorer found no token.
    #[error("no authentication token detected")]
    NoTokensFound,

    /// Connection-level failure talking to the target.
    #[error("connection error: {message}")]
    Transport {
        /// Description of the underlying failure.
        message: String,
    },

    /// The per-URL deadline expired.
    #[error("operation timed out")]
    Cancelled,

    /// The automation session terminated unexpectedly.
    #[error("browser quit unexpectedly: {message}")]
    BrowserCrash {
        /// Description of the termination.
        message: String,
    },
}

impl UrlFailure {
    /// Returns a short category label for log fields.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ambiguous => "ambiguous",
            Self::AuthenticationFailed => "auth_failed",
            Self::NoTokensFound => "no_tokens",
            Self::Transport { .. } => "transport",
            Self::Cancelled => "cancelled",
            Self::BrowserCrash { .. } => "browser_crash",
        }
    }
}

impl From<BrowserError> for UrlFailure {
    fn from(error: BrowserError) -> Self {
        match error {
            BrowserError::Transport { message } => Self::Transport { message },
            BrowserError::Timeout => Self::Transport {
                message: "browser operation timed out".to_string(),
            },
            BrowserError::Crash { message } => Self::BrowserCrash { message },
        }
    }
}

impl From<ScorerError> for UrlFailure {
    fn from(error: ScorerError) -> Self {
        match error {
            ScorerError::Browser(browser) => browser.into(),
        }
    }
}

/// Conditions that abort the whole batch.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The store rejected a write; durability can no longer be guaranteed.
    #[error("persistence failure: {0}")]
    Store(#[from] StoreError),

    /// Supervisor misuse (overlapping deadlines); a bug, not a runtime
    /// condition.
    #[error("deadline supervisor misuse: {0}")]
    Deadline(#[from] DeadlineError),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_url_failure_kind_labels() {
        assert_eq!(UrlFailure::Ambiguous.kind(), "ambiguous");
        assert_eq!(UrlFailure::Cancelled.kind(), "cancelled");
        assert_eq!(
            UrlFailure::Transport {
                message: "refused".to_string()
            }
            .kind(),
            "transport"
        );
    }

    #[test]
    fn test_browser_error_downgrades_to_url_failure() {
        let failure: UrlFailure = BrowserError::crash("ws closed").into();
        assert!(matches!(failure, UrlFailure::BrowserCrash { .. }));

        let failure: UrlFailure = BrowserError::transport("refused").into();
        assert!(matches!(failure, UrlFailure::Transport { .. }));

        let failure: UrlFailure = BrowserError::Timeout.into();
        assert!(matches!(failure, UrlFailure::Transport { .. }));
    }
}
