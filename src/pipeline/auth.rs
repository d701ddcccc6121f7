//! Per-URL authentication state machine.
//!
//! A page that already looks authenticated before any login action is
//! classified ambiguous and abandoned: tokens extracted from a session of
//! unknown provenance cannot be attributed to the supplied identity. This
//! distrust of pre-existing sessions is deliberate (one could instead try
//! detection against them) and is kept as-is rather than "fixed".

use std::time::Duration;

use tracing::{debug, info, instrument};

use crate::browser::{BrowserError, BrowserSession};

/// How the login step is performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// The session drives the login form itself.
    Automatic,
    /// The operator logs in out-of-band while the pipeline waits.
    Manual {
        /// How long the operator has to complete the login.
        wait: Duration,
    },
}

/// States of the per-URL authentication attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// Initial state; no check performed yet.
    Unauthenticated,
    /// The page looked authenticated before any action; untrustworthy.
    Ambiguous,
    /// Automatic login in flight.
    AutoAuthenticating,
    /// Waiting for the operator to log in.
    ManualWaiting,
    /// Login verified.
    Authenticated,
    /// Login attempt did not produce an authenticated session.
    Failed,
}

impl AuthState {
    /// Returns a short label for log output.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Ambiguous => "ambiguous",
            Self::AutoAuthenticating => "auto_authenticating",
            Self::ManualWaiting => "manual_waiting",
            Self::Authenticated => "authenticated",
            Self::Failed => "failed",
        }
    }

    /// True for the states a URL attempt can end in.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ambiguous | Self::Authenticated | Self::Failed)
    }
}

fn transition(from: AuthState, to: AuthState) -> AuthState {
    debug!(from = from.as_str(), to = to.as_str(), "auth state transition");
    to
}

/// Runs one authentication attempt and returns its terminal state.
///
/// Ambiguity short-circuits before mode dispatch; there is no retry within a
/// single URL's attempt.
///
/// # Errors
///
/// Returns a [`BrowserError`] when a browser round-trip fails; the caller
/// downgrades it to a per-URL failure.
#[instrument(skip(browser))]
pub async fn run_authentication(
    browser: &dyn BrowserSession,
    url: &str,
    mode: AuthMode,
) -> Result<AuthState, BrowserError> {
    let mut state = AuthState::Unauthenticated;

    if browser.is_authenticated(url).await? {
        info!(url, "page is ambiguous: authenticated before any login action");
        return Ok(transition(state, AuthState::Ambiguous));
    }

    match mode {
        AuthMode::Automatic => {
            state = transition(state, AuthState::AutoAuthenticating);
            let current = browser.current_url().await?;
            let verdict = browser.authenticate(&current).await?;
            Ok(transition(
                state,
                if verdict {
                    AuthState::Authenticated
                } else {
                    AuthState::Failed
                },
            ))
        }
        AuthMode::Manual { wait } => {
            state = transition(state, AuthState::ManualWaiting);
            info!(
                seconds = wait.as_secs(),
                "manual mode: log in now, detection resumes after the wait"
            );
            tokio::time::sleep(wait).await;

            let current = browser.current_url().await?;
            let verdict = browser.is_authenticated(&current).await?;
            Ok(transition(
                state,
                if verdict {
                    AuthState::Authenticated
                } else {
                    AuthState::Failed
                },
            ))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_state_labels() {
        assert_eq!(AuthState::Ambiguous.as_str(), "ambiguous");
        assert_eq!(AuthState::Authenticated.as_str(), "authenticated");
        assert_eq!(AuthState::ManualWaiting.as_str(), "manual_waiting");
    }

    #[test]
    fn test_terminal_states() {
        assert!(AuthState::Ambiguous.is_terminal());
        assert!(AuthState::Authenticated.is_terminal());
        assert!(AuthState::Failed.is_terminal());
        assert!(!AuthState::Unauthenticated.is_terminal());
        assert!(!AuthState::AutoAuthenticating.is_terminal());
        assert!(!AuthState::ManualWaiting.is_terminal());
    }
}
