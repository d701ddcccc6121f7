//! Token scorer contract.
//!
//! Given the authenticated URL and the unique classified cookie set, a
//! scorer returns a ranked list of authentication-token candidates. The
//! contract is enforced here for every implementation:
//! - every returned confidence is >= the supplied threshold (lower-scoring
//!   candidates are excluded, not merely ranked lower)
//! - output length is <= the maximum token count when one is set
//! - identical inputs yield identical ordered output
//!
//! Empty output is a valid, non-exceptional result; the pipeline treats it
//! as "analysis failed".

mod replay;

pub use replay::ReplayScorer;

use std::fmt;

use async_trait::async_trait;

use crate::browser::BrowserError;
use crate::cookies::CookieRecord;

/// A candidate authentication token.
///
/// The value is persisted but redacted in Debug output.
#[derive(Clone)]
pub struct TokenCandidate {
    /// Cookie name of the candidate.
    pub name: String,
    /// Cookie value of the candidate.
    pub value: String,
    /// Confidence that replaying this cookie restores the session.
    pub confidence: f64,
}

impl TokenCandidate {
    /// Creates a new candidate.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>, confidence: f64) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            confidence,
        }
    }
}

// Custom Debug impl that redacts the token value.
impl fmt::Debug for TokenCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCandidate")
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .field("confidence", &self.confidence)
            .finish()
    }
}

/// Errors surfaced by a token scorer.
#[derive(Debug, thiserror::Error)]
pub enum ScorerError {
    /// The scoring backend failed.
    #[error("scorer backend error: {0}")]
    Browser(#[from] BrowserError),
}

/// Capability computing authentication tokens from a unique cookie set.
#[async_trait]
pub trait TokenScorer: Send + Sync {
    /// Returns the ranked token candidates for `url`.
    ///
    /// The returned sequence satisfies the module contract: filtered by
    /// `threshold`, bounded by `max_tokens`, deterministic for identical
    /// inputs. An empty sequence means the analysis found no token.
    async fn detect_tokens(
        &self,
        url: &str,
        cookies: &[CookieRecord],
        threshold: f64,
        max_tokens: Option<usize>,
    ) -> Result<Vec<TokenCandidate>, ScorerError>;
}

/// Applies the contract's postconditions to a raw candidate list.
///
/// Candidates below `threshold` are dropped, the survivors are ordered by
/// descending confidence with input order as the tie-break, and the result
/// is truncated to `max_tokens` when set.
#[must_use]
pub fn enforce_contract(
    mut candidates: Vec<TokenCandidate>,
    threshold: f64,
    max_tokens: Option<usize>,
) -> Vec<TokenCandidate> {
    candidates.retain(|candidate| candidate.confidence >= threshold);

    // Stable sort keeps first-seen order under equal confidence, which is
    // what makes the ranking deterministic.
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    if let Some(max) = max_tokens {
        candidates.truncate(max);
    }

    candidates
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn candidate(name: &str, confidence: f64) -> TokenCandidate {
        TokenCandidate::new(name, "value", confidence)
    }

    #[test]
    fn test_enforce_contract_drops_below_threshold() {
        let out = enforce_contract(
            vec![candidate("a", 0.9), candidate("b", 0.1)],
            0.3,
            None,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "a");
    }

    #[test]
    fn test_enforce_contract_threshold_is_inclusive() {
        let out = enforce_contract(vec![candidate("a", 0.3)], 0.3, None);
        assert_eq!(out.len(), 1, "confidence equal to threshold is kept");
    }

    #[test]
    fn test_enforce_contract_orders_by_descending_confidence() {
        let out = enforce_contract(
            vec![candidate("low", 0.4), candidate("high", 0.9)],
            0.3,
            None,
        );
        assert_eq!(out[0].name, "high");
        assert_eq!(out[1].name, "low");
    }

    #[test]
    fn test_enforce_contract_tie_break_is_input_order() {
        let out = enforce_contract(
            vec![candidate("first", 0.5), candidate("second", 0.5)],
            0.3,
            None,
        );
        assert_eq!(out[0].name, "first");
        assert_eq!(out[1].name, "second");
    }

    #[test]
    fn test_enforce_contract_truncates_to_max_tokens() {
        let out = enforce_contract(
            vec![candidate("a", 0.9), candidate("b", 0.8), candidate("c", 0.7)],
            0.3,
            Some(2),
        );
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].name, "a");
        assert_eq!(out[1].name, "b");
    }

    #[test]
    fn test_enforce_contract_empty_input_is_valid() {
        let out = enforce_contract(Vec::new(), 0.3, Some(5));
        assert!(out.is_empty());
    }

    #[test]
    fn test_token_candidate_debug_redacts_value() {
        let token = TokenCandidate::new("sid", "super-secret", 0.9);
        let debug = format!("{token:?}");
        assert!(!debug.contains("super-secret"), "value leaked in: {debug}");
    }
}
