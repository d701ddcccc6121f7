//! URL validation, normalization and offline registrable-domain extraction.

use tracing::{debug, trace};
use url::Url;

/// Validates and normalizes one candidate URL from the input list.
///
/// Only `http` and `https` schemes are accepted; anything else (including a
/// bare `example.com` with no scheme) is rejected so the caller can skip it
/// without creating a database record. Whitespace accumulated from copy-paste
/// input is stripped before parsing.
#[must_use]
pub fn normalize_url(raw: &str) -> Option<Url> {
    let cleaned: String = raw.trim().chars().filter(|c| !c.is_whitespace()).collect();

    if !(cleaned.starts_with("http://") || cleaned.starts_with("https://")) {
        trace!(input = %raw, "rejected: missing http/https scheme");
        return None;
    }

    match Url::parse(&cleaned) {
        Ok(url) => Some(url),
        Err(error) => {
            debug!(input = %cleaned, error = %error, "rejected: unparseable URL");
            None
        }
    }
}

/// Extracts the registrable domain from a URL using the embedded public
/// suffix list (offline, no network lookup).
///
/// `https://accounts.example.co.uk/login` yields `example.co.uk`. Hosts that
/// are not under a known suffix (IP literals, localhost) fall back to the
/// host string itself so failure capture still has a usable key.
#[must_use]
pub fn registrable_domain(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    match psl::domain_str(host) {
        Some(domain) => Some(domain.to_string()),
        None => Some(host.to_string()),
    }
}
