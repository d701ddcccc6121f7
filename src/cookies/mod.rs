//! Cookie deduplication and classification.
//!
//! Raw cookies accumulate exact duplicates across redirects. The detection
//! method assumes a unique set, so duplicates are collapsed before
//! classification and persistence. Classification labels each unique cookie
//! with two independent flags derived from the domain's cookie metadata:
//! script-readable (page script can see it) and transport-only (flagged
//! HttpOnly).

pub mod metadata;

use std::collections::HashSet;
use std::fmt;

use crate::browser::RawCookie;

/// A deduplicated cookie with its classification flags, ready to persist.
///
/// The value is persisted but redacted in Debug output.
#[derive(Clone)]
pub struct CookieRecord {
    /// Cookie name.
    pub name: String,
    /// Cookie value.
    pub value: String,
    /// The domain the cookie belongs to.
    pub domain: String,
    /// Page script can read this cookie (it is absent from the domain's
    /// script-inaccessible name set).
    pub is_script_readable: bool,
    /// The cookie is flagged HttpOnly for this domain.
    pub is_transport_only: bool,
}

// Custom Debug impl that redacts the cookie value.
impl fmt::Debug for CookieRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieRecord")
            .field("name", &self.name)
            .field("domain", &self.domain)
            .field("value", &"[REDACTED]")
            .field("is_script_readable", &self.is_script_readable)
            .field("is_transport_only", &self.is_transport_only)
            .finish()
    }
}

/// Collapses a raw cookie sequence into a unique set.
///
/// The deduplication key is (name, value, domain); first-seen order is
/// preserved. An already-unique input comes back unchanged.
#[must_use]
pub fn dedupe_cookies(cookies: Vec<RawCookie>) -> Vec<RawCookie> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(cookies.len());

    for cookie in cookies {
        let key = (
            cookie.name.clone(),
            cookie.value().to_string(),
            cookie.domain.clone(),
        );
        if seen.insert(key) {
            unique.push(cookie);
        }
    }

    unique
}

/// Labels each unique cookie against the domain's metadata sets.
///
/// A cookie may carry both flags, neither, or exactly one; they are
/// independent booleans, not an enum.
#[must_use]
pub fn classify_cookies(
    unique: Vec<RawCookie>,
    script_inaccessible: &HashSet<String>,
    http_only: &HashSet<String>,
) -> Vec<CookieRecord> {
    unique
        .into_iter()
        .map(|cookie| CookieRecord {
            is_script_readable: !script_inaccessible.contains(&cookie.name),
            is_transport_only: http_only.contains(&cookie.name),
            value: cookie.value().to_string(),
            name: cookie.name,
            domain: cookie.domain,
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn cookie(name: &str, value: &str, domain: &str) -> RawCookie {
        RawCookie::new(name, value, domain)
    }

    fn names(items: &[&str]) -> HashSet<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_dedupe_removes_exact_duplicates() {
        let unique = dedupe_cookies(vec![
            cookie("sid", "abc", ".example.com"),
            cookie("sid", "abc", ".example.com"),
            cookie("lang", "en", ".example.com"),
        ]);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].name, "sid");
        assert_eq!(unique[1].name, "lang");
    }

    #[test]
    fn test_dedupe_keeps_same_name_different_value() {
        let unique = dedupe_cookies(vec![
            cookie("sid", "abc", ".example.com"),
            cookie("sid", "def", ".example.com"),
        ]);
        assert_eq!(unique.len(), 2, "differing values are distinct cookies");
    }

    #[test]
    fn test_dedupe_keeps_same_name_different_domain() {
        let unique = dedupe_cookies(vec![
            cookie("sid", "abc", ".example.com"),
            cookie("sid", "abc", ".cdn.example.com"),
        ]);
        assert_eq!(unique.len(), 2, "differing domains are distinct cookies");
    }

    #[test]
    fn test_dedupe_is_idempotent_and_order_preserving() {
        let input = vec![
            cookie("c", "3", ".example.com"),
            cookie("a", "1", ".example.com"),
            cookie("b", "2", ".example.com"),
        ];
        let once = dedupe_cookies(input.clone());
        assert_eq!(once, input, "already-unique input must come back unchanged");

        let twice = dedupe_cookies(once.clone());
        assert_eq!(twice, once);
    }

    #[test]
    fn test_dedupe_output_never_larger_than_input() {
        let input = vec![
            cookie("a", "1", ".example.com"),
            cookie("a", "1", ".example.com"),
            cookie("a", "1", ".example.com"),
        ];
        let output = dedupe_cookies(input.clone());
        assert!(output.len() <= input.len());
        assert_eq!(output.len(), 1);
    }

    #[test]
    fn test_classify_marks_script_readable_when_absent_from_inaccessible_set() {
        let records = classify_cookies(
            vec![cookie("sid", "abc", ".example.com")],
            &names(&["tracker"]),
            &names(&[]),
        );
        assert!(records[0].is_script_readable);
        assert!(!records[0].is_transport_only);
    }

    #[test]
    fn test_classify_flags_are_independent() {
        // In the inaccessible set AND flagged HttpOnly.
        let both = classify_cookies(
            vec![cookie("sid", "abc", ".example.com")],
            &names(&["sid"]),
            &names(&["sid"]),
        );
        assert!(!both[0].is_script_readable);
        assert!(both[0].is_transport_only);

        // Readable AND flagged HttpOnly at the same time is representable.
        let mixed = classify_cookies(
            vec![cookie("sid", "abc", ".example.com")],
            &names(&[]),
            &names(&["sid"]),
        );
        assert!(mixed[0].is_script_readable);
        assert!(mixed[0].is_transport_only);
    }

    #[test]
    fn test_cookie_record_debug_redacts_value() {
        let record = classify_cookies(
            vec![cookie("sid", "super-secret", ".example.com")],
            &names(&[]),
            &names(&[]),
        )
        .remove(0);
        let debug = format!("{record:?}");
        assert!(!debug.contains("super-secret"), "value leaked in: {debug}");
    }
}
