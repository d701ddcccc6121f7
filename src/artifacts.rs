//! Per-domain capture artifacts: diagnostic screenshots, failure reports
//! and their cleanup.

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, instrument};

/// Default directory for diagnostic captures.
pub const DEFAULT_CAPTURE_DIR: &str = "captures";

/// Ensures the capture directory exists.
///
/// # Errors
///
/// Returns IO errors when the directory cannot be created.
pub fn ensure_capture_dir(dir: &Path) -> io::Result<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
        debug!(dir = %dir.display(), "created capture directory");
    }
    Ok(())
}

/// Returns the screenshot path for a domain (`<dir>/<domain>.png`).
#[must_use]
pub fn screenshot_path(dir: &Path, domain: &str) -> PathBuf {
    dir.join(format!("{domain}.png"))
}

/// Returns the failure-report path for a domain
/// (`<dir>/<domain>.failure.json`).
#[must_use]
pub fn failure_report_path(dir: &Path, domain: &str) -> PathBuf {
    dir.join(format!("{domain}.failure.json"))
}

/// Diagnostic sidecar written next to the screenshot of a failed URL.
#[derive(Debug, Serialize)]
pub struct FailureReport<'a> {
    /// Registrable domain of the failed URL.
    pub domain: &'a str,
    /// The URL as processed.
    pub url: &'a str,
    /// Short failure category.
    pub kind: &'a str,
    /// Human-readable failure description.
    pub message: String,
}

/// Writes the failure-report sidecar for a domain.
///
/// # Errors
///
/// Returns IO errors when the file cannot be written, or a serialization
/// error mapped to `InvalidData`.
#[instrument(skip(dir, report), fields(domain = %report.domain))]
pub fn write_failure_report(dir: &Path, report: &FailureReport<'_>) -> io::Result<PathBuf> {
    let path = failure_report_path(dir, report.domain);
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    std::fs::write(&path, json)?;
    Ok(path)
}

/// Removes transient artifacts for a domain, returning how many files went.
///
/// Matches any file whose name is the domain or starts with `<domain>.`,
/// so `example.com.png` and `example.com.failure.json` are both covered.
/// With `keep_diagnostics` set, the screenshot and failure report of the
/// current run survive; they are the audit record of a failed URL.
///
/// # Errors
///
/// Returns IO errors when the directory cannot be read or a file cannot be
/// removed.
#[instrument(skip(dir), fields(dir = %dir.display()))]
pub fn clean_domain_artifacts(
    dir: &Path,
    domain: &str,
    keep_diagnostics: bool,
) -> io::Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let screenshot = screenshot_path(dir, domain);
    let report = failure_report_path(dir, domain);
    let mut removed = 0;

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if !(file_name == domain || file_name.starts_with(&format!("{domain}."))) {
            continue;
        }
        if keep_diagnostics && (path == screenshot || path == report) {
            continue;
        }

        std::fs::remove_file(&path)?;
        removed += 1;
    }

    if removed > 0 {
        debug!(domain, removed, "cleaned domain artifacts");
    }
    Ok(removed)
}
