//! Authtokens Core Library
//!
//! This library provides the core functionality for the authtokens tool,
//! which authenticates into target sites, harvests the resulting session
//! cookies and computes which of them function as authentication tokens.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`db`] - Database connection and schema management
//! - [`store`] - Per-URL result persistence with cascade-delete integrity
//! - [`browser`] - Browser capability interface and its two Chrome sessions
//! - [`cookies`] - Cookie deduplication, classification and metadata
//! - [`scorer`] - Token scorer contract and the replay implementation
//! - [`pipeline`] - Per-URL state machine, deadline supervisor, orchestrator
//! - [`domain`] - URL validation and offline registrable-domain extraction
//! - [`artifacts`] - Per-domain diagnostic captures and cleanup
//! - [`identity`] - The account identity under test

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod artifacts;
pub mod browser;
pub mod cookies;
pub mod db;
pub mod domain;
pub mod identity;
pub mod pipeline;
pub mod scorer;
pub mod store;

// Re-export commonly used types
pub use browser::{
    BrowserError, BrowserSession, ChromeOptions, HeadlessBrowser, InteractiveBrowser, RawCookie,
};
pub use cookies::metadata::{
    CookieMetadata, CookieNameSets, FixedCookieMetadata, SessionCookieMetadata,
};
pub use cookies::{CookieRecord, classify_cookies, dedupe_cookies};
pub use db::{Database, DbError};
pub use domain::{normalize_url, registrable_domain};
pub use identity::Identity;
pub use pipeline::{
    AuthMode, AuthState, BatchStats, CancellationError, DEFAULT_SECONDS_TO_LOGIN,
    DEFAULT_THRESHOLD, DeadlineSupervisor, Pipeline, PipelineConfig, PipelineError, UrlFailure,
    UrlOutcome, run_authentication,
};
pub use scorer::{ReplayScorer, ScorerError, TokenCandidate, TokenScorer, enforce_contract};
pub use store::{Store, StoreError, StoredCookie, StoredToken, StoredWebsite, WebsiteRecord};
