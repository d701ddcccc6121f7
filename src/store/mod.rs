//! Result persistence.
//!
//! One website row per processed URL, with its deduplicated classified
//! cookies and detected tokens as cascade-deleted children. Each
//! `record_result` call is one atomic unit of work committed immediately, so
//! an interruption after URL *k* leaves URLs `1..k` durably recorded.

use sqlx::FromRow;
use tracing::instrument;

use crate::cookies::CookieRecord;
use crate::db::Database;
use crate::scorer::TokenCandidate;

/// Persistence-layer errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The underlying store is unavailable or rejected the write.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The write would violate the website/children invariant.
    #[error("invariant violation: {reason}")]
    Invariant {
        /// Which invariant the write would break.
        reason: &'static str,
    },
}

/// Insert payload for one processed URL.
#[derive(Debug, Clone)]
pub struct WebsiteRecord {
    /// Registrable domain of the processed URL.
    pub domain: String,
    /// The URL as given in the input list (normalized).
    pub source_url: String,
    /// Whether detection failed for this URL.
    pub failed: bool,
}

/// Read model for persisted website rows.
#[derive(Debug, Clone, FromRow)]
pub struct StoredWebsite {
    /// Row id.
    pub id: i64,
    /// Registrable domain.
    pub domain: String,
    /// Source URL.
    pub source_url: String,
    /// Failure flag.
    pub failed: bool,
}

/// Read model for persisted cookie rows.
#[derive(Debug, Clone, FromRow)]
pub struct StoredCookie {
    /// Row id.
    pub id: i64,
    /// Cookie name.
    pub name: String,
    /// Cookie value.
    pub value: String,
    /// Cookie domain.
    pub domain: String,
    /// Script-readable flag.
    pub is_script_readable: bool,
    /// Transport-only (HttpOnly) flag.
    pub is_transport_only: bool,
}

/// Read model for persisted token rows.
#[derive(Debug, Clone, FromRow)]
pub struct StoredToken {
    /// Row id.
    pub id: i64,
    /// Token cookie name.
    pub name: String,
    /// Token cookie value.
    pub value: String,
    /// Zero-based rank in the scorer's ordering.
    pub rank: i64,
    /// Scorer confidence.
    pub confidence: f64,
}

/// Store over the shared database pool.
#[derive(Debug, Clone)]
pub struct Store {
    db: Database,
}

impl Store {
    /// Creates a store over the given database.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Persists one website with its cookies and tokens atomically.
    ///
    /// The parent/children invariant is checked before touching the
    /// database: a failed website carries no children, a successful one
    /// carries at least one token.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Invariant`] for an inconsistent payload and
    /// [`StoreError::Database`] when the store is unavailable or a
    /// constraint is violated. Either error means nothing from this call was
    /// committed.
    #[instrument(
        skip(self, cookies, tokens),
        fields(domain = %website.domain, failed = website.failed, cookies = cookies.len(), tokens = tokens.len())
    )]
    pub async fn record_result(
        &self,
        website: &WebsiteRecord,
        cookies: &[CookieRecord],
        tokens: &[TokenCandidate],
    ) -> Result<i64, StoreError> {
        if website.failed && (!cookies.is_empty() || !tokens.is_empty()) {
            return Err(StoreError::Invariant {
                reason: "a failed website must not carry cookies or tokens",
            });
        }
        if !website.failed && tokens.is_empty() {
            return Err(StoreError::Invariant {
                reason: "a successful website must carry at least one token",
            });
        }

        let mut tx = self.db.pool().begin().await?;

        let row: (i64,) = sqlx::query_as(
            r"INSERT INTO website (domain, source_url, failed)
              VALUES (?, ?, ?)
              RETURNING id",
        )
        .bind(&website.domain)
        .bind(&website.source_url)
        .bind(website.failed)
        .fetch_one(&mut *tx)
        .await?;
        let website_id = row.0;

        for cookie in cookies {
            sqlx::query(
                r"INSERT INTO cookie (website_id, name, value, domain, is_script_readable, is_transport_only)
                  VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(website_id)
            .bind(&cookie.name)
            .bind(&cookie.value)
            .bind(&cookie.domain)
            .bind(cookie.is_script_readable)
            .bind(cookie.is_transport_only)
            .execute(&mut *tx)
            .await?;
        }

        for (rank, token) in tokens.iter().enumerate() {
            sqlx::query(
                r"INSERT INTO token (website_id, name, value, rank, confidence)
                  VALUES (?, ?, ?, ?, ?)",
            )
            .bind(website_id)
            .bind(&token.name)
            .bind(&token.value)
            .bind(i64::try_from(rank).unwrap_or(i64::MAX))
            .bind(token.confidence)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(website_id)
    }

    /// Returns all website rows for a domain, oldest first.
    ///
    /// # Errors
    ///
    /// Returns database errors when query execution fails.
    pub async fn websites_for_domain(&self, domain: &str) -> Result<Vec<StoredWebsite>, StoreError> {
        let rows = sqlx::query_as::<_, StoredWebsite>(
            r"SELECT id, domain, source_url, failed
              FROM website
              WHERE domain = ?
              ORDER BY id",
        )
        .bind(domain)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows)
    }

    /// Returns the cookies stored for a website.
    ///
    /// # Errors
    ///
    /// Returns database errors when query execution fails.
    pub async fn cookies_for_website(&self, website_id: i64) -> Result<Vec<StoredCookie>, StoreError> {
        let rows = sqlx::query_as::<_, StoredCookie>(
            r"SELECT id, name, value, domain, is_script_readable, is_transport_only
              FROM cookie
              WHERE website_id = ?
              ORDER BY id",
        )
        .bind(website_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows)
    }

    /// Returns the tokens stored for a website, in rank order.
    ///
    /// # Errors
    ///
    /// Returns database errors when query execution fails.
    pub async fn tokens_for_website(&self, website_id: i64) -> Result<Vec<StoredToken>, StoreError> {
        let rows = sqlx::query_as::<_, StoredToken>(
            r"SELECT id, name, value, rank, confidence
              FROM token
              WHERE website_id = ?
              ORDER BY rank",
        )
        .bind(website_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows)
    }

    /// Deletes a website row; children go with it via cascade.
    ///
    /// # Errors
    ///
    /// Returns database errors when the delete fails.
    #[instrument(skip(self))]
    pub async fn delete_website(&self, website_id: i64) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM website WHERE id = ?")
            .bind(website_id)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }
}
