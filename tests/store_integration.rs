//! Persistence-layer integration tests against a file-backed database.

use authtokens_core::{CookieRecord, Database, Store, TokenCandidate, WebsiteRecord};

fn website(domain: &str, failed: bool) -> WebsiteRecord {
    WebsiteRecord {
        domain: domain.to_string(),
        source_url: format!("https://{domain}/login"),
        failed,
    }
}

fn cookie(name: &str) -> CookieRecord {
    CookieRecord {
        name: name.to_string(),
        value: "value".to_string(),
        domain: ".example.com".to_string(),
        is_script_readable: true,
        is_transport_only: false,
    }
}

// Each URL commits its own transaction: rows written before an interruption
// stay durable and visible to a later connection.
#[tokio::test]
async fn test_per_url_commits_survive_reopen() {
    let temp = tempfile::tempdir().unwrap();
    let db_path = temp.path().join("cookies.db");

    {
        let db = Database::new(&db_path).await.unwrap();
        let store = Store::new(db.clone());

        store
            .record_result(
                &website("one.example", false),
                &[cookie("sid")],
                &[TokenCandidate::new("sid", "value", 0.9)],
            )
            .await
            .unwrap();
        store
            .record_result(&website("two.example", true), &[], &[])
            .await
            .unwrap();

        // Simulated interruption: the pool goes away without any batch-end
        // bookkeeping.
        db.close().await;
    }

    let db = Database::new(&db_path).await.unwrap();
    let store = Store::new(db);

    let first = store.websites_for_domain("one.example").await.unwrap();
    assert_eq!(first.len(), 1);
    assert!(!first[0].failed);
    assert_eq!(store.tokens_for_website(first[0].id).await.unwrap().len(), 1);

    let second = store.websites_for_domain("two.example").await.unwrap();
    assert_eq!(second.len(), 1);
    assert!(second[0].failed);
}

// An invariant-violating payload commits nothing at all.
#[tokio::test]
async fn test_rejected_write_leaves_no_partial_rows() {
    let db = Database::new_in_memory().await.unwrap();
    let store = Store::new(db);

    let result = store
        .record_result(&website("example.com", true), &[cookie("sid")], &[])
        .await;
    assert!(result.is_err());

    assert!(
        store
            .websites_for_domain("example.com")
            .await
            .unwrap()
            .is_empty(),
        "no website row may exist after a rejected write"
    );
}

// Cascade delete removes children through the public maintenance surface.
#[tokio::test]
async fn test_delete_website_cascades_on_file_database() {
    let temp = tempfile::tempdir().unwrap();
    let db_path = temp.path().join("cookies.db");
    let db = Database::new(&db_path).await.unwrap();
    let store = Store::new(db);

    let id = store
        .record_result(
            &website("example.com", false),
            &[cookie("sid"), cookie("lang")],
            &[TokenCandidate::new("sid", "value", 0.9)],
        )
        .await
        .unwrap();

    store.delete_website(id).await.unwrap();

    assert!(store.cookies_for_website(id).await.unwrap().is_empty());
    assert!(store.tokens_for_website(id).await.unwrap().is_empty());
}

// Repeated runs append website rows per (domain, source_url) sighting rather
// than upserting.
#[tokio::test]
async fn test_repeated_runs_append_rows() {
    let db = Database::new_in_memory().await.unwrap();
    let store = Store::new(db);

    for _ in 0..2 {
        store
            .record_result(&website("example.com", true), &[], &[])
            .await
            .unwrap();
    }

    let rows = store.websites_for_domain("example.com").await.unwrap();
    assert_eq!(rows.len(), 2);
}
