mod common;

use common::TestDb;
use serde_json::{Map, json};
use social_storage::StorageError;

#[tokio::test]
async fn test_code_make_get_verify() {
    let db = TestDb::new("code").await;
    let codes = &db.storage.code;

    assert!(codes.get_code("missing").await.unwrap().is_none());

    let mut code = codes.make_code("foo@bar.com").await.unwrap();
    assert_eq!(code.email, "foo@bar.com");
    assert_eq!(code.code.len(), 32);
    assert!(!code.verified);
    assert!(chrono::DateTime::parse_from_rfc3339(&code.issued).is_ok());

    let fetched = codes.get_code(&code.code).await.unwrap().unwrap();
    assert_eq!(fetched, code);

    codes.verify(&mut code).await.unwrap();
    assert!(code.verified);
    let fetched = codes.get_code(&code.code).await.unwrap().unwrap();
    assert!(fetched.verified);

    let other = codes.make_code("foo@bar.com").await.unwrap();
    assert_ne!(other.code, code.code);
}

#[tokio::test]
async fn test_partial_store_load_destroy() {
    let db = TestDb::new("partial").await;
    let partials = &db.storage.partial;

    let prepared = partials.prepare(
        "github",
        4,
        json!({"args": [], "kwargs": {"username": "foobar"}}),
    );
    assert!(prepared.id.is_none());
    let token = prepared.token.clone();

    let stored = partials.store(prepared).await.unwrap();
    assert!(stored.id.is_some());

    let loaded = partials.load(&token).await.unwrap().unwrap();
    assert_eq!(loaded, stored);
    assert_eq!(loaded.next_step, 4);
    assert_eq!(loaded.kwargs().get("username"), Some(&json!("foobar")));

    // Storing again under the same token updates in place
    let mut resumed = loaded.clone();
    let mut extra = Map::new();
    extra.insert("email".to_string(), json!("foo@bar.com"));
    resumed.extend_kwargs(extra);
    resumed.next_step = 5;
    let restored = partials.store(resumed).await.unwrap();
    assert_eq!(restored.id, stored.id);
    let reloaded = partials.load(&token).await.unwrap().unwrap();
    assert_eq!(reloaded.next_step, 5);
    assert_eq!(reloaded.kwargs().get("email"), Some(&json!("foo@bar.com")));

    partials.destroy(&token).await.unwrap();
    assert!(partials.load(&token).await.unwrap().is_none());

    // Unknown tokens are a no-op
    partials.destroy("no-such-token").await.unwrap();
    partials.destroy(&token).await.unwrap();
}

#[tokio::test]
async fn test_partial_with_null_data() {
    let db = TestDb::new("partial_null").await;
    let partials = &db.storage.partial;

    let mut prepared = partials.prepare("google", 1, json!(null));
    prepared.data = None;
    let token = prepared.token.clone();
    partials.store(prepared).await.unwrap();

    let loaded = partials.load(&token).await.unwrap().unwrap();
    assert_eq!(loaded.data, None);
    assert!(loaded.args().is_empty());
}

#[tokio::test]
async fn test_duplicate_code_is_an_integrity_error() {
    let db = TestDb::new("code_unique").await;
    let issued = db.storage.code.make_code("first@example.com").await.unwrap();

    // Same code value under another email
    let pool = db.proxy.pool().unwrap();
    let err = sqlx::query(
        "INSERT INTO social_auth_code (email, code, verified, issued) VALUES (?, ?, 0, ?)",
    )
    .bind("second@example.com")
    .bind(&issued.code)
    .bind(&issued.issued)
    .execute(&pool)
    .await
    .map_err(StorageError::from)
    .unwrap_err();
    assert!(matches!(err, StorageError::Integrity(_)), "got {err:?}");

    let found = db.storage.code.get_code(&issued.code).await.unwrap().unwrap();
    assert_eq!(found.email, "first@example.com");
}
