//! Integration tests for publish-to-feed and check-rate-limit.

use chrono::{Duration, TimeZone, Utc};
use diary_tutor_core::testing::{entry, MemoryStore, Op};
use diary_tutor_core::domain::Visibility;
use diary_tutor_core::{CallableError, Callables, RateLimitStatus};
use std::sync::Arc;
use uuid::Uuid;

fn callables() -> (Arc<MemoryStore>, Callables) {
    let store = Arc::new(MemoryStore::new());
    (store.clone(), Callables::new(store))
}

#[tokio::test]
async fn anon_entry_of_caller_is_published_truncated() {
    let (store, callables) = callables();
    let owner = Uuid::new_v4();
    let mut anon = entry(owner, Utc::now());
    anon.visibility = Visibility::Anon;
    anon.lang = "ja".to_string();
    anon.mood = Some("happy".to_string());
    anon.text_raw = "あ".repeat(250);
    store.put_entry(anon.clone());

    let id = anon.id.to_string();
    let post = callables
        .publish_to_feed(Some(owner), Some(id.as_str()))
        .await
        .unwrap();

    assert_eq!(post.text.chars().count(), 100);
    assert_eq!(post.lang, "ja");
    assert_eq!(post.mood.as_deref(), Some("happy"));
    assert_eq!(store.feed(), vec![post]);
}

#[tokio::test]
async fn private_entry_is_rejected_as_invalid_argument() {
    let (store, callables) = callables();
    let owner = Uuid::new_v4();
    let private = entry(owner, Utc::now());
    store.put_entry(private.clone());

    let err = callables
        .publish_to_feed(Some(owner), Some(private.id.to_string().as_str()))
        .await
        .unwrap_err();

    assert_eq!(err, CallableError::InvalidArgument("Entry must be set to anonymous".to_string()));
    assert!(store.feed().is_empty());
}

#[tokio::test]
async fn other_users_entry_is_permission_denied() {
    let (store, callables) = callables();
    let mut anon = entry(Uuid::new_v4(), Utc::now());
    anon.visibility = Visibility::Anon;
    store.put_entry(anon.clone());

    let err = callables
        .publish_to_feed(Some(Uuid::new_v4()), Some(anon.id.to_string().as_str()))
        .await
        .unwrap_err();

    assert_eq!(err.code(), "permission-denied");
    assert!(store.feed().is_empty());
}

#[tokio::test]
async fn preconditions_are_checked_in_order() {
    let (_, callables) = callables();

    let err = callables.publish_to_feed(None, None).await.unwrap_err();
    assert_eq!(err.code(), "unauthenticated");

    let caller = Some(Uuid::new_v4());
    let err = callables.publish_to_feed(caller, None).await.unwrap_err();
    assert_eq!(err, CallableError::InvalidArgument("entryId parameter is required".to_string()));

    let err = callables.publish_to_feed(caller, Some("  ")).await.unwrap_err();
    assert_eq!(err.code(), "invalid-argument");

    let missing = Uuid::new_v4().to_string();
    let err = callables
        .publish_to_feed(caller, Some(missing.as_str()))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "not-found");

    let err = callables
        .publish_to_feed(caller, Some("not-a-uuid"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "not-found");
}

#[tokio::test]
async fn store_failure_becomes_internal_without_feed_insert() {
    let (store, callables) = callables();
    let owner = Uuid::new_v4();
    let mut anon = entry(owner, Utc::now());
    anon.visibility = Visibility::Anon;
    store.put_entry(anon.clone());
    store.fail_on(Op::InsertFeedPost);

    let err = callables
        .publish_to_feed(Some(owner), Some(anon.id.to_string().as_str()))
        .await
        .unwrap_err();

    assert_eq!(err.code(), "internal");
    assert!(store.feed().is_empty());
}

#[tokio::test]
async fn twenty_entries_today_exhaust_the_quota() {
    let (store, callables) = callables();
    let owner = Uuid::new_v4();
    let now = Utc.with_ymd_and_hms(2026, 10, 17, 21, 0, 0).unwrap();
    for i in 0..20 {
        store.put_entry(entry(owner, now - Duration::minutes(i)));
    }

    let err = callables.check_rate_limit(Some(owner), now).await.unwrap_err();

    assert_eq!(
        err,
        CallableError::ResourceExhausted("Daily limit of 20 entries reached".to_string())
    );
}

#[tokio::test]
async fn nineteen_entries_leave_one_remaining() {
    let (store, callables) = callables();
    let owner = Uuid::new_v4();
    let now = Utc.with_ymd_and_hms(2026, 10, 17, 21, 0, 0).unwrap();
    for i in 0..19 {
        store.put_entry(entry(owner, now - Duration::minutes(i)));
    }
    // Yesterday's entries do not count against today's quota.
    store.put_entry(entry(owner, now - Duration::days(1)));

    let status = callables.check_rate_limit(Some(owner), now).await.unwrap();

    assert_eq!(status, RateLimitStatus { count: 19, remaining: 1 });
}

#[tokio::test]
async fn rate_limit_requires_authentication() {
    let (_, callables) = callables();
    let err = callables.check_rate_limit(None, Utc::now()).await.unwrap_err();
    assert_eq!(err.code(), "unauthenticated");
}
