//! Integration tests for the callable routes and their error mapping.

mod common;

use axum::http::StatusCode;
use chrono::Utc;
use common::{body_json, build_test_app, entry, post_json};
use diary_tutor_core::domain::Visibility;
use diary_tutor_core::testing::Op;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// publish-to-feed
// ---------------------------------------------------------------------------

#[tokio::test]
async fn publishing_own_anon_entry_returns_ok() {
    let app = build_test_app(None);
    let anon = entry(app.user_id, Visibility::Anon);
    app.store.put_entry(anon.clone());

    let body = format!(r#"{{"entryId":"{}"}}"#, anon.id);
    let response = post_json(app.router, "/callables/publish-to-feed", &body, true).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, serde_json::json!({ "ok": true }));

    let feed = app.store.feed();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].text, anon.text_raw);
    assert_eq!(feed[0].mood.as_deref(), Some("calm"));
}

#[tokio::test]
async fn anonymous_caller_is_unauthenticated() {
    let app = build_test_app(None);
    let anon = entry(app.user_id, Visibility::Anon);
    app.store.put_entry(anon.clone());

    let body = format!(r#"{{"entryId":"{}"}}"#, anon.id);
    let response = post_json(app.router, "/callables/publish-to-feed", &body, false).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["error"]["status"], "unauthenticated");
    assert_eq!(json["error"]["message"], "User must be authenticated");
    assert!(app.store.feed().is_empty());
}

#[tokio::test]
async fn missing_entry_id_is_an_invalid_argument() {
    let app = build_test_app(None);

    for body in ["", "{}", r#"{"entryId":""}"#] {
        let response =
            post_json(app.router.clone(), "/callables/publish-to-feed", body, true).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {:?}", body);
        let json = body_json(response).await;
        assert_eq!(json["error"]["status"], "invalid-argument");
        assert_eq!(json["error"]["message"], "entryId parameter is required");
    }
}

#[tokio::test]
async fn unknown_entry_is_not_found() {
    let app = build_test_app(None);

    let body = format!(r#"{{"entryId":"{}"}}"#, Uuid::new_v4());
    let response = post_json(app.router, "/callables/publish-to-feed", &body, true).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"]["status"], "not-found");
}

#[tokio::test]
async fn foreign_entry_is_permission_denied() {
    let app = build_test_app(None);
    let foreign = entry(Uuid::new_v4(), Visibility::Anon);
    app.store.put_entry(foreign.clone());

    let body = format!(r#"{{"entryId":"{}"}}"#, foreign.id);
    let response = post_json(app.router, "/callables/publish-to-feed", &body, true).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_json(response).await;
    assert_eq!(json["error"]["status"], "permission-denied");
    assert_eq!(json["error"]["message"], "Not authorized");
}

#[tokio::test]
async fn private_entry_is_rejected() {
    let app = build_test_app(None);
    let private = entry(app.user_id, Visibility::Private);
    app.store.put_entry(private.clone());

    let body = format!(r#"{{"entryId":"{}"}}"#, private.id);
    let response = post_json(app.router, "/callables/publish-to-feed", &body, true).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["message"], "Entry must be set to anonymous");
    assert!(app.store.feed().is_empty());
}

#[tokio::test]
async fn store_failure_is_reported_as_internal() {
    let app = build_test_app(None);
    app.store.fail_on(Op::GetEntry);

    let body = format!(r#"{{"entryId":"{}"}}"#, Uuid::new_v4());
    let response = post_json(app.router, "/callables/publish-to-feed", &body, true).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"]["status"], "internal");
    // The cause stays in the logs.
    assert!(!json["error"]["message"].as_str().unwrap().contains("GetEntry"));
}

// ---------------------------------------------------------------------------
// check-rate-limit
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rate_limit_reports_remaining_quota() {
    let app = build_test_app(None);
    for _ in 0..19 {
        app.store.put_entry(entry(app.user_id, Visibility::Private));
    }

    let response = post_json(app.router, "/callables/check-rate-limit", "", true).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        serde_json::json!({ "ok": true, "count": 19, "remaining": 1 })
    );
}

#[tokio::test]
async fn twentieth_entry_exhausts_the_quota() {
    let app = build_test_app(None);
    for _ in 0..20 {
        app.store.put_entry(entry(app.user_id, Visibility::Private));
    }

    let response = post_json(app.router, "/callables/check-rate-limit", "{}", true).await;

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let json = body_json(response).await;
    assert_eq!(json["error"]["status"], "resource-exhausted");
    assert_eq!(json["error"]["message"], "Daily limit of 20 entries reached");
}

#[tokio::test]
async fn rate_limit_ignores_other_users_and_earlier_days() {
    let app = build_test_app(None);
    for _ in 0..25 {
        app.store.put_entry(entry(Uuid::new_v4(), Visibility::Private));
    }
    let mut old = entry(app.user_id, Visibility::Private);
    old.created_at = Utc::now() - chrono::Duration::days(3);
    app.store.put_entry(old);

    let response = post_json(app.router, "/callables/check-rate-limit", "", true).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["count"], 0);
}

#[tokio::test]
async fn rate_limit_requires_a_session() {
    let app = build_test_app(None);

    let response = post_json(app.router, "/callables/check-rate-limit", "", false).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
