//! Integration tests for the entry-created webhook and the service routes.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, entry, get, post_trigger, wait_for_status};
use diary_tutor_core::domain::{AnalysisStatus, Visibility};
use serde_json::json;
use uuid::Uuid;

const TOKEN: &str = "s3cret";

fn payload(entry_id: Uuid) -> String {
    json!({ "id": entry_id }).to_string()
}

#[tokio::test]
async fn entry_created_is_accepted_and_analyzed() {
    let app = build_test_app(Some(TOKEN));
    let new_entry = entry(app.user_id, Visibility::Private);
    app.store.put_entry(new_entry.clone());

    let response = post_trigger(app.router, &payload(new_entry.id), Some(TOKEN)).await;

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = body_json(response).await;
    assert_eq!(json["accepted"], true);
    assert_eq!(json["entryId"], new_entry.id.to_string());

    assert_eq!(
        wait_for_status(&app.store, new_entry.id).await,
        Some(AnalysisStatus::Done)
    );
    let result = app.store.correction(new_entry.id).unwrap();
    assert_eq!(result.corrected, "I went to the library today.");
    assert_eq!(app.store.streak(app.user_id), Some(1));
}

#[tokio::test]
async fn webhook_is_not_mounted_without_a_token() {
    let app = build_test_app(None);
    let new_entry = entry(app.user_id, Visibility::Private);
    app.store.put_entry(new_entry.clone());

    let response = post_trigger(app.router, &payload(new_entry.id), None).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.store.status_of(new_entry.id), Some(AnalysisStatus::Pending));
}

#[tokio::test]
async fn missing_or_wrong_token_is_unauthenticated() {
    let app = build_test_app(Some(TOKEN));
    let new_entry = entry(app.user_id, Visibility::Private);
    app.store.put_entry(new_entry.clone());

    for token in [None, Some("guess"), Some("")] {
        let response =
            post_trigger(app.router.clone(), &payload(new_entry.id), token).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "token {:?}", token);
        assert_eq!(body_json(response).await["error"]["status"], "unauthenticated");
    }
    assert_eq!(app.store.status_of(new_entry.id), Some(AnalysisStatus::Pending));
    assert!(app.corrector.prompts().is_empty());
}

#[tokio::test]
async fn finished_entry_is_not_analyzed_again() {
    let app = build_test_app(Some(TOKEN));
    let new_entry = entry(app.user_id, Visibility::Private);
    app.store.put_entry(new_entry.clone());

    let first = post_trigger(app.router.clone(), &payload(new_entry.id), Some(TOKEN)).await;
    assert_eq!(first.status(), StatusCode::ACCEPTED);
    assert_eq!(
        wait_for_status(&app.store, new_entry.id).await,
        Some(AnalysisStatus::Done)
    );
    let stored = app.store.correction(new_entry.id);

    // A replayed event, even one carrying forged entry fields, only names the id.
    let replay = json!({
        "id": new_entry.id,
        "ownerId": Uuid::new_v4(),
        "textRaw": "forged text",
        "aiStatus": "pending"
    })
    .to_string();
    let second = post_trigger(app.router, &replay, Some(TOKEN)).await;
    assert_eq!(second.status(), StatusCode::ACCEPTED);
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    assert_eq!(app.corrector.prompts().len(), 1);
    assert_eq!(app.store.correction(new_entry.id), stored);
    assert_eq!(app.store.streak(app.user_id), Some(1));
}

#[tokio::test]
async fn payload_without_id_is_rejected() {
    let app = build_test_app(Some(TOKEN));

    let body = json!({ "lang": "en", "textRaw": "hello" }).to_string();
    let response = post_trigger(app.router, &body, Some(TOKEN)).await;

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn health_reports_ok() {
    let app = build_test_app(None);

    let response = get(app.router, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "status": "ok" }));
}

#[tokio::test]
async fn openapi_document_lists_every_route() {
    let app = build_test_app(None);

    let response = get(app.router, "/api-docs/openapi.json").await;

    assert_eq!(response.status(), StatusCode::OK);
    let paths = body_json(response).await["paths"].clone();
    for path in [
        "/health",
        "/callables/publish-to-feed",
        "/callables/check-rate-limit",
        "/triggers/entry-created",
    ] {
        assert!(paths.get(path).is_some(), "missing {}", path);
    }
}
