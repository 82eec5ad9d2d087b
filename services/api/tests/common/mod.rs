//! Shared fixtures for the HTTP-level tests: in-memory ports and request helpers.

#![allow(dead_code)]

use api_lib::config::Config;
use api_lib::web::{self, state::AppState, triggers::TRIGGER_TOKEN_HEADER};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use chrono::Utc;
use diary_tutor_core::domain::{AnalysisStatus, DiaryEntry, Visibility};
use diary_tutor_core::ports::{PortResult, SessionResolver};
use diary_tutor_core::testing::{self, MemoryStore, StubCorrector, VALID_RESPONSE};
use diary_tutor_core::EntryAnalyzer;
use http_body_util::BodyExt;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

pub const SESSION_TOKEN: &str = "session-token-1";

//=========================================================================================
// Fake Ports
//=========================================================================================

/// Knows exactly one session, belonging to the given user.
pub struct FakeSessions {
    user_id: Uuid,
}

#[async_trait]
impl SessionResolver for FakeSessions {
    async fn resolve_session(&self, token: &str) -> PortResult<Option<Uuid>> {
        Ok((token == SESSION_TOKEN).then_some(self.user_id))
    }
}

//=========================================================================================
// App Construction & Request Helpers
//=========================================================================================

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub corrector: Arc<StubCorrector>,
    /// Owner of the session behind `SESSION_TOKEN`.
    pub user_id: Uuid,
}

pub fn build_test_app(trigger_token: Option<&str>) -> TestApp {
    let mut vars = vec![("DATABASE_URL", "postgres://localhost/unused")];
    if let Some(token) = trigger_token {
        vars.push(("TRIGGER_TOKEN", token));
    }
    let vars: HashMap<String, String> = vars
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let config = Arc::new(Config::from_lookup(|key| vars.get(key).cloned()).unwrap());

    let store = Arc::new(MemoryStore::new());
    let corrector = Arc::new(StubCorrector::replying(VALID_RESPONSE));
    let user_id = Uuid::new_v4();
    let analyzer = Arc::new(EntryAnalyzer::new(store.clone(), corrector.clone()));
    let state = Arc::new(AppState::new(
        store.clone(),
        Arc::new(FakeSessions { user_id }),
        analyzer,
        config,
    ));

    TestApp {
        router: web::router(state),
        store,
        corrector,
        user_id,
    }
}

pub fn entry(owner_id: Uuid, visibility: Visibility) -> DiaryEntry {
    DiaryEntry {
        visibility,
        mood: Some("calm".to_string()),
        ..testing::entry(owner_id, Utc::now())
    }
}

/// POSTs `body` to `uri`, authenticated through the session cookie when `authed`.
pub async fn post_json(router: Router, uri: &str, body: &str, authed: bool) -> Response<Body> {
    let mut request = Request::post(uri).header("content-type", "application/json");
    if authed {
        request = request.header("cookie", format!("session={}", SESSION_TOKEN));
    }
    router
        .oneshot(request.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap()
}

/// POSTs an entry-created event, presenting `token` in the trigger header when given.
pub async fn post_trigger(router: Router, body: &str, token: Option<&str>) -> Response<Body> {
    let mut request =
        Request::post("/triggers/entry-created").header("content-type", "application/json");
    if let Some(token) = token {
        request = request.header(TRIGGER_TOKEN_HEADER, token);
    }
    router
        .oneshot(request.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap()
}

pub async fn get(router: Router, uri: &str) -> Response<Body> {
    router
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Waits for a background analysis to reach a terminal status.
pub async fn wait_for_status(store: &MemoryStore, entry_id: Uuid) -> Option<AnalysisStatus> {
    for _ in 0..100 {
        match store.status_of(entry_id) {
            Some(AnalysisStatus::Pending) | None => {
                tokio::time::sleep(Duration::from_millis(10)).await
            }
            terminal => return terminal,
        }
    }
    store.status_of(entry_id)
}
