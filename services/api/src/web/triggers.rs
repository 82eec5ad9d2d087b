//! services/api/src/web/triggers.rs
//!
//! Webhook binding of the entry-created trigger. The caller only names the new
//! entry; the entry itself is always loaded from the store, and analysis runs in
//! its own task after the request has been accepted. The route is mounted only
//! when a trigger token is configured, and every request must present it.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use diary_tutor_core::CallableError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::callables::{CallableFailure, ErrorBody};
use crate::web::state::AppState;

pub const TRIGGER_TOKEN_HEADER: &str = "x-trigger-token";

/// Names a newly created diary entry.
#[derive(Debug, Deserialize, ToSchema)]
pub struct EntryCreatedPayload {
    pub id: Uuid,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TriggerAccepted {
    pub accepted: bool,
    pub entry_id: Uuid,
}

/// Accept an entry-created event and analyze the named entry in the background.
#[utoipa::path(
    post,
    path = "/triggers/entry-created",
    request_body = EntryCreatedPayload,
    responses(
        (status = 202, description = "Analysis scheduled", body = TriggerAccepted),
        (status = 401, description = "Missing or wrong trigger token", body = ErrorBody),
        (status = 404, description = "No trigger token is configured"),
        (status = 422, description = "Payload does not name an entry")
    ),
    params(
        ("x-trigger-token" = String, Header, description = "Shared secret configured as TRIGGER_TOKEN.")
    )
)]
pub async fn entry_created_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<EntryCreatedPayload>,
) -> Result<impl IntoResponse, CallableFailure> {
    let presented = headers
        .get(TRIGGER_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok());
    if !token_matches(state.config.trigger_token.as_deref(), presented) {
        warn!("Rejected entry-created event with a missing or wrong trigger token");
        return Err(CallableError::Unauthenticated("Invalid trigger token".to_string()).into());
    }

    let entry_id = payload.id;
    info!("Entry-created event received for entry {}", entry_id);

    let analyzer = state.analyzer.clone();
    tokio::spawn(async move {
        analyzer.handle_entry_id(entry_id).await;
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(TriggerAccepted {
            accepted: true,
            entry_id,
        }),
    ))
}

/// An unconfigured token matches nothing.
fn token_matches(expected: Option<&str>, presented: Option<&str>) -> bool {
    match (expected, presented) {
        (Some(expected), Some(presented)) => expected == presented,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_is_just_the_entry_id() {
        let payload: EntryCreatedPayload = serde_json::from_value(json!({
            "id": "6f1c1f38-7c7b-4a8e-9d43-0b8f6f0c2a11",
            "ownerId": "0d5b8a3e-2f9a-4a63-8f55-0d4b0a7e1c22",
            "textRaw": "ignored"
        }))
        .unwrap();
        assert_eq!(
            payload.id,
            Uuid::parse_str("6f1c1f38-7c7b-4a8e-9d43-0b8f6f0c2a11").unwrap()
        );
    }

    #[test]
    fn payload_without_id_is_rejected() {
        let result = serde_json::from_value::<EntryCreatedPayload>(json!({ "entryId": "x" }));
        assert!(result.is_err());
    }

    #[test]
    fn token_must_be_configured_and_match() {
        assert!(token_matches(Some("secret"), Some("secret")));
        assert!(!token_matches(Some("secret"), Some("guess")));
        assert!(!token_matches(Some("secret"), None));
        assert!(!token_matches(None, None));
        assert!(!token_matches(None, Some("")));
    }
}
