//! services/api/src/web/callables.rs
//!
//! HTTP surface of the two callable operations. Request bodies are small JSON
//! objects; failures are reported as `{ "error": { "status", "message" } }` with
//! an HTTP status matching the error category.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Extension,
};
use chrono::Local;
use diary_tutor_core::CallableError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use utoipa::ToSchema;

use crate::web::middleware::Caller;
use crate::web::state::AppState;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// Body of `POST /callables/publish-to-feed`.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublishToFeedRequest {
    pub entry_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PublishToFeedResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RateLimitResponse {
    pub ok: bool,
    pub count: u64,
    pub remaining: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Category code, e.g. `permission-denied`.
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

//=========================================================================================
// Error Mapping
//=========================================================================================

/// A `CallableError` on its way to the client.
#[derive(Debug)]
pub struct CallableFailure(pub CallableError);

impl From<CallableError> for CallableFailure {
    fn from(err: CallableError) -> Self {
        Self(err)
    }
}

pub fn status_for(err: &CallableError) -> StatusCode {
    match err {
        CallableError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
        CallableError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        CallableError::NotFound(_) => StatusCode::NOT_FOUND,
        CallableError::PermissionDenied(_) => StatusCode::FORBIDDEN,
        CallableError::ResourceExhausted(_) => StatusCode::TOO_MANY_REQUESTS,
        CallableError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for CallableFailure {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                status: self.0.code().to_string(),
                message: self.0.to_string(),
            },
        };
        (status_for(&self.0), Json(body)).into_response()
    }
}

/// Decodes an optional JSON body; an empty body means "no parameters".
fn parse_body<T>(body: &Bytes) -> Result<T, CallableError>
where
    T: Default + for<'de> Deserialize<'de>,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| {
        warn!("Rejected malformed callable body: {}", e);
        CallableError::InvalidArgument("Request body must be a JSON object".to_string())
    })
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Publish an anonymized excerpt of one of the caller's entries to the public feed.
#[utoipa::path(
    post,
    path = "/callables/publish-to-feed",
    request_body = PublishToFeedRequest,
    responses(
        (status = 200, description = "Excerpt published", body = PublishToFeedResponse),
        (status = 400, description = "Missing entryId or entry is not anonymous", body = ErrorBody),
        (status = 401, description = "No valid session", body = ErrorBody),
        (status = 403, description = "Entry belongs to another user", body = ErrorBody),
        (status = 404, description = "Entry not found", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn publish_to_feed_handler(
    State(state): State<Arc<AppState>>,
    Extension(Caller(caller)): Extension<Caller>,
    body: Bytes,
) -> Result<Json<PublishToFeedResponse>, CallableFailure> {
    // The caller check comes first, even before the body is looked at.
    let caller = caller.ok_or_else(|| {
        CallableError::Unauthenticated("User must be authenticated".to_string())
    })?;
    let request: PublishToFeedRequest = parse_body(&body)?;

    state
        .callables
        .publish_to_feed(Some(caller), request.entry_id.as_deref())
        .await?;

    Ok(Json(PublishToFeedResponse { ok: true }))
}

/// Check how many entries the caller may still create today.
#[utoipa::path(
    post,
    path = "/callables/check-rate-limit",
    responses(
        (status = 200, description = "Quota not yet reached", body = RateLimitResponse),
        (status = 401, description = "No valid session", body = ErrorBody),
        (status = 429, description = "Daily limit reached", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn check_rate_limit_handler(
    State(state): State<Arc<AppState>>,
    Extension(Caller(caller)): Extension<Caller>,
) -> Result<Json<RateLimitResponse>, CallableFailure> {
    let status = state
        .callables
        .check_rate_limit(caller, Local::now())
        .await?;

    Ok(Json(RateLimitResponse {
        ok: true,
        count: status.count,
        remaining: status.remaining,
    }))
}
