//! services/api/src/web/rest.rs
//!
//! The health endpoint and the master definition for the OpenAPI specification.

use axum::response::Json;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

use crate::web::callables::{
    ErrorBody, ErrorDetail, PublishToFeedRequest, PublishToFeedResponse, RateLimitResponse,
};
use crate::web::triggers::{EntryCreatedPayload, TriggerAccepted};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        crate::web::callables::publish_to_feed_handler,
        crate::web::callables::check_rate_limit_handler,
        crate::web::triggers::entry_created_handler,
    ),
    components(
        schemas(
            HealthResponse,
            PublishToFeedRequest,
            PublishToFeedResponse,
            RateLimitResponse,
            ErrorBody,
            ErrorDetail,
            EntryCreatedPayload,
            TriggerAccepted
        )
    ),
    tags(
        (name = "Diary Tutor API", description = "Callables and triggers of the language-learning diary backend.")
    )
)]
pub struct ApiDoc;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Liveness check.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
