pub mod callables;
pub mod middleware;
pub mod rest;
pub mod state;
pub mod triggers;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use self::rest::ApiDoc;
use self::state::AppState;

/// Builds the full application router: callables behind session resolution,
/// the entry-created webhook (when a trigger token is configured), health, and
/// the API docs.
pub fn router(app_state: Arc<AppState>) -> Router {
    let callable_routes = Router::new()
        .route(
            "/callables/publish-to-feed",
            post(callables::publish_to_feed_handler),
        )
        .route(
            "/callables/check-rate-limit",
            post(callables::check_rate_limit_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            middleware::resolve_caller,
        ));

    let mut api_router = Router::new()
        .merge(callable_routes)
        .route("/health", get(rest::health_handler));

    // Without a shared secret there is no way to authenticate the webhook.
    if app_state.config.trigger_token.is_some() {
        api_router = api_router.route(
            "/triggers/entry-created",
            post(triggers::entry_created_handler),
        );
    }
    let api_router = api_router.with_state(app_state);

    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
