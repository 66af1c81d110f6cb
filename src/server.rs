//! HTTP surface for the dashboard's analytics tab.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::handler::{AnalyticsHandler, HandlerResponse};

pub const ANALYTICS_PATH: &str = "/api/analytics";
pub const HEALTH_PATH: &str = "/health";

/// Build the router. The handler is shared read-only across requests.
pub fn router(handler: Arc<AnalyticsHandler>) -> Router {
    Router::new()
        .route(HEALTH_PATH, get(health))
        .route(ANALYTICS_PATH, any(analytics))
        .layer(TraceLayer::new_for_http())
        .with_state(handler)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn analytics(State(handler): State<Arc<AnalyticsHandler>>) -> Response {
    handler.handle().await.into_response()
}

impl IntoResponse for HandlerResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status.as_u16())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.body)).into_response()
    }
}
