pub mod debug_api;

use axum::{
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::services::Dispatcher;

/// Health check endpoint
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "debug-api-gateway"
    }))
}

/// 创建 API 路由
pub fn create_router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        // Health check
        .route("/api/health", get(health_check))

        // 调试接口
        .route("/debug_api/endpoints", get(debug_api::list_endpoints))
        .route("/debug_api/endpoint", post(debug_api::request_endpoint))
        .route("/debug_api/download", get(debug_api::download))

        // CORS 配置
        .layer(CorsLayer::permissive())

        // 请求追踪
        .layer(TraceLayer::new_for_http())

        // 共享状态
        .with_state(dispatcher)
}
