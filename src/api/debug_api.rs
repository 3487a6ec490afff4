use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::models::{EndpointDefinition, RequestPayload};
use crate::services::Dispatcher;
use crate::utils::error::AppError;

/// 列出当前可用的全部接口定义
pub async fn list_endpoints(State(dispatcher): State<Arc<Dispatcher>>) -> Response {
    let endpoints: Vec<&EndpointDefinition> = dispatcher
        .catalog()
        .list_all()
        .iter()
        .map(|e| e.as_ref())
        .collect();
    Json(endpoints).into_response()
}

/// 请求一个下游接口，返回下载令牌
///
/// 客户端断开时 handler 被丢弃，drop guard 取消正在进行的下游请求。
pub async fn request_endpoint(
    State(dispatcher): State<Arc<Dispatcher>>,
    payload: Result<Json<RequestPayload>, JsonRejection>,
) -> Result<String, ApiError> {
    let Json(payload) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let token = dispatcher.dispatch(&payload, &cancel).await?;
    Ok(token)
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    token: Option<String>,
}

/// 用令牌下载响应内容，令牌只能使用一次
pub async fn download(
    State(dispatcher): State<Arc<Dispatcher>>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, ApiError> {
    let token = query
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::TokenInvalid("download token is required".to_string()))?;

    let download = dispatcher.download(&token).await?;
    let disposition = format!("attachment; filename=\"{}\"", download.filename);

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(download.stream),
    )
        .into_response())
}

/// Axum 错误处理
pub struct ApiError(AppError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            tracing::error!("Request failed: {}", self.0);
            StatusCode::INTERNAL_SERVER_ERROR
        };

        let body = Json(json!({
            "message": self.0.to_string(),
        }));

        (status, body).into_response()
    }
}

impl<E> From<E> for ApiError
where
    E: Into<AppError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::create_router;
    use crate::catalog::Catalog;
    use crate::models::{ClientConfig, NodeKind};
    use crate::services::{ClientRegistry, ComponentClient, FileSwap, TopologyVerifier};
    use axum::body::to_bytes;
    use axum::http::Request;
    use axum::routing::get;
    use axum::Router;
    use std::net::SocketAddr;
    use tower::ServiceExt;

    fn gateway(spool: &std::path::Path) -> Router {
        let clients = ClientRegistry::new()
            .with_client(ComponentClient::new(NodeKind::Tidb, &ClientConfig::default()).unwrap());
        let catalog = Arc::new(Catalog::builtin(&clients).unwrap());
        let dispatcher = Dispatcher::new(
            catalog,
            TopologyVerifier::disabled(),
            Arc::new(clients),
            FileSwap::new(spool).unwrap(),
        );
        create_router(Arc::new(dispatcher))
    }

    async fn start_tidb() -> SocketAddr {
        let app = Router::new().route("/status", get(|| async { "tidb is running" }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn post_json(body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/debug_api/endpoint")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let spool = tempfile::tempdir().unwrap();
        let response = gateway(spool.path())
            .oneshot(get_request("/api/health"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_list_endpoints_only_registered_components() {
        let spool = tempfile::tempdir().unwrap();
        let response = gateway(spool.path())
            .oneshot(get_request("/debug_api/endpoints"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        let endpoints = body.as_array().unwrap();
        assert!(!endpoints.is_empty());
        assert!(endpoints.iter().all(|e| e["component"] == "tidb"));

        let status = endpoints.iter().find(|e| e["id"] == "tidb_status").unwrap();
        assert_eq!(status["path"], "/status");
        assert_eq!(status["method"], "GET");
        assert!(status.get("before_send").is_none());
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let spool = tempfile::tempdir().unwrap();
        let response = gateway(spool.path())
            .oneshot(post_json("{not json".to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(response).await["message"].is_string());
    }

    #[tokio::test]
    async fn test_unknown_endpoint_is_bad_request() {
        let spool = tempfile::tempdir().unwrap();
        let body = json!({"api_id": "pd_health", "host": "127.0.0.1", "port": 2379});
        let response = gateway(spool.path())
            .oneshot(post_json(body.to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await["message"],
            "Unknown API endpoint 'pd_health'"
        );
    }

    #[tokio::test]
    async fn test_upstream_failure_is_server_error() {
        let spool = tempfile::tempdir().unwrap();
        // 端口 1 上没有服务
        let body = json!({"api_id": "tidb_status", "host": "127.0.0.1", "port": 1});
        let response = gateway(spool.path())
            .oneshot(post_json(body.to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_invalid_token_is_bad_request() {
        let spool = tempfile::tempdir().unwrap();
        let app = gateway(spool.path());

        let response = app
            .clone()
            .oneshot(get_request("/debug_api/download?token=nope"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app.oneshot(get_request("/debug_api/download")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await["message"],
            "download token is required"
        );
    }

    #[tokio::test]
    async fn test_request_then_download() {
        let addr = start_tidb().await;
        let spool = tempfile::tempdir().unwrap();
        let app = gateway(spool.path());

        let body = json!({
            "api_id": "tidb_status",
            "host": addr.ip().to_string(),
            "port": addr.port(),
            "param_values": {}
        });
        let response = app.clone().oneshot(post_json(body.to_string())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let token = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let token = String::from_utf8(token.to_vec()).unwrap();
        assert!(!token.is_empty());

        let uri = format!("/debug_api/download?token={}", token);
        let response = app.clone().oneshot(get_request(&uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let disposition = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.starts_with("attachment; filename=\"tidb_status_"));
        assert!(disposition.ends_with(".txt\""));
        let content = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&content[..], b"tidb is running");

        // 第二次下载失败
        let response = app.oneshot(get_request(&uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
