use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::client::ClientRegistry;
use super::file_swap::{Download, FileSwap, SpoolWriter};
use super::resolver::PayloadResolver;
use super::topology::TopologyVerifier;
use crate::catalog::Catalog;
use crate::models::{QueryValues, RequestPayload, ResolvedRequest};
use crate::utils::content_type::download_filename;
use crate::utils::error::{AppError, Result};

/// 下载令牌的默认有效期
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(5 * 60);

/// profile 类接口在采样时长之外额外预留的时间
const PROFILING_TIMEOUT_BUFFER: Duration = Duration::from_secs(30);

const SPOOL_CATEGORY: &str = "debug_api";

/// 单次分发的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Init,
    Resolved,
    Verified,
    Spooling,
    Ready,
    Failed,
}

impl DispatchState {
    pub fn as_str(&self) -> &str {
        match self {
            DispatchState::Init => "init",
            DispatchState::Resolved => "resolved",
            DispatchState::Verified => "verified",
            DispatchState::Spooling => "spooling",
            DispatchState::Ready => "ready",
            DispatchState::Failed => "failed",
        }
    }
}

/// 分发器：解析 → 校验拓扑 → 发送请求 → 写入临时文件 → 生成下载令牌
#[derive(Clone)]
pub struct Dispatcher {
    resolver: PayloadResolver,
    verifier: TopologyVerifier,
    clients: Arc<ClientRegistry>,
    file_swap: FileSwap,
    token_ttl: Duration,
}

impl Dispatcher {
    pub fn new(
        catalog: Arc<Catalog>,
        verifier: TopologyVerifier,
        clients: Arc<ClientRegistry>,
        file_swap: FileSwap,
    ) -> Self {
        Self {
            resolver: PayloadResolver::new(catalog),
            verifier,
            clients,
            file_swap,
            token_ttl: DEFAULT_TOKEN_TTL,
        }
    }

    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        self.resolver.catalog()
    }

    pub fn file_swap(&self) -> &FileSwap {
        &self.file_swap
    }

    /// 处理一次请求，成功时返回下载令牌
    ///
    /// `cancel` 被取消时立即中止：下游请求被丢弃，未完成的临时文件被删除。
    pub async fn dispatch(&self, payload: &RequestPayload, cancel: &CancellationToken) -> Result<String> {
        let mut state = DispatchState::Init;
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AppError::Upstream("request cancelled".to_string())),
            result = self.run(payload, &mut state) => result,
        };

        match &result {
            Ok(_) => tracing::info!(
                "Dispatched {} to {}:{}",
                payload.api_id,
                payload.host,
                payload.port
            ),
            Err(e) => {
                tracing::warn!(
                    "Dispatch of {} failed after state {}: {}",
                    payload.api_id,
                    state.as_str(),
                    e
                );
                state = DispatchState::Failed;
            }
        }
        tracing::debug!("Dispatch of {} ended in state {}", payload.api_id, state.as_str());

        result
    }

    async fn run(&self, payload: &RequestPayload, state: &mut DispatchState) -> Result<String> {
        let ResolvedRequest {
            endpoint,
            host,
            port,
            path,
            query,
        } = self.resolver.resolve(payload)?;
        *state = DispatchState::Resolved;

        self.verifier.verify(endpoint.component, &host, port).await?;
        *state = DispatchState::Verified;

        let mut writer = self.file_swap.new_writer(SPOOL_CATEGORY).await?;

        let client = self
            .clients
            .get(endpoint.component)
            .ok_or(AppError::UnknownComponent(endpoint.component))?;

        let timeout = request_timeout(client.timeout(), &query);
        let mut request = client.prepare(endpoint.method.as_reqwest(), &host, port, &path, query);
        request.timeout = Some(timeout);
        if let Some(hook) = &endpoint.before_send {
            hook.apply(&mut request);
        }

        *state = DispatchState::Spooling;
        let response = client.send(request).await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let filename = download_filename(
            &endpoint.id,
            chrono::Utc::now().timestamp(),
            content_type.as_deref(),
        );

        pipe_body(response, &mut writer).await?;
        let written = writer.bytes_written();
        let token = writer.mint_token(filename.as_str(), self.token_ttl).await?;
        *state = DispatchState::Ready;

        tracing::debug!("Spooled {} bytes as {}", written, filename);
        Ok(token)
    }

    /// 用令牌换取下载内容
    pub async fn download(&self, token: &str) -> Result<Download> {
        self.file_swap.serve_download(token).await
    }
}

/// 出错时直接返回，writer 被释放时会删除文件
///
/// 下游返回空 body 时仍写入一次空内容，空响应同样可以下载。
async fn pipe_body(response: reqwest::Response, writer: &mut SpoolWriter) -> Result<()> {
    let mut body = response.bytes_stream();
    writer.write_all(&[]).await?;
    while let Some(chunk) = body.next().await {
        let chunk =
            chunk.map_err(|e| AppError::Upstream(format!("failed to read response body: {}", e)))?;
        writer.write_all(&chunk).await?;
    }
    writer.close().await
}

/// 带 `seconds` 参数的 profile 请求，超时至少为采样时长加上预留时间
fn request_timeout(base: Duration, query: &QueryValues) -> Duration {
    query
        .first_str("seconds")
        .and_then(|s| s.parse::<u64>().ok())
        .map(|secs| base.max(Duration::from_secs(secs) + PROFILING_TIMEOUT_BUFFER))
        .unwrap_or(base)
}
