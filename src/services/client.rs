use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::models::{ClientConfig, NodeKind, PreparedRequest, QueryValues, Settings};
use crate::utils::error::{AppError, Result};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const ERROR_BODY_LIMIT: usize = 512;

/// 某一类组件的 HTTP 客户端，构造后只读
#[derive(Debug, Clone)]
pub struct ComponentClient {
    kind: NodeKind,
    http: reqwest::Client,
    scheme: &'static str,
    timeout: Duration,
}

impl ComponentClient {
    pub fn new(kind: NodeKind, config: &ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().connect_timeout(CONNECT_TIMEOUT);

        if let Some(ca_path) = &config.ca_path {
            let pem = std::fs::read(ca_path).map_err(|e| {
                AppError::Config(format!(
                    "Failed to read CA certificate {} for {}: {}",
                    ca_path.display(),
                    kind,
                    e
                ))
            })?;
            let cert = reqwest::Certificate::from_pem(&pem)
                .map_err(|e| AppError::Config(format!("Invalid CA certificate for {}: {}", kind, e)))?;
            builder = builder.add_root_certificate(cert);
        }

        let http = builder
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client for {}: {}", kind, e)))?;

        Ok(Self {
            kind,
            http,
            scheme: if config.tls { "https" } else { "http" },
            timeout: config.timeout(),
        })
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// 构造请求，base url 的协议由客户端决定
    pub fn prepare(
        &self,
        method: reqwest::Method,
        host: &str,
        port: u16,
        path: &str,
        query: QueryValues,
    ) -> PreparedRequest {
        let host = if host.contains(':') && !host.starts_with('[') {
            format!("[{}]", host)
        } else {
            host.to_string()
        };
        let mut request = PreparedRequest::new(
            method,
            format!("{}://{}:{}", self.scheme, host, port),
            path.to_string(),
            query,
        );
        request.timeout = Some(self.timeout);
        request
    }

    /// 发送请求，返回时响应头已就绪，body 由调用方以流的方式读取
    pub async fn send(&self, request: PreparedRequest) -> Result<reqwest::Response> {
        let url = request.url()?;
        tracing::debug!("Sending {} {} to {}", request.method, url, self.kind);

        let response = self
            .http
            .request(request.method, url.clone())
            .headers(request.headers)
            .timeout(request.timeout.unwrap_or(self.timeout))
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("failed to send request to {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(ERROR_BODY_LIMIT).collect();
            return Err(AppError::Upstream(format!(
                "{} responded with status {}: {}",
                url, status, snippet
            )));
        }

        Ok(response)
    }
}

/// 组件类型到 HTTP 客户端的映射，启动时构造，之后只读
#[derive(Debug, Clone, Default)]
pub struct ClientRegistry {
    clients: HashMap<NodeKind, Arc<ComponentClient>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let mut registry = Self::new();
        for (kind, config) in settings.client_configs()? {
            registry = registry.with_client(ComponentClient::new(kind, &config)?);
            tracing::info!("Registered {} client", kind);
        }
        Ok(registry)
    }

    pub fn with_client(mut self, client: ComponentClient) -> Self {
        self.clients.insert(client.kind(), Arc::new(client));
        self
    }

    pub fn get(&self, kind: NodeKind) -> Option<Arc<ComponentClient>> {
        self.clients.get(&kind).cloned()
    }

    pub fn contains(&self, kind: NodeKind) -> bool {
        self.clients.contains_key(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_builds_base_url() {
        let client = ComponentClient::new(NodeKind::Tidb, &ClientConfig::default()).unwrap();
        let request = client.prepare(
            reqwest::Method::GET,
            "tidb-1",
            10080,
            "/status",
            QueryValues::new(),
        );
        assert_eq!(request.base_url, "http://tidb-1:10080");
        assert_eq!(request.timeout, Some(Duration::from_secs(60)));

        let tls = ClientConfig {
            tls: true,
            ..ClientConfig::default()
        };
        let client = ComponentClient::new(NodeKind::Pd, &tls).unwrap();
        let request = client.prepare(reqwest::Method::GET, "::1", 2379, "/", QueryValues::new());
        assert_eq!(request.base_url, "https://[::1]:2379");
    }

    #[test]
    fn test_missing_ca_is_config_error() {
        let config = ClientConfig {
            ca_path: Some("/definitely/not/here.pem".into()),
            ..ClientConfig::default()
        };
        let err = ComponentClient::new(NodeKind::Tikv, &config).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_registry_lookup() {
        let registry = ClientRegistry::new()
            .with_client(ComponentClient::new(NodeKind::Tidb, &ClientConfig::default()).unwrap());
        assert!(registry.contains(NodeKind::Tidb));
        assert!(!registry.contains(NodeKind::Pd));
        assert!(registry.get(NodeKind::Tidb).is_some());
        assert!(registry.get(NodeKind::Tiflash).is_none());
    }

    #[test]
    fn test_registry_from_settings() {
        let settings = Settings::from_toml("[clients.pd]\ntimeout_secs = 5\n[clients.tso]\ntls = true\n").unwrap();
        let registry = ClientRegistry::from_settings(&settings).unwrap();
        assert!(registry.contains(NodeKind::Tso));
        assert!(!registry.contains(NodeKind::Tidb));
    }
}
