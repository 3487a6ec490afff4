use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use super::component::{ComponentInfo, NodeKind};
use crate::utils::error::{AppError, Result};

/// 配置文件路径的环境变量
pub const CONFIG_PATH_ENV: &str = "DEBUG_API_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "debug-api.toml";
const ENV_PREFIX: &str = "DEBUG_API";

/// 网关配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub spool: SpoolConfig,
    /// 组件名 -> HTTP 客户端配置。未配置的组件，其接口不会出现在目录里
    #[serde(default)]
    pub clients: BTreeMap<String, ClientConfig>,
    #[serde(default)]
    pub topology: TopologyConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// 临时文件与下载令牌配置
#[derive(Debug, Clone, Deserialize)]
pub struct SpoolConfig {
    pub dir: Option<PathBuf>,
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for SpoolConfig {
    fn default() -> Self {
        Self {
            dir: None,
            ttl_secs: default_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl SpoolConfig {
    /// 未配置时使用用户缓存目录，取不到再退回系统临时目录
    pub fn dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("debug-api-gateway")
                .join("spool")
        })
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

/// 单个组件的 HTTP 客户端配置
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub tls: bool,
    /// PEM 格式的 CA 证书
    pub ca_path: Option<PathBuf>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            tls: false,
            ca_path: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// 静态拓扑，代替 etcd / PD 的服务发现
#[derive(Debug, Clone, Deserialize)]
pub struct TopologyConfig {
    #[serde(default = "default_verify")]
    pub verify: bool,
    #[serde(default)]
    pub tidb: Vec<ComponentInfo>,
    #[serde(default)]
    pub ticdc: Vec<ComponentInfo>,
    #[serde(default)]
    pub tiproxy: Vec<ComponentInfo>,
    #[serde(default)]
    pub tikv: Vec<ComponentInfo>,
    #[serde(default)]
    pub tiflash: Vec<ComponentInfo>,
    #[serde(default)]
    pub pd: Vec<ComponentInfo>,
    #[serde(default)]
    pub tso: Vec<ComponentInfo>,
    #[serde(default)]
    pub scheduling: Vec<ComponentInfo>,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            verify: default_verify(),
            tidb: Vec::new(),
            ticdc: Vec::new(),
            tiproxy: Vec::new(),
            tikv: Vec::new(),
            tiflash: Vec::new(),
            pd: Vec::new(),
            tso: Vec::new(),
            scheduling: Vec::new(),
        }
    }
}

impl Settings {
    /// 从配置文件和 `DEBUG_API__*` 环境变量加载配置，环境变量优先
    pub fn load() -> Result<Self> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        tracing::info!("Loading configuration from {}", path);

        let builder = config::Config::builder()
            .add_source(config::File::new(&path, config::FileFormat::Toml).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            );

        Self::from_config(builder.build().map_err(|e| AppError::Config(e.to_string()))?)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(content, config::FileFormat::Toml))
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?;
        Self::from_config(config)
    }

    fn from_config(config: config::Config) -> Result<Self> {
        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))?;
        settings.client_configs()?;
        Ok(settings)
    }

    /// 解析 `[clients]` 段。整段缺失时为所有组件使用默认客户端
    pub fn client_configs(&self) -> Result<Vec<(NodeKind, ClientConfig)>> {
        if self.clients.is_empty() {
            return Ok(NodeKind::ALL
                .iter()
                .map(|kind| (*kind, ClientConfig::default()))
                .collect());
        }

        self.clients
            .iter()
            .map(|(name, cfg)| {
                name.parse::<NodeKind>()
                    .map(|kind| (kind, cfg.clone()))
                    .map_err(|_| AppError::Config(format!("Unknown component in [clients]: {}", name)))
            })
            .collect()
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    12333
}

fn default_ttl_secs() -> u64 {
    300
}

fn default_sweep_interval_secs() -> u64 {
    30
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_verify() -> bool {
    true
}
