use async_trait::async_trait;
use std::sync::Arc;

use crate::models::{ComponentInfo, NodeKind, StoreTopology, TopologyConfig};
use crate::utils::error::{AppError, Result};

/// 基于集群注册中心（etcd）的拓扑查询：tidb / ticdc / tiproxy
#[async_trait]
pub trait ClusterRegistry: Send + Sync {
    async fn fetch_members(&self, kind: NodeKind) -> Result<Vec<ComponentInfo>>;
}

/// 基于 PD 的拓扑查询
#[async_trait]
pub trait PdTopology: Send + Sync {
    async fn fetch_stores(&self) -> Result<StoreTopology>;

    async fn fetch_pd_members(&self) -> Result<Vec<ComponentInfo>>;

    /// tso / scheduling 等微服务成员
    async fn fetch_micro_service_members(&self, kind: NodeKind) -> Result<Vec<ComponentInfo>>;
}

/// 拓扑数据源
#[derive(Clone)]
pub struct TopologyProviders {
    pub registry: Arc<dyn ClusterRegistry>,
    pub pd: Arc<dyn PdTopology>,
}

/// 校验目标地址确实属于集群中对应类型的组件，防止把网关当成任意代理
#[derive(Clone)]
pub struct TopologyVerifier {
    providers: Option<TopologyProviders>,
}

impl TopologyVerifier {
    pub fn new(providers: TopologyProviders) -> Self {
        Self {
            providers: Some(providers),
        }
    }

    /// 不做校验，只用于测试
    pub fn disabled() -> Self {
        Self { providers: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.providers.is_some()
    }

    pub async fn verify(&self, kind: NodeKind, host: &str, port: u16) -> Result<()> {
        let Some(providers) = &self.providers else {
            return Ok(());
        };

        let candidates = candidates(providers, kind).await.map_err(|e| match e {
            AppError::UnknownComponent(_) => e,
            other => AppError::InvalidEndpoint(format!(
                "failed to fetch {} topology: {}",
                kind, other
            )),
        })?;

        if candidates.iter().any(|(ip, p)| ip == host && *p == port) {
            return Ok(());
        }

        tracing::warn!("Rejected {} endpoint {}:{}, not in topology", kind, host, port);
        Err(AppError::InvalidEndpoint(format!(
            "invalid endpoint '{}:{}'",
            host, port
        )))
    }
}

/// 每种组件对外提供 HTTP 服务的 (ip, port)
async fn candidates(providers: &TopologyProviders, kind: NodeKind) -> Result<Vec<(String, u16)>> {
    match kind {
        NodeKind::Tidb | NodeKind::Ticdc | NodeKind::Tiproxy => {
            registry_members(providers.registry.as_ref(), kind).await
        }
        NodeKind::Tikv | NodeKind::Tiflash => store_members(providers.pd.as_ref(), kind).await,
        NodeKind::Pd => pd_members(providers.pd.as_ref()).await,
        NodeKind::Tso | NodeKind::Scheduling => {
            micro_service_members(providers.pd.as_ref(), kind).await
        }
    }
}

async fn registry_members(
    registry: &dyn ClusterRegistry,
    kind: NodeKind,
) -> Result<Vec<(String, u16)>> {
    Ok(registry
        .fetch_members(kind)
        .await?
        .into_iter()
        .map(|m| (m.ip, m.status_port))
        .collect())
}

async fn store_members(pd: &dyn PdTopology, kind: NodeKind) -> Result<Vec<(String, u16)>> {
    let topology = pd.fetch_stores().await?;
    let stores = match kind {
        NodeKind::Tikv => topology.tikv,
        NodeKind::Tiflash => topology.tiflash,
        NodeKind::Tidb
        | NodeKind::Pd
        | NodeKind::Ticdc
        | NodeKind::Tiproxy
        | NodeKind::Tso
        | NodeKind::Scheduling => return Err(AppError::UnknownComponent(kind)),
    };
    Ok(stores.into_iter().map(|s| (s.ip, s.status_port)).collect())
}

async fn pd_members(pd: &dyn PdTopology) -> Result<Vec<(String, u16)>> {
    Ok(pd
        .fetch_pd_members()
        .await?
        .into_iter()
        .map(|m| (m.ip, m.port))
        .collect())
}

async fn micro_service_members(pd: &dyn PdTopology, kind: NodeKind) -> Result<Vec<(String, u16)>> {
    Ok(pd
        .fetch_micro_service_members(kind)
        .await?
        .into_iter()
        .map(|m| (m.ip, m.port))
        .collect())
}

/// 由配置文件给出的静态拓扑，同时充当注册中心和 PD 数据源
#[derive(Debug, Clone)]
pub struct StaticTopology {
    config: TopologyConfig,
}

impl StaticTopology {
    pub fn new(config: TopologyConfig) -> Self {
        Self { config }
    }

    /// 按配置构造校验器；关闭校验时返回不做校验的版本
    pub fn verifier(config: &TopologyConfig) -> TopologyVerifier {
        if !config.verify {
            tracing::warn!("Topology verification is disabled");
            return TopologyVerifier::disabled();
        }
        let topology = Arc::new(Self::new(config.clone()));
        TopologyVerifier::new(TopologyProviders {
            registry: topology.clone(),
            pd: topology,
        })
    }
}

#[async_trait]
impl ClusterRegistry for StaticTopology {
    async fn fetch_members(&self, kind: NodeKind) -> Result<Vec<ComponentInfo>> {
        match kind {
            NodeKind::Tidb => Ok(self.config.tidb.clone()),
            NodeKind::Ticdc => Ok(self.config.ticdc.clone()),
            NodeKind::Tiproxy => Ok(self.config.tiproxy.clone()),
            NodeKind::Pd
            | NodeKind::Tikv
            | NodeKind::Tiflash
            | NodeKind::Tso
            | NodeKind::Scheduling => Err(AppError::UnknownComponent(kind)),
        }
    }
}

#[async_trait]
impl PdTopology for StaticTopology {
    async fn fetch_stores(&self) -> Result<StoreTopology> {
        Ok(StoreTopology {
            tikv: self.config.tikv.clone(),
            tiflash: self.config.tiflash.clone(),
        })
    }

    async fn fetch_pd_members(&self) -> Result<Vec<ComponentInfo>> {
        Ok(self.config.pd.clone())
    }

    async fn fetch_micro_service_members(&self, kind: NodeKind) -> Result<Vec<ComponentInfo>> {
        match kind {
            NodeKind::Tso => Ok(self.config.tso.clone()),
            NodeKind::Scheduling => Ok(self.config.scheduling.clone()),
            NodeKind::Tidb
            | NodeKind::Pd
            | NodeKind::Tikv
            | NodeKind::Tiflash
            | NodeKind::Ticdc
            | NodeKind::Tiproxy => Err(AppError::UnknownComponent(kind)),
        }
    }
}
