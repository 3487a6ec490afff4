use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 集群组件类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Tidb,
    Pd,
    Tikv,
    Tiflash,
    Ticdc,
    Tiproxy,
    Tso,
    Scheduling,
}

impl NodeKind {
    pub const ALL: [NodeKind; 8] = [
        NodeKind::Tidb,
        NodeKind::Pd,
        NodeKind::Tikv,
        NodeKind::Tiflash,
        NodeKind::Ticdc,
        NodeKind::Tiproxy,
        NodeKind::Tso,
        NodeKind::Scheduling,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Tidb => "tidb",
            NodeKind::Pd => "pd",
            NodeKind::Tikv => "tikv",
            NodeKind::Tiflash => "tiflash",
            NodeKind::Ticdc => "ticdc",
            NodeKind::Tiproxy => "tiproxy",
            NodeKind::Tso => "tso",
            NodeKind::Scheduling => "scheduling",
        }
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tidb" => Ok(NodeKind::Tidb),
            "pd" => Ok(NodeKind::Pd),
            "tikv" => Ok(NodeKind::Tikv),
            "tiflash" => Ok(NodeKind::Tiflash),
            "ticdc" => Ok(NodeKind::Ticdc),
            "tiproxy" => Ok(NodeKind::Tiproxy),
            "tso" => Ok(NodeKind::Tso),
            "scheduling" => Ok(NodeKind::Scheduling),
            _ => Err(format!("Unknown component: {}", s)),
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 拓扑中的一个组件实例
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComponentInfo {
    pub ip: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub status_port: u16,
}

impl ComponentInfo {
    pub fn new(ip: impl Into<String>, port: u16, status_port: u16) -> Self {
        Self {
            ip: ip.into(),
            port,
            status_port,
        }
    }
}

/// PD 返回的存储节点拓扑，按存储类型区分
#[derive(Debug, Clone, Default)]
pub struct StoreTopology {
    pub tikv: Vec<ComponentInfo>,
    pub tiflash: Vec<ComponentInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_kind_round_trip_names() {
        for kind in NodeKind::ALL {
            assert_eq!(kind.as_str().parse::<NodeKind>(), Ok(kind));
            assert_eq!(
                serde_json::to_string(&kind).unwrap(),
                format!("\"{}\"", kind.as_str())
            );
        }
        assert_eq!("TiKV".parse::<NodeKind>(), Ok(NodeKind::Tikv));
        assert_eq!(
            "tidb-server".parse::<NodeKind>(),
            Err("Unknown component: tidb-server".to_string())
        );
    }
}
