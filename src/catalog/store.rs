use super::profiling;
use crate::models::{EndpointDefinition, ForceContentType, NodeKind, ParamDescriptor, ParamKind};

const PROTOBUF: &str = "application/protobuf";

/// TiKV 与 TiFlash 的状态服务接口一致
fn store_endpoints(prefix: &str, component: NodeKind) -> Vec<EndpointDefinition> {
    let id = |name: &str| format!("{}_{}", prefix, name);
    vec![
        EndpointDefinition::get(id("config"), component, "/config").query_param(
            ParamDescriptor::optional("full", ParamKind::enum_of(&["true", "false"])),
        ),
        EndpointDefinition::get(id("status"), component, "/status"),
        EndpointDefinition::get(id("region_meta"), component, "/region/{regionID}")
            .path_param(ParamDescriptor::required("regionID", ParamKind::Int)),
        EndpointDefinition::get(id("pprof"), component, "/debug/pprof/profile")
            .query_param(profiling::seconds_param())
            .before_send(ForceContentType(PROTOBUF)),
    ]
}

pub fn endpoints() -> Vec<EndpointDefinition> {
    let mut endpoints = store_endpoints("tikv", NodeKind::Tikv);
    endpoints.extend(store_endpoints("tiflash", NodeKind::Tiflash));
    endpoints
}
