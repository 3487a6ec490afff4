use super::profiling;
use crate::models::{EndpointDefinition, NodeKind, ParamDescriptor, ParamKind};

fn ticdc() -> Vec<EndpointDefinition> {
    vec![
        EndpointDefinition::get("ticdc_status", NodeKind::Ticdc, "/status"),
        EndpointDefinition::get("ticdc_captures", NodeKind::Ticdc, "/api/v1/captures"),
        EndpointDefinition::get("ticdc_changefeeds", NodeKind::Ticdc, "/api/v1/changefeeds")
            .query_param(ParamDescriptor::optional(
                "state",
                ParamKind::enum_of(&["normal", "stopped", "error", "failed", "finished"]),
            )),
        profiling::go_pprof("ticdc_pprof", NodeKind::Ticdc, ""),
    ]
}

fn tiproxy() -> Vec<EndpointDefinition> {
    vec![
        EndpointDefinition::get("tiproxy_config", NodeKind::Tiproxy, "/api/admin/config/")
            .query_param(ParamDescriptor::optional(
                "format",
                ParamKind::enum_of(&["toml", "json"]),
            )),
        profiling::go_pprof("tiproxy_pprof", NodeKind::Tiproxy, "/api"),
    ]
}

fn micro_services() -> Vec<EndpointDefinition> {
    vec![
        EndpointDefinition::get("tso_health", NodeKind::Tso, "/tso/api/v1/health"),
        EndpointDefinition::get("tso_config", NodeKind::Tso, "/tso/api/v1/config"),
        profiling::go_pprof("tso_pprof", NodeKind::Tso, ""),
        EndpointDefinition::get("scheduling_health", NodeKind::Scheduling, "/scheduling/api/v1/health"),
        EndpointDefinition::get("scheduling_config", NodeKind::Scheduling, "/scheduling/api/v1/config"),
        profiling::go_pprof("scheduling_pprof", NodeKind::Scheduling, ""),
    ]
}

pub fn endpoints() -> Vec<EndpointDefinition> {
    let mut endpoints = ticdc();
    endpoints.extend(tiproxy());
    endpoints.extend(micro_services());
    endpoints
}
