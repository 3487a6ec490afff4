use super::profiling;
use crate::models::{EndpointDefinition, EnumItem, NodeKind, ParamDescriptor, ParamKind};

const PREFIX: &str = "/pd/api/v1";

fn get(id: &str, path: &str) -> EndpointDefinition {
    EndpointDefinition::get(id, NodeKind::Pd, format!("{}{}", PREFIX, path))
}

fn limit() -> ParamDescriptor {
    ParamDescriptor::optional("limit", ParamKind::Int)
}

fn region_check_state() -> ParamKind {
    ParamKind::enum_of(&[
        "miss-peer",
        "extra-peer",
        "down-peer",
        "pending-peer",
        "offline-peer",
        "empty-region",
        "learner-peer",
        "oversized-region",
        "undersized-region",
        "hist-size",
        "hist-keys",
    ])
}

fn store_state() -> ParamKind {
    ParamKind::Enum(vec![
        EnumItem::with_display("0", "Up"),
        EnumItem::with_display("1", "Offline"),
        EnumItem::with_display("2", "Tombstone"),
    ])
}

pub fn endpoints() -> Vec<EndpointDefinition> {
    vec![
        get("pd_cluster", "/cluster"),
        get("pd_cluster_status", "/cluster/status"),
        get("pd_config_show_all", "/config"),
        get("pd_health", "/health"),
        get("pd_hot_read", "/hotspot/regions/read"),
        get("pd_hot_write", "/hotspot/regions/write"),
        get("pd_hot_stores", "/hotspot/stores"),
        get("pd_labels", "/labels"),
        get("pd_members", "/members"),
        get("pd_leader", "/leader"),
        get("pd_operators", "/operators").query_param(ParamDescriptor::optional(
            "kind",
            ParamKind::enum_of(&["admin", "leader", "region"]),
        )),
        get("pd_regions", "/regions"),
        get("pd_region_id", "/region/id/{regionID}")
            .path_param(ParamDescriptor::required("regionID", ParamKind::Int)),
        get("pd_region_key", "/region/key/{regionKey}")
            .path_param(ParamDescriptor::required("regionKey", ParamKind::HexKey)),
        get("pd_regions_key", "/regions/key")
            .query_param(ParamDescriptor::required("key", ParamKind::HexKey))
            .query_param(ParamDescriptor::optional("end_key", ParamKind::HexKey))
            .query_param(limit()),
        get("pd_regions_store", "/regions/store/{storeID}")
            .path_param(ParamDescriptor::required("storeID", ParamKind::Int)),
        get("pd_regions_writeflow", "/regions/writeflow").query_param(limit()),
        get("pd_regions_readflow", "/regions/readflow").query_param(limit()),
        get("pd_regions_confver", "/regions/confver").query_param(limit()),
        get("pd_regions_version", "/regions/version").query_param(limit()),
        get("pd_regions_size", "/regions/size").query_param(limit()),
        get("pd_regions_check", "/regions/check/{state}")
            .path_param(ParamDescriptor::required("state", region_check_state())),
        get("pd_schedulers", "/schedulers").query_param(ParamDescriptor::optional(
            "status",
            ParamKind::enum_of(&["paused", "disabled"]),
        )),
        get("pd_stores", "/stores")
            .query_param(ParamDescriptor::optional("state", store_state())),
        get("pd_stores_label", "/labels/stores")
            .query_param(ParamDescriptor::required("name", ParamKind::Text))
            .query_param(ParamDescriptor::optional("value", ParamKind::Text)),
        get("pd_store_id", "/store/{storeID}")
            .path_param(ParamDescriptor::required("storeID", ParamKind::Int)),
        get("pd_version", "/version"),
        profiling::go_pprof("pd_pprof", NodeKind::Pd, PREFIX),
    ]
}
