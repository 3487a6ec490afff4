use super::profiling;
use crate::models::{EndpointDefinition, NodeKind, ParamDescriptor, ParamKind};

fn db() -> ParamDescriptor {
    ParamDescriptor::required("db", ParamKind::DbName)
}

fn table() -> ParamDescriptor {
    ParamDescriptor::required("table", ParamKind::TableName)
}

fn get(id: &str, path: &str) -> EndpointDefinition {
    EndpointDefinition::get(id, NodeKind::Tidb, path)
}

pub fn endpoints() -> Vec<EndpointDefinition> {
    vec![
        get("tidb_status", "/status"),
        get("tidb_config", "/settings"),
        get("tidb_stats_by_table", "/stats/dump/{db}/{table}")
            .path_param(db())
            .path_param(table()),
        get(
            "tidb_stats_by_table_timestamp",
            "/stats/dump/{db}/{table}/{yyyyMMddHHmmss}",
        )
        .path_param(db())
        .path_param(table())
        .path_param(ParamDescriptor::required("yyyyMMddHHmmss", ParamKind::Text)),
        get("tidb_schema", "/schema"),
        get("tidb_schema_db", "/schema/{db}").path_param(db()),
        get("tidb_schema_db_table", "/schema/{db}/{table}")
            .path_param(db())
            .path_param(table()),
        get("tidb_schema_tableid", "/db-table/{tableID}")
            .path_param(ParamDescriptor::required("tableID", ParamKind::TableId)),
        get("tidb_ddl_history", "/ddl/history")
            .query_param(ParamDescriptor::optional("start_job_id", ParamKind::Int))
            .query_param(ParamDescriptor::optional("limit", ParamKind::Int)),
        get("tidb_info", "/info"),
        get("tidb_info_all", "/info/all"),
        get("tidb_regions_meta", "/regions/meta"),
        get("tidb_region_id", "/regions/{regionID}")
            .path_param(ParamDescriptor::required("regionID", ParamKind::Int)),
        get("tidb_hot_regions", "/regions/hot"),
        get("tidb_table_regions", "/tables/{db}/{table}/regions")
            .path_param(db())
            .path_param(table()),
        get("tidb_mvcc_key", "/mvcc/key/{db}/{table}/{handle}")
            .path_param(db())
            .path_param(table())
            .path_param(ParamDescriptor::required("handle", ParamKind::Int)),
        profiling::go_pprof("tidb_pprof", NodeKind::Tidb, ""),
    ]
}
