use crate::models::{EndpointDefinition, EnumItem, NodeKind, ParamDescriptor, ParamKind};

/// pprof handler 名称
pub fn kind_param() -> ParamDescriptor {
    ParamDescriptor::required(
        "kind",
        ParamKind::enum_of(&[
            "allocs",
            "block",
            "goroutine",
            "heap",
            "mutex",
            "profile",
            "threadcreate",
            "trace",
        ]),
    )
}

/// 采样时长，单位秒
pub fn seconds_param() -> ParamDescriptor {
    ParamDescriptor::optional(
        "seconds",
        ParamKind::Enum(vec![
            EnumItem::with_display("10", "10s"),
            EnumItem::with_display("30", "30s"),
            EnumItem::with_display("60", "60s"),
        ]),
    )
}

pub fn debug_param() -> ParamDescriptor {
    ParamDescriptor::optional(
        "debug",
        ParamKind::Enum(vec![
            EnumItem::with_display("0", "binary"),
            EnumItem::with_display("1", "text"),
            EnumItem::with_display("2", "text with goroutine stacks"),
        ]),
    )
}

/// Go 组件通用的 `/debug/pprof/{kind}` 接口
pub fn go_pprof(id: &str, component: NodeKind, prefix: &str) -> EndpointDefinition {
    EndpointDefinition::get(id, component, format!("{}/debug/pprof/{{kind}}", prefix))
        .path_param(kind_param())
        .query_params([seconds_param(), debug_param()])
}
