//! Endpoint catalog
//!
//! The built-in definitions are compiled in and loaded once at startup.
//! Definitions targeting a component without a registered client are hidden.

mod pd;
mod profiling;
mod store;
mod tidb;
mod tools;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::models::{EndpointDefinition, NodeKind};
use crate::services::ClientRegistry;
use crate::utils::error::{AppError, Result};
use crate::utils::path_template;

/// 所有内置接口定义
pub fn builtin_endpoints() -> Vec<EndpointDefinition> {
    let mut endpoints = Vec::new();
    endpoints.extend(tidb::endpoints());
    endpoints.extend(pd::endpoints());
    endpoints.extend(store::endpoints());
    endpoints.extend(tools::endpoints());
    endpoints
}

/// 只读的接口目录
#[derive(Debug, Clone)]
pub struct Catalog {
    endpoints: Vec<Arc<EndpointDefinition>>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// 校验全部定义后，按客户端注册情况过滤
    pub fn new(definitions: Vec<EndpointDefinition>, clients: &ClientRegistry) -> Result<Self> {
        Self::with_filter(definitions, |kind| clients.contains(kind))
    }

    pub fn builtin(clients: &ClientRegistry) -> Result<Self> {
        Self::new(builtin_endpoints(), clients)
    }

    fn with_filter(
        definitions: Vec<EndpointDefinition>,
        is_reachable: impl Fn(NodeKind) -> bool,
    ) -> Result<Self> {
        let mut ids = HashSet::new();
        for def in &definitions {
            validate(def)?;
            if !ids.insert(def.id.as_str()) {
                return Err(AppError::Config(format!("Duplicate API endpoint id '{}'", def.id)));
            }
        }

        let total = definitions.len();
        let endpoints: Vec<Arc<EndpointDefinition>> = definitions
            .into_iter()
            .filter(|def| is_reachable(def.component))
            .map(Arc::new)
            .collect();

        let index = endpoints
            .iter()
            .enumerate()
            .map(|(i, def)| (def.id.clone(), i))
            .collect();

        tracing::info!(
            "Loaded {} API endpoints ({} hidden without a client)",
            endpoints.len(),
            total - endpoints.len()
        );

        Ok(Self { endpoints, index })
    }

    pub fn list_all(&self) -> &[Arc<EndpointDefinition>] {
        &self.endpoints
    }

    pub fn lookup(&self, id: &str) -> Option<Arc<EndpointDefinition>> {
        self.index.get(id).map(|&i| self.endpoints[i].clone())
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

/// 模板占位符与路径参数一一对应，参数名在同一个接口内唯一
fn validate(def: &EndpointDefinition) -> Result<()> {
    let invalid = |msg: String| AppError::Config(format!("API endpoint '{}': {}", def.id, msg));

    if def.id.is_empty() {
        return Err(AppError::Config("API endpoint id must not be empty".to_string()));
    }
    if !def.path.starts_with('/') {
        return Err(invalid(format!("path '{}' must start with '/'", def.path)));
    }

    let mut names = HashSet::new();
    for param in def.path_params.iter().chain(def.query_params.iter()) {
        if param.name.is_empty() {
            return Err(invalid("parameter name must not be empty".to_string()));
        }
        if !names.insert(param.name.as_str()) {
            return Err(invalid(format!("duplicate parameter '{}'", param.name)));
        }
    }

    let placeholders = path_template::placeholders(&def.path);
    let mut seen = HashSet::new();
    for name in &placeholders {
        if !seen.insert(*name) {
            return Err(invalid(format!("placeholder '{{{}}}' appears more than once", name)));
        }
        if !def.path_params.iter().any(|p| p.name == *name) {
            return Err(invalid(format!("placeholder '{{{}}}' has no path parameter", name)));
        }
    }
    for param in &def.path_params {
        if !seen.contains(param.name.as_str()) {
            return Err(invalid(format!(
                "path parameter '{}' does not appear in the path",
                param.name
            )));
        }
    }

    Ok(())
}
