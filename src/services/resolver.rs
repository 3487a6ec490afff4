use std::collections::HashMap;
use std::sync::Arc;

use crate::catalog::Catalog;
use crate::models::{ParamDescriptor, ParamValue, QueryValues, RequestPayload, ResolvedRequest};
use crate::utils::error::{AppError, Result};
use crate::utils::path_template;

/// 将用户提交的参数解析成可以直接发送的请求
#[derive(Debug, Clone)]
pub struct PayloadResolver {
    catalog: Arc<Catalog>,
}

impl PayloadResolver {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn resolve(&self, payload: &RequestPayload) -> Result<ResolvedRequest> {
        let endpoint = self.catalog.lookup(&payload.api_id).ok_or_else(|| {
            AppError::BadRequest(format!("Unknown API endpoint '{}'", payload.api_id))
        })?;

        // 路径参数：全部必填，只取第一个值，转义一次
        let path = {
            let mut substitutions: HashMap<&str, String> = HashMap::new();
            for param in &endpoint.path_params {
                let raw = raw_value(payload, param);
                if raw.is_empty() {
                    return Err(required(param));
                }
                let values = resolve_param(param, raw)?;
                // `.` 和 `..` 会被 URL 规范化吞掉，导致访问目录之外的路径
                if matches!(values[0].as_slice(), b"." | b"..") {
                    return Err(AppError::BadRequest(format!(
                        "parameter '{}' is invalid, cause: '{}' is not a valid path segment",
                        param.name, raw
                    )));
                }
                substitutions.insert(
                    param.name.as_str(),
                    path_template::escape_path_segment(&values[0]),
                );
            }
            path_template::render(&endpoint.path, &substitutions).map_err(|name| {
                AppError::BadRequest(format!("parameter '{}' is required", name))
            })?
        };

        let mut query = QueryValues::new();
        for param in &endpoint.query_params {
            let raw = raw_value(payload, param);
            if raw.is_empty() {
                if param.required {
                    return Err(required(param));
                }
                continue;
            }
            for value in resolve_param(param, raw)? {
                query.append(param.name.as_str(), value);
            }
        }

        tracing::debug!(
            "Resolved {} to {}{}",
            endpoint.id,
            path,
            if query.is_empty() {
                String::new()
            } else {
                format!("?{}", query.encode())
            }
        );

        Ok(ResolvedRequest {
            endpoint,
            host: payload.host.clone(),
            port: payload.port,
            path,
            query,
        })
    }
}

fn raw_value<'a>(payload: &'a RequestPayload, param: &ParamDescriptor) -> &'a str {
    payload
        .param_values
        .get(&param.name)
        .map(String::as_str)
        .unwrap_or("")
}

fn required(param: &ParamDescriptor) -> AppError {
    AppError::BadRequest(format!("parameter '{}' is required", param.name))
}

/// 调用参数类型的解析逻辑；非空输入解析出空列表也视为非法
fn resolve_param(param: &ParamDescriptor, raw: &str) -> Result<Vec<ParamValue>> {
    let values = param.resolve(raw).map_err(|e| {
        AppError::BadRequest(format!("parameter '{}' is invalid, cause: {}", param.name, e))
    })?;
    if values.is_empty() {
        return Err(AppError::BadRequest(format!(
            "parameter '{}' is invalid, cause: parameter produced no values",
            param.name
        )));
    }
    Ok(values)
}
