use reqwest::header::HeaderMap;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::endpoint::EndpointDefinition;
use super::param::ParamValue;
use crate::utils::error::{AppError, Result};

/// 用户提交的请求
#[derive(Debug, Clone, Deserialize)]
pub struct RequestPayload {
    pub api_id: String,
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub param_values: HashMap<String, String>,
}

/// 有序的多值查询参数
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryValues {
    pairs: Vec<(String, ParamValue)>,
}

impl QueryValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, name: impl Into<String>, value: ParamValue) {
        self.pairs.push((name.into(), value));
    }

    pub fn get_all(&self, name: &str) -> Vec<&[u8]> {
        self.pairs
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
            .collect()
    }

    /// 取第一个值，并要求是合法 UTF-8
    pub fn first_str(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| std::str::from_utf8(v).ok())
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.pairs.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
    }

    /// 编码成 `a=1&a=2&b=x` 形式，按插入顺序输出
    pub fn encode(&self) -> String {
        self.pairs
            .iter()
            .map(|(name, value)| {
                format!(
                    "{}={}",
                    urlencoding::encode(name),
                    urlencoding::encode_binary(value)
                )
            })
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// 校验、转义完成后的请求，只在一次分发过程中存活
#[derive(Debug, Clone)]
pub struct ResolvedRequest {
    pub endpoint: Arc<EndpointDefinition>,
    pub host: String,
    pub port: u16,
    pub path: String,
    pub query: QueryValues,
}

/// 即将发给下游组件的 HTTP 请求
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: reqwest::Method,
    pub base_url: String,
    /// 已经转义过的路径，拼接时不能再转义
    pub path: String,
    pub query: QueryValues,
    pub headers: HeaderMap,
    pub timeout: Option<Duration>,
}

impl PreparedRequest {
    pub fn new(method: reqwest::Method, base_url: String, path: String, query: QueryValues) -> Self {
        Self {
            method,
            base_url,
            path,
            query,
            headers: HeaderMap::new(),
            timeout: None,
        }
    }

    pub fn url(&self) -> Result<reqwest::Url> {
        let raw = format!("{}{}", self.base_url.trim_end_matches('/'), self.path);
        let mut url = reqwest::Url::parse(&raw)
            .map_err(|e| AppError::BadRequest(format!("invalid request url '{}': {}", raw, e)))?;
        if !self.query.is_empty() {
            url.set_query(Some(&self.query.encode()));
        }
        Ok(url)
    }
}
