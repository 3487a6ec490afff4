use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use super::component::NodeKind;
use super::param::ParamDescriptor;
use super::request::PreparedRequest;

/// 请求方法，目前所有接口都是只读 GET
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
}

impl HttpMethod {
    pub fn as_reqwest(&self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
        }
    }
}

/// 发送前对请求做的修改，例如强制设置 Content-Type
pub trait BeforeSend: fmt::Debug + Send + Sync {
    fn apply(&self, request: &mut PreparedRequest);
}

/// 覆盖请求头中的 Content-Type
///
/// TiKV / TiFlash 的 profile 接口只有在请求 `application/protobuf` 时才返回 pprof 格式。
#[derive(Debug, Clone, Copy)]
pub struct ForceContentType(pub &'static str);

impl BeforeSend for ForceContentType {
    fn apply(&self, request: &mut PreparedRequest) {
        request
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(self.0));
    }
}

/// 一个下游接口的定义
#[derive(Debug, Clone, Serialize)]
pub struct EndpointDefinition {
    pub id: String,
    pub component: NodeKind,
    pub method: HttpMethod,
    pub path: String,
    pub path_params: Vec<ParamDescriptor>,
    pub query_params: Vec<ParamDescriptor>,
    #[serde(skip)]
    pub before_send: Option<Arc<dyn BeforeSend>>,
}

impl EndpointDefinition {
    pub fn get(id: impl Into<String>, component: NodeKind, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            component,
            method: HttpMethod::Get,
            path: path.into(),
            path_params: Vec::new(),
            query_params: Vec::new(),
            before_send: None,
        }
    }

    pub fn path_param(mut self, param: ParamDescriptor) -> Self {
        // 路径参数一律必填
        self.path_params.push(ParamDescriptor {
            required: true,
            ..param
        });
        self
    }

    pub fn query_param(mut self, param: ParamDescriptor) -> Self {
        self.query_params.push(param);
        self
    }

    pub fn query_params(mut self, params: impl IntoIterator<Item = ParamDescriptor>) -> Self {
        self.query_params.extend(params);
        self
    }

    pub fn before_send(mut self, hook: impl BeforeSend + 'static) -> Self {
        self.before_send = Some(Arc::new(hook));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ParamKind, QueryValues};
    use serde_json::json;

    #[test]
    fn test_definition_json_skips_hooks() {
        let def = EndpointDefinition::get("tikv_pprof", NodeKind::Tikv, "/debug/pprof/profile")
            .query_param(ParamDescriptor::optional("seconds", ParamKind::enum_of(&["10"])))
            .before_send(ForceContentType("application/protobuf"));

        let value = serde_json::to_value(&def).unwrap();
        assert_eq!(value["id"], "tikv_pprof");
        assert_eq!(value["component"], "tikv");
        assert_eq!(value["method"], "GET");
        assert_eq!(value["path"], "/debug/pprof/profile");
        assert_eq!(value["path_params"], json!([]));
        assert_eq!(value["query_params"][0]["name"], "seconds");
        assert!(value.get("before_send").is_none());
    }

    #[test]
    fn test_path_params_are_required() {
        let def = EndpointDefinition::get("x", NodeKind::Pd, "/store/{id}")
            .path_param(ParamDescriptor::optional("id", ParamKind::Int));
        assert!(def.path_params[0].required);
    }

    #[test]
    fn test_force_content_type() {
        let mut request = PreparedRequest::new(
            reqwest::Method::GET,
            "http://127.0.0.1:20180".to_string(),
            "/debug/pprof/profile".to_string(),
            QueryValues::new(),
        );
        ForceContentType("application/protobuf").apply(&mut request);
        assert_eq!(
            request.headers.get(CONTENT_TYPE).unwrap(),
            "application/protobuf"
        );
    }
}
