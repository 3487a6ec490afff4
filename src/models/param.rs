use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::{Value, json};
use thiserror::Error;

/// 参数解析后的值。十六进制 key 会解码成任意字节，所以统一用字节串表示
pub type ParamValue = Vec<u8>;

/// 参数值校验失败
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ParamError(pub String);

/// 下拉框选项
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EnumItem {
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_as: Option<String>,
}

impl EnumItem {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            display_as: None,
        }
    }

    pub fn with_display(value: impl Into<String>, display_as: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            display_as: Some(display_as.into()),
        }
    }
}

/// 参数类型。每种类型决定 UI 控件和服务端的校验/规范化规则
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamKind {
    Text,
    Int,
    Enum(Vec<EnumItem>),
    HexKey,
    DbName,
    TableName,
    TableId,
}

impl ParamKind {
    /// 由取值列表构造一个不带显示名的枚举
    pub fn enum_of(values: &[&str]) -> Self {
        ParamKind::Enum(values.iter().map(|v| EnumItem::new(*v)).collect())
    }

    /// 将用户输入转换成要发送的值。返回多个值时查询参数会重复出现
    ///
    /// 纯函数，不做任何 I/O。
    pub fn resolve(&self, raw: &str) -> Result<Vec<ParamValue>, ParamError> {
        match self {
            ParamKind::Text | ParamKind::DbName | ParamKind::TableName | ParamKind::TableId => {
                Ok(vec![raw.as_bytes().to_vec()])
            }
            ParamKind::Int => {
                if !raw.is_empty() && raw.parse::<i64>().is_err() {
                    return Err(ParamError(format!("'{}' is not a valid int", raw)));
                }
                Ok(vec![raw.as_bytes().to_vec()])
            }
            ParamKind::Enum(items) => {
                if items.iter().any(|item| item.value == raw) {
                    Ok(vec![raw.as_bytes().to_vec()])
                } else {
                    Err(ParamError(format!("'{}' is not a valid value", raw)))
                }
            }
            ParamKind::HexKey => {
                let invalid = || ParamError(format!("'{}' is not a valid hex key", raw));
                if raw.is_empty() || raw.len() % 2 != 0 {
                    return Err(invalid());
                }
                let bytes = hex::decode(raw).map_err(|_| invalid())?;
                Ok(vec![bytes])
            }
        }
    }

    pub fn ui_kind(&self) -> &'static str {
        match self {
            ParamKind::Text | ParamKind::Int | ParamKind::HexKey => "text",
            ParamKind::Enum(_) => "dropdown",
            ParamKind::DbName => "db_dropdown",
            ParamKind::TableName => "table_dropdown",
            ParamKind::TableId => "table_id_dropdown",
        }
    }

    pub fn ui_props(&self) -> Value {
        match self {
            ParamKind::Text | ParamKind::DbName | ParamKind::TableName | ParamKind::TableId => {
                Value::Null
            }
            ParamKind::Int => json!({ "placeholder": "integer" }),
            ParamKind::HexKey => json!({ "placeholder": "hex encoded key" }),
            ParamKind::Enum(items) => json!({ "items": items }),
        }
    }
}

/// 参数描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDescriptor {
    pub name: String,
    pub required: bool,
    pub kind: ParamKind,
}

impl ParamDescriptor {
    pub fn required(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            required: true,
            kind,
        }
    }

    pub fn optional(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            required: false,
            kind,
        }
    }

    pub fn resolve(&self, raw: &str) -> Result<Vec<ParamValue>, ParamError> {
        self.kind.resolve(raw)
    }
}

// 前端依赖这个 JSON 结构，字段名不能随意改动
impl Serialize for ParamDescriptor {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("ParamDescriptor", 4)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("required", &self.required)?;
        state.serialize_field("ui_kind", self.kind.ui_kind())?;
        state.serialize_field("ui_props", &self.kind.ui_props())?;
        state.end()
    }
}
