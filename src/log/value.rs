//! 解码后的通用值树
//!
//! 与具体 schema 无关的动态类型值。二进制载荷一律以 base64 文本出现。

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// 解码后的值。
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// 十进制数按 `f64` 读取，精度损失可接受
    Decimal(f64),
    /// Ion 文本形式的时间戳
    Timestamp(String),
    String(String),
    /// 已解析符号表的符号文本
    Symbol(String),
    Struct(Fields),
    List(Vec<DecodedValue>),
    /// 原始字节的 base64 编码
    Blob(String),
}

/// 有序字段集合；字段名唯一。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fields(Vec<(String, DecodedValue)>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入字段。重复字段名保留首次出现的位置，值取最后一次。
    pub fn insert(&mut self, name: impl Into<String>, value: DecodedValue) {
        let name = name.into();
        if let Some(slot) = self.0.iter_mut().find(|(k, _)| *k == name) {
            slot.1 = value;
        } else {
            self.0.push((name, value));
        }
    }

    pub fn get(&self, name: &str) -> Option<&DecodedValue> {
        self.0.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DecodedValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, DecodedValue)> for Fields {
    fn from_iter<I: IntoIterator<Item = (String, DecodedValue)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (k, v) in iter {
            fields.insert(k, v);
        }
        fields
    }
}

impl IntoIterator for Fields {
    type Item = (String, DecodedValue);
    type IntoIter = std::vec::IntoIter<(String, DecodedValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl DecodedValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            DecodedValue::Null => "null",
            DecodedValue::Bool(_) => "bool",
            DecodedValue::Int(_) => "int",
            DecodedValue::Float(_) => "float",
            DecodedValue::Decimal(_) => "decimal",
            DecodedValue::Timestamp(_) => "timestamp",
            DecodedValue::String(_) => "string",
            DecodedValue::Symbol(_) => "symbol",
            DecodedValue::Struct(_) => "struct",
            DecodedValue::List(_) => "list",
            DecodedValue::Blob(_) => "blob",
        }
    }

    /// 与 JavaScript 相同的真值判定：null、false、0、NaN、空串为假。
    pub fn is_truthy(&self) -> bool {
        match self {
            DecodedValue::Null => false,
            DecodedValue::Bool(b) => *b,
            DecodedValue::Int(i) => *i != 0,
            DecodedValue::Float(f) | DecodedValue::Decimal(f) => *f != 0.0 && !f.is_nan(),
            DecodedValue::Timestamp(s)
            | DecodedValue::String(s)
            | DecodedValue::Symbol(s)
            | DecodedValue::Blob(s) => !s.is_empty(),
            DecodedValue::Struct(_) | DecodedValue::List(_) => true,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, DecodedValue::Null)
    }

    /// 结构体字段；非结构体返回 `None`。
    pub fn get(&self, name: &str) -> Option<&DecodedValue> {
        match self {
            DecodedValue::Struct(fields) => fields.get(name),
            _ => None,
        }
    }

    /// 按路径逐级查找；结构体按字段名，列表按十进制下标。
    pub fn pointer(&self, path: &[&str]) -> Option<&DecodedValue> {
        let mut cur = self;
        for seg in path {
            cur = match cur {
                DecodedValue::Struct(fields) => fields.get(seg)?,
                DecodedValue::List(items) => items.get(seg.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(cur)
    }

    pub fn as_struct(&self) -> Option<&Fields> {
        match self {
            DecodedValue::Struct(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[DecodedValue]> {
        match self {
            DecodedValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// 字符串或符号的文本
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DecodedValue::String(s) | DecodedValue::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DecodedValue::Int(i) => Some(*i as f64),
            DecodedValue::Float(f) | DecodedValue::Decimal(f) => Some(*f),
            _ => None,
        }
    }

    /// 整数；有限浮点数向零截断。
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DecodedValue::Int(i) => Some(*i),
            DecodedValue::Float(f) | DecodedValue::Decimal(f) if f.is_finite() => Some(f.trunc() as i64),
            _ => None,
        }
    }

    /// Blob 的原始字节（base64 解码，逐字节还原）。
    pub fn blob_bytes(&self) -> Option<Vec<u8>> {
        match self {
            DecodedValue::Blob(b64) => STANDARD.decode(b64).ok(),
            _ => None,
        }
    }

    pub fn blob_from_bytes(bytes: &[u8]) -> DecodedValue {
        DecodedValue::Blob(STANDARD.encode(bytes))
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl From<&str> for DecodedValue {
    fn from(s: &str) -> Self {
        DecodedValue::String(s.to_string())
    }
}

impl From<String> for DecodedValue {
    fn from(s: String) -> Self {
        DecodedValue::String(s)
    }
}

impl From<i64> for DecodedValue {
    fn from(i: i64) -> Self {
        DecodedValue::Int(i)
    }
}

impl From<f64> for DecodedValue {
    fn from(f: f64) -> Self {
        DecodedValue::Float(f)
    }
}

impl From<bool> for DecodedValue {
    fn from(b: bool) -> Self {
        DecodedValue::Bool(b)
    }
}

impl From<Fields> for DecodedValue {
    fn from(fields: Fields) -> Self {
        DecodedValue::Struct(fields)
    }
}

impl Serialize for DecodedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DecodedValue::Null => serializer.serialize_unit(),
            DecodedValue::Bool(b) => serializer.serialize_bool(*b),
            DecodedValue::Int(i) => serializer.serialize_i64(*i),
            DecodedValue::Float(f) | DecodedValue::Decimal(f) => serializer.serialize_f64(*f),
            DecodedValue::Timestamp(s)
            | DecodedValue::String(s)
            | DecodedValue::Symbol(s)
            | DecodedValue::Blob(s) => serializer.serialize_str(s),
            DecodedValue::Struct(fields) => fields.serialize(serializer),
            DecodedValue::List(items) => serializer.collect_seq(items),
        }
    }
}

impl Serialize for Fields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (k, v) in self.iter() {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}
