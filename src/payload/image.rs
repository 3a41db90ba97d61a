//! 压缩图像帧
//!
//! `data` 可以是字节数组、Python 字节串字面量文本（`b'\xff\xd8...'`）或 blob。

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;

use super::error::PayloadError;
use crate::log::DecodedValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFormat {
    Jpeg,
    Png,
    Other,
}

impl ImageFormat {
    pub fn from_format(format: &str) -> Self {
        let format = format.to_lowercase();
        if format.contains("jpeg") || format.contains("jpg") {
            ImageFormat::Jpeg
        } else if format.contains("png") {
            ImageFormat::Png
        } else {
            ImageFormat::Other
        }
    }

    /// 未知格式按 JPEG 显示
    pub fn mime(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg | ImageFormat::Other => "image/jpeg",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageFrame {
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}

impl ImageFrame {
    pub fn from_message(data: &DecodedValue) -> Result<Self, PayloadError> {
        let format = data
            .get("format")
            .and_then(DecodedValue::as_str)
            .map_or(ImageFormat::Other, ImageFormat::from_format);
        let payload = data
            .get("data")
            .filter(|v| v.is_truthy())
            .ok_or(PayloadError::MissingField("data"))?;
        let bytes = match payload {
            DecodedValue::List(items) => byte_list(items)?,
            DecodedValue::String(text) => parse_python_bytes(text)?,
            DecodedValue::Blob(_) => payload
                .blob_bytes()
                .ok_or_else(|| PayloadError::InvalidBlob("not base64".to_string()))?,
            other => {
                return Err(PayloadError::UnexpectedType {
                    field: "data",
                    found: other.kind_name(),
                });
            }
        };
        if bytes.is_empty() {
            return Err(PayloadError::EmptyImage);
        }
        Ok(Self { format, bytes })
    }

    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.format.mime(), STANDARD.encode(&self.bytes))
    }
}

fn byte_list(items: &[DecodedValue]) -> Result<Vec<u8>, PayloadError> {
    items
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let n = v.as_i64().ok_or(PayloadError::UnexpectedType {
                field: "data[]",
                found: v.kind_name(),
            })?;
            u8::try_from(n).map_err(|_| PayloadError::ByteOutOfRange(n, i))
        })
        .collect()
}

/// 解析 Python `bytes` 的 repr 文本。支持 `\xNN \n \r \t \\`，其他转义取字符本身。
pub fn parse_python_bytes(text: &str) -> Result<Vec<u8>, PayloadError> {
    let s = text.trim();
    let s = ["'", "\""]
        .iter()
        .find_map(|q| {
            s.strip_prefix('b')
                .and_then(|rest| rest.strip_prefix(*q))
                .and_then(|rest| rest.strip_suffix(*q))
        })
        .unwrap_or(s);

    let mut out = Vec::with_capacity(s.len());
    let mut chars = s.char_indices();
    while let Some((offset, c)) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        let Some((_, esc)) = chars.next() else { break };
        match esc {
            'x' => {
                let hex: String = chars.by_ref().take(2).map(|(_, c)| c).collect();
                if hex.len() != 2 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
                    return Err(PayloadError::InvalidHexEscape(offset));
                }
                let value = u8::from_str_radix(&hex, 16)
                    .map_err(|_| PayloadError::InvalidHexEscape(offset))?;
                out.push(value);
            }
            'n' => out.push(b'\n'),
            'r' => out.push(b'\r'),
            't' => out.push(b'\t'),
            other => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(other.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
    Ok(out)
}
