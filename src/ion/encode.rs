//! Ion 二进制写入器
//!
//! 用于构造测试夹具与示例日志。所有字段名、符号值与注解文本都会被收集进
//! 一个本地符号表，写在版本标记之后。

use super::constants::{ION_BVM, SID_ION_SYMBOL_TABLE, SID_SYMBOLS, TypeCode};
use super::symbols::SymbolTable;

/// 时间戳各字段；`None` 之后的字段都不写出（决定精度）。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimestampSpec {
    /// 相对 UTC 的分钟偏移；`None` 表示未知偏移（写作 `-0`）
    pub offset_minutes: Option<i64>,
    pub year: u16,
    pub month: Option<u8>,
    pub day: Option<u8>,
    pub hour_minute: Option<(u8, u8)>,
    pub second: Option<u8>,
    pub millis: Option<u16>,
}

impl TimestampSpec {
    /// UTC 毫秒精度时间戳
    pub fn utc_millis(year: u16, month: u8, day: u8, hms: (u8, u8, u8), millis: u16) -> Self {
        Self {
            offset_minutes: Some(0),
            year,
            month: Some(month),
            day: Some(day),
            hour_minute: Some((hms.0, hms.1)),
            second: Some(hms.2),
            millis: Some(millis),
        }
    }
}

/// 待编码的值。
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Null,
    TypedNull(TypeCode),
    Bool(bool),
    Int(i64),
    Float(f64),
    Float32(f32),
    Decimal { coefficient: i64, exponent: i64 },
    Timestamp(TimestampSpec),
    String(String),
    Symbol(String),
    Clob(Vec<u8>),
    Blob(Vec<u8>),
    List(Vec<Element>),
    Sexp(Vec<Element>),
    Struct(Vec<(String, Element)>),
    Annotated(Vec<String>, Box<Element>),
    /// NOP padding，主体为 n 个零字节
    Pad(usize),
    /// 原样写出的已编码字节
    Raw(Vec<u8>),
}

impl Element {
    pub fn string(s: impl Into<String>) -> Element {
        Element::String(s.into())
    }

    pub fn symbol(s: impl Into<String>) -> Element {
        Element::Symbol(s.into())
    }

    pub fn list(items: impl IntoIterator<Item = Element>) -> Element {
        Element::List(items.into_iter().collect())
    }

    pub fn structure<K: Into<String>>(fields: impl IntoIterator<Item = (K, Element)>) -> Element {
        Element::Struct(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn annotated<K: Into<String>>(
        annotations: impl IntoIterator<Item = K>,
        value: Element,
    ) -> Element {
        Element::Annotated(
            annotations.into_iter().map(Into::into).collect(),
            Box::new(value),
        )
    }
}

/// 顶层值序列的构造器。
#[derive(Debug, Default)]
pub struct IonBuilder {
    values: Vec<Element>,
}

impl IonBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: Element) -> &mut Self {
        self.values.push(value);
        self
    }

    pub fn with(mut self, value: Element) -> Self {
        self.values.push(value);
        self
    }

    /// 编码为完整的 Ion 二进制流：BVM + 本地符号表 + 值。
    pub fn finish(&self) -> Vec<u8> {
        let mut symbols = SymbolTable::new();
        for v in &self.values {
            intern(v, &mut symbols);
        }

        let mut out = ION_BVM.to_vec();
        let local: Vec<&str> = symbols.local_symbols().flatten().collect();
        if !local.is_empty() {
            let mut list_body = Vec::new();
            for text in local {
                write_typed(&mut list_body, TypeCode::String, text.as_bytes());
            }
            let mut list = Vec::new();
            write_typed(&mut list, TypeCode::List, &list_body);

            let mut struct_body = Vec::new();
            write_var_uint(&mut struct_body, u64::from(SID_SYMBOLS));
            struct_body.extend_from_slice(&list);
            let mut lst = Vec::new();
            write_typed(&mut lst, TypeCode::Struct, &struct_body);

            write_annotation(&mut out, &[u64::from(SID_ION_SYMBOL_TABLE)], &lst);
        }

        for v in &self.values {
            encode(v, &symbols, &mut out);
        }
        out
    }
}

fn add_symbol(text: &str, symbols: &mut SymbolTable) {
    if symbols.lookup(text).is_none() {
        symbols.push(Some(text.to_string()));
    }
}

fn intern(value: &Element, symbols: &mut SymbolTable) {
    match value {
        Element::Symbol(s) => add_symbol(s, symbols),
        Element::List(items) | Element::Sexp(items) => {
            for item in items {
                intern(item, symbols);
            }
        }
        Element::Struct(fields) => {
            for (name, v) in fields {
                add_symbol(name, symbols);
                intern(v, symbols);
            }
        }
        Element::Annotated(annots, inner) => {
            for a in annots {
                add_symbol(a, symbols);
            }
            intern(inner, symbols);
        }
        _ => {}
    }
}

fn sid_of(symbols: &SymbolTable, text: &str) -> u64 {
    symbols.lookup(text).unwrap_or(0)
}

fn encode(value: &Element, symbols: &SymbolTable, out: &mut Vec<u8>) {
    match value {
        Element::Null => out.push(0x0F),
        Element::TypedNull(code) => out.push((code.nibble() << 4) | 0x0F),
        Element::Bool(b) => out.push(0x10 | u8::from(*b)),
        Element::Int(i) => {
            let code = if *i < 0 { TypeCode::NegInt } else { TypeCode::PosInt };
            write_typed(out, code, &uint_bytes(i.unsigned_abs()));
        }
        Element::Float(f) => write_typed(out, TypeCode::Float, &f.to_be_bytes()),
        Element::Float32(f) => write_typed(out, TypeCode::Float, &f.to_be_bytes()),
        Element::Decimal {
            coefficient,
            exponent,
        } => {
            let mut body = Vec::new();
            if *coefficient != 0 || *exponent != 0 {
                write_var_int(&mut body, *exponent);
                body.extend_from_slice(&int_bytes(*coefficient));
            }
            write_typed(out, TypeCode::Decimal, &body);
        }
        Element::Timestamp(ts) => write_typed(out, TypeCode::Timestamp, &timestamp_body(ts)),
        Element::String(s) => write_typed(out, TypeCode::String, s.as_bytes()),
        Element::Symbol(s) => write_typed(out, TypeCode::Symbol, &uint_bytes(sid_of(symbols, s))),
        Element::Clob(b) => write_typed(out, TypeCode::Clob, b),
        Element::Blob(b) => write_typed(out, TypeCode::Blob, b),
        Element::List(items) | Element::Sexp(items) => {
            let mut body = Vec::new();
            for item in items {
                encode(item, symbols, &mut body);
            }
            let code = if matches!(value, Element::List(_)) {
                TypeCode::List
            } else {
                TypeCode::Sexp
            };
            write_typed(out, code, &body);
        }
        Element::Struct(fields) => {
            let mut body = Vec::new();
            for (name, v) in fields {
                write_var_uint(&mut body, sid_of(symbols, name));
                encode(v, symbols, &mut body);
            }
            write_typed(out, TypeCode::Struct, &body);
        }
        Element::Annotated(annots, inner) => {
            let sids: Vec<u64> = annots.iter().map(|a| sid_of(symbols, a)).collect();
            let mut inner_bytes = Vec::new();
            encode(inner, symbols, &mut inner_bytes);
            write_annotation(out, &sids, &inner_bytes);
        }
        Element::Pad(n) => write_typed(out, TypeCode::Null, &vec![0u8; *n]),
        Element::Raw(bytes) => out.extend_from_slice(bytes),
    }
}

fn write_annotation(out: &mut Vec<u8>, sids: &[u64], inner: &[u8]) {
    let mut annots = Vec::new();
    for sid in sids {
        write_var_uint(&mut annots, *sid);
    }
    let mut body = Vec::new();
    write_var_uint(&mut body, annots.len() as u64);
    body.extend_from_slice(&annots);
    body.extend_from_slice(inner);
    write_typed(out, TypeCode::Annotation, &body);
}

fn timestamp_body(ts: &TimestampSpec) -> Vec<u8> {
    let mut body = Vec::new();
    match ts.offset_minutes {
        Some(m) => write_var_int(&mut body, m),
        None => body.push(0xC0),
    }
    write_var_uint(&mut body, u64::from(ts.year));
    let Some(month) = ts.month else { return body };
    write_var_uint(&mut body, u64::from(month));
    let Some(day) = ts.day else { return body };
    write_var_uint(&mut body, u64::from(day));
    let Some((hour, minute)) = ts.hour_minute else { return body };
    write_var_uint(&mut body, u64::from(hour));
    write_var_uint(&mut body, u64::from(minute));
    let Some(second) = ts.second else { return body };
    write_var_uint(&mut body, u64::from(second));
    if let Some(millis) = ts.millis {
        write_var_int(&mut body, -3);
        body.extend_from_slice(&int_bytes(i64::from(millis)));
    }
    body
}

/// 类型描述符 + 长度 + 主体
pub fn write_typed(out: &mut Vec<u8>, code: TypeCode, body: &[u8]) {
    let t = code.nibble() << 4;
    // 长度 1 的结构体描述符 0xD1 有特殊含义，改用 VarUInt 长度
    let force_var = code == TypeCode::Struct && body.len() == 1;
    if body.len() < 14 && !force_var {
        out.push(t | body.len() as u8);
    } else {
        out.push(t | 0x0E);
        write_var_uint(out, body.len() as u64);
    }
    out.extend_from_slice(body);
}

pub fn write_var_uint(out: &mut Vec<u8>, mut value: u64) {
    let mut groups = vec![(value & 0x7f) as u8];
    value >>= 7;
    while value > 0 {
        groups.push((value & 0x7f) as u8);
        value >>= 7;
    }
    groups.reverse();
    if let Some(last) = groups.last_mut() {
        *last |= 0x80;
    }
    out.extend_from_slice(&groups);
}

pub fn write_var_int(out: &mut Vec<u8>, value: i64) {
    let mut magnitude = value.unsigned_abs();
    let mut groups = vec![(magnitude & 0x7f) as u8];
    magnitude >>= 7;
    while magnitude > 0 {
        groups.push((magnitude & 0x7f) as u8);
        magnitude >>= 7;
    }
    groups.reverse();
    if groups[0] & 0x40 != 0 {
        groups.insert(0, 0);
    }
    if value < 0 {
        groups[0] |= 0x40;
    }
    if let Some(last) = groups.last_mut() {
        *last |= 0x80;
    }
    out.extend_from_slice(&groups);
}

fn uint_bytes(value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    bytes[first..].to_vec()
}

fn int_bytes(value: i64) -> Vec<u8> {
    if value == 0 {
        return Vec::new();
    }
    let mut bytes = uint_bytes(value.unsigned_abs());
    if bytes[0] & 0x80 != 0 {
        bytes.insert(0, 0);
    }
    if value < 0 {
        bytes[0] |= 0x80;
    }
    bytes
}
