//! Ion 二进制读取器
//!
//! 两层结构：
//! - **成帧**（[`read_header`]）：类型描述符 + 长度，越界即错误。顶层成帧失败
//!   意味着无法定位下一个值，因此对整次解码是致命的。
//! - **取值**（[`read_value`]）：在已定界的主体上解码。任何错误只影响当前节点：
//!   记录 warn 并返回 `None`，由调用方省略该字段/元素，兄弟节点不受影响。

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, trace, warn};

use super::constants::{
    ION_BVM, LEN_NULL, LEN_VAR, SID_IMPORTS, SID_ION_SYMBOL_TABLE, SID_MAX_ID, SID_SYMBOLS,
    TypeCode,
};
use super::cursor::{Cursor, Magnitude};
use super::error::IonError;
use super::symbols::SymbolTable;
use super::timestamp::decode_timestamp;
use crate::log::{DecodedValue, Fields};

/// 容器最大嵌套层数
pub const MAX_DEPTH: usize = 256;

/// 一个已成帧的值。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub type_code: TypeCode,
    pub len_nibble: u8,
    /// 类型描述符所在的绝对偏移
    pub offset: usize,
    pub body_len: usize,
    /// 带类型的 null（`null.int` 等）
    pub is_null: bool,
    /// NOP padding，不是值
    pub is_pad: bool,
}

/// 读取一个值的头部并切出其主体。
pub fn read_header<'a>(cursor: &mut Cursor<'a>) -> Result<(Header, Cursor<'a>), IonError> {
    let offset = cursor.offset();
    let descriptor = cursor.read_byte()?;
    let type_code = TypeCode::from_nibble(descriptor >> 4);
    let len_nibble = descriptor & 0x0f;

    let mut is_null = false;
    let mut is_pad = false;
    let declared: u64 = match type_code {
        TypeCode::Null if len_nibble == LEN_NULL => {
            is_null = true;
            0
        }
        TypeCode::Null => {
            is_pad = true;
            if len_nibble == LEN_VAR {
                cursor.read_var_uint()?
            } else {
                u64::from(len_nibble)
            }
        }
        TypeCode::Bool => {
            is_null = len_nibble == LEN_NULL;
            0
        }
        TypeCode::Struct if len_nibble == 1 => cursor.read_var_uint()?,
        TypeCode::Annotation | TypeCode::Reserved if len_nibble == LEN_NULL => 0,
        TypeCode::Annotation | TypeCode::Reserved => {
            if len_nibble == LEN_VAR {
                cursor.read_var_uint()?
            } else {
                u64::from(len_nibble)
            }
        }
        _ if len_nibble == LEN_NULL => {
            is_null = true;
            0
        }
        _ if len_nibble == LEN_VAR => cursor.read_var_uint()?,
        _ => u64::from(len_nibble),
    };

    let body_len = usize::try_from(declared).map_err(|_| IonError::LengthOverflow {
        offset,
        len: usize::MAX,
    })?;
    let body = cursor.take(body_len)?;
    let header = Header {
        type_code,
        len_nibble,
        offset,
        body_len,
        is_null,
        is_pad,
    };
    trace!(?header, "成帧");
    Ok((header, body))
}

/// 容错读取：失败时记录 warn 并返回 `None`。
pub fn read_value(
    header: &Header,
    body: Cursor<'_>,
    symbols: &SymbolTable,
    depth: usize,
) -> Option<DecodedValue> {
    match read_body(header, body, symbols, depth) {
        Ok(value) => value,
        Err(err) => {
            warn!(
                offset = header.offset,
                type_code = ?header.type_code,
                error = %err,
                "无法读取的 Ion 节点，已省略"
            );
            None
        }
    }
}

/// 解码值主体。`Ok(None)` 表示类型未处理（已记录 warn）。
pub fn read_body(
    header: &Header,
    mut body: Cursor<'_>,
    symbols: &SymbolTable,
    depth: usize,
) -> Result<Option<DecodedValue>, IonError> {
    if header.is_null {
        return Ok(Some(DecodedValue::Null));
    }
    if depth > MAX_DEPTH {
        return Err(IonError::NestingTooDeep(MAX_DEPTH));
    }

    let value = match header.type_code {
        TypeCode::Null => return Ok(None),
        TypeCode::Bool => match header.len_nibble {
            0 => DecodedValue::Bool(false),
            1 => DecodedValue::Bool(true),
            n => return Err(IonError::InvalidBoolLength(n)),
        },
        TypeCode::PosInt => {
            let magnitude = body.read_uint(header.body_len)?;
            int_value(magnitude, false)
        }
        TypeCode::NegInt => {
            let magnitude = body.read_uint(header.body_len)?;
            if magnitude.is_zero() {
                return Err(IonError::NegativeZeroInt);
            }
            int_value(magnitude, true)
        }
        TypeCode::Float => DecodedValue::Float(read_float(&mut body)?),
        TypeCode::Decimal => DecodedValue::Decimal(read_decimal(&mut body)?),
        TypeCode::Timestamp => {
            let text = decode_timestamp(&mut body)?;
            ensure_consumed(&body)?;
            DecodedValue::Timestamp(text)
        }
        TypeCode::Symbol => {
            let sid = match body.read_uint(header.body_len)? {
                Magnitude::Exact(sid) => sid,
                Magnitude::Approx(_) => return Err(IonError::UnknownSymbol(u64::MAX)),
            };
            DecodedValue::Symbol(symbols.resolve(sid)?)
        }
        TypeCode::String => {
            let text = std::str::from_utf8(body.rest()).map_err(|_| IonError::InvalidUtf8)?;
            DecodedValue::String(text.to_string())
        }
        TypeCode::Clob => DecodedValue::String(String::from_utf8_lossy(body.rest()).into_owned()),
        TypeCode::Blob => DecodedValue::Blob(STANDARD.encode(body.rest())),
        TypeCode::List | TypeCode::Sexp => {
            DecodedValue::List(read_sequence(body, symbols, depth + 1)?)
        }
        TypeCode::Struct => DecodedValue::Struct(read_struct(body, symbols, depth + 1)?),
        TypeCode::Annotation => {
            let wrapped = parse_annotation(header, body)?;
            return read_body(&wrapped.header, wrapped.body, symbols, depth);
        }
        TypeCode::Reserved => {
            warn!(offset = header.offset, descriptor = header.len_nibble | 0xF0, "未处理的 Ion 类型");
            return Ok(None);
        }
    };
    Ok(Some(value))
}

fn int_value(magnitude: Magnitude, negative: bool) -> DecodedValue {
    const I64_MIN_MAGNITUDE: u64 = 1 << 63;
    match magnitude {
        Magnitude::Exact(v) if !negative && v <= i64::MAX as u64 => DecodedValue::Int(v as i64),
        Magnitude::Exact(v) if negative && v < I64_MIN_MAGNITUDE => DecodedValue::Int(-(v as i64)),
        Magnitude::Exact(v) if negative && v == I64_MIN_MAGNITUDE => DecodedValue::Int(i64::MIN),
        m if negative => DecodedValue::Float(-m.as_f64()),
        m => DecodedValue::Float(m.as_f64()),
    }
}

fn read_float(body: &mut Cursor<'_>) -> Result<f64, IonError> {
    match body.remaining() {
        0 => Ok(0.0),
        4 => {
            let bytes = body.read_bytes(4)?;
            Ok(f64::from(f32::from_be_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3],
            ])))
        }
        8 => {
            let bytes = body.read_bytes(8)?;
            let mut buf = [0u8; 8];
            buf.copy_from_slice(bytes);
            Ok(f64::from_be_bytes(buf))
        }
        n => Err(IonError::InvalidFloatLength(n)),
    }
}

/// 十进制：VarInt 指数 + Int 系数，值为 `coefficient × 10^exponent`。
fn read_decimal(body: &mut Cursor<'_>) -> Result<f64, IonError> {
    if body.is_empty() {
        return Ok(0.0);
    }
    let exponent = body.read_var_int()?.value();
    let rest = body.remaining();
    let (coefficient, negative) = body.read_int(rest)?;
    let magnitude = match coefficient {
        // 经文本解析，避免 3 × 0.1 之类的二次舍入
        Magnitude::Exact(c) => format!("{c}e{exponent}").parse::<f64>().unwrap_or(f64::NAN),
        Magnitude::Approx(c) => {
            let exp = exponent.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;
            c * 10f64.powi(exp)
        }
    };
    Ok(if negative { -magnitude } else { magnitude })
}

fn read_sequence(
    mut body: Cursor<'_>,
    symbols: &SymbolTable,
    depth: usize,
) -> Result<Vec<DecodedValue>, IonError> {
    let mut items = Vec::new();
    while !body.is_empty() {
        let (header, child) = read_header(&mut body)?;
        if header.is_pad {
            continue;
        }
        if let Some(value) = read_value(&header, child, symbols, depth) {
            items.push(value);
        }
    }
    Ok(items)
}

fn read_struct(
    mut body: Cursor<'_>,
    symbols: &SymbolTable,
    depth: usize,
) -> Result<Fields, IonError> {
    let mut fields = Fields::new();
    while !body.is_empty() {
        let sid = body.read_var_uint()?;
        let (header, child) = read_header(&mut body)?;
        if header.is_pad {
            continue;
        }
        let name = match symbols.resolve(sid) {
            Ok(name) => name,
            Err(err) => {
                warn!(offset = header.offset, error = %err, "字段名无法解析，已省略字段");
                continue;
            }
        };
        if let Some(value) = read_value(&header, child, symbols, depth) {
            fields.insert(name, value);
        }
    }
    Ok(fields)
}

/// 注解包装拆包后的内层值
struct Annotated<'a> {
    pub annotations: Vec<u64>,
    pub header: Header,
    pub body: Cursor<'a>,
}

fn parse_annotation<'a>(header: &Header, mut body: Cursor<'a>) -> Result<Annotated<'a>, IonError> {
    if header.len_nibble < 3 || header.len_nibble == LEN_NULL {
        return Err(IonError::InvalidAnnotation("wrapper shorter than 3 bytes"));
    }
    let annot_len = usize::try_from(body.read_var_uint()?)
        .map_err(|_| IonError::InvalidAnnotation("annotation length overflow"))?;
    let mut annot = body.take(annot_len)?;
    let mut annotations = Vec::new();
    while !annot.is_empty() {
        annotations.push(annot.read_var_uint()?);
    }
    if annotations.is_empty() {
        return Err(IonError::InvalidAnnotation("no annotations"));
    }
    let (inner, inner_body) = read_header(&mut body)?;
    if inner.is_pad || inner.type_code == TypeCode::Annotation {
        return Err(IonError::InvalidAnnotation("wrapped value must be a plain value"));
    }
    ensure_consumed(&body)?;
    Ok(Annotated {
        annotations,
        header: inner,
        body: inner_body,
    })
}

fn ensure_consumed(body: &Cursor<'_>) -> Result<(), IonError> {
    match body.remaining() {
        0 => Ok(()),
        n => Err(IonError::TrailingBytes(n)),
    }
}

/// 顶层条目。
#[derive(Debug, Clone, PartialEq)]
pub enum TopLevelItem {
    Value(DecodedValue),
    /// 无法读取或类型未处理的值，已跳过
    Skipped { offset: usize },
}

/// 顶层值流。系统值（版本标记、本地符号表、padding）在内部消化，不会产出。
pub struct Reader<'a> {
    cursor: Cursor<'a>,
    symbols: SymbolTable,
}

impl<'a> Reader<'a> {
    /// 缓冲区必须以 Ion 1.0 版本标记开头。
    pub fn new(data: &'a [u8]) -> Result<Self, IonError> {
        let cursor = Cursor::new(data);
        if cursor.peek_byte() != Some(ION_BVM[0]) {
            return Err(IonError::MissingVersionMarker);
        }
        Ok(Self {
            cursor,
            symbols: SymbolTable::new(),
        })
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// 读取下一个顶层值；缓冲区耗尽时返回 `Ok(None)`。
    pub fn next_item(&mut self) -> Result<Option<TopLevelItem>, IonError> {
        loop {
            if self.cursor.is_empty() {
                return Ok(None);
            }
            if self.cursor.peek_byte() == Some(ION_BVM[0]) {
                self.read_version_marker()?;
                continue;
            }

            let (header, body) = read_header(&mut self.cursor)?;
            if header.is_pad {
                continue;
            }
            if header.type_code == TypeCode::Annotation
                && !header.is_null
                && self.try_local_symbol_table(&header, body.clone())
            {
                continue;
            }

            let offset = header.offset;
            return Ok(Some(match read_value(&header, body, &self.symbols, 0) {
                Some(value) => TopLevelItem::Value(value),
                None => TopLevelItem::Skipped { offset },
            }));
        }
    }

    fn read_version_marker(&mut self) -> Result<(), IonError> {
        let marker = self.cursor.read_bytes(4)?;
        if marker[3] != ION_BVM[3] {
            return Err(IonError::MissingVersionMarker);
        }
        if marker[1] != ION_BVM[1] || marker[2] != ION_BVM[2] {
            return Err(IonError::UnsupportedVersion {
                major: marker[1],
                minor: marker[2],
            });
        }
        debug!(offset = self.cursor.offset() - 4, "版本标记，重置符号表");
        self.symbols.reset();
        Ok(())
    }

    /// `$ion_symbol_table::{...}` 则更新符号表并返回 true。
    fn try_local_symbol_table(&mut self, header: &Header, body: Cursor<'_>) -> bool {
        let Ok(wrapped) = parse_annotation(header, body) else {
            return false;
        };
        if wrapped.annotations.first() != Some(&u64::from(SID_ION_SYMBOL_TABLE))
            || wrapped.header.type_code != TypeCode::Struct
            || wrapped.header.is_null
        {
            return false;
        }
        match parse_symbol_table(wrapped.body) {
            Ok(lst) => {
                if !lst.append {
                    self.symbols.reset();
                    self.symbols.reserve_imports(lst.imported_slots);
                }
                for text in lst.symbols {
                    self.symbols.push(text);
                }
                debug!(
                    offset = header.offset,
                    append = lst.append,
                    max_id = self.symbols.max_id(),
                    "本地符号表"
                );
            }
            Err(err) => {
                warn!(offset = header.offset, error = %err, "本地符号表格式错误，已忽略");
            }
        }
        true
    }
}

struct LocalSymbolTable {
    append: bool,
    imported_slots: u64,
    symbols: Vec<Option<String>>,
}

fn parse_symbol_table(mut body: Cursor<'_>) -> Result<LocalSymbolTable, IonError> {
    let mut lst = LocalSymbolTable {
        append: false,
        imported_slots: 0,
        symbols: Vec::new(),
    };
    while !body.is_empty() {
        let sid = body.read_var_uint()?;
        let (header, mut child) = read_header(&mut body)?;
        if header.is_pad || header.is_null {
            continue;
        }
        match (sid, header.type_code) {
            (s, TypeCode::Symbol) if s == u64::from(SID_IMPORTS) => {
                let target = child.read_uint(header.body_len)?;
                lst.append = target == Magnitude::Exact(u64::from(SID_ION_SYMBOL_TABLE));
                lst.imported_slots = 0;
            }
            (s, TypeCode::List) if s == u64::from(SID_IMPORTS) => {
                lst.append = false;
                while !child.is_empty() {
                    let (import, import_body) = read_header(&mut child)?;
                    if import.type_code == TypeCode::Struct && !import.is_null {
                        lst.imported_slots =
                            lst.imported_slots.saturating_add(import_max_id(import_body)?);
                    }
                }
            }
            (s, TypeCode::List) if s == u64::from(SID_SYMBOLS) => {
                while !child.is_empty() {
                    let (item, mut item_body) = read_header(&mut child)?;
                    if item.is_pad {
                        continue;
                    }
                    let text = if item.type_code == TypeCode::String && !item.is_null {
                        std::str::from_utf8(item_body.rest()).ok().map(str::to_string)
                    } else {
                        None
                    };
                    lst.symbols.push(text);
                }
            }
            _ => {}
        }
    }
    Ok(lst)
}

fn import_max_id(mut body: Cursor<'_>) -> Result<u64, IonError> {
    while !body.is_empty() {
        let sid = body.read_var_uint()?;
        let (header, mut child) = read_header(&mut body)?;
        if sid == u64::from(SID_MAX_ID) && header.type_code == TypeCode::PosInt && !header.is_null {
            return Ok(match child.read_uint(header.body_len)? {
                Magnitude::Exact(max_id) => max_id,
                Magnitude::Approx(_) => u64::MAX,
            });
        }
    }
    warn!("共享符号表导入缺少 max_id，按 0 处理");
    Ok(0)
}
