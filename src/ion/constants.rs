//! Ion 1.0 二进制编码常量
//!
//! 类型码、版本标记以及系统符号表。

/// Binary Version Marker：`E0 01 00 EA`（Ion 1.0）。
pub const ION_BVM: [u8; 4] = [0xE0, 0x01, 0x00, 0xEA];

/// 类型描述符低 4 位为 14 时，长度以 VarUInt 紧随其后。
pub const LEN_VAR: u8 = 14;
/// 类型描述符低 4 位为 15 时，表示对应类型的 null。
pub const LEN_NULL: u8 = 15;

/// 本地符号从 10 开始编号。
pub const FIRST_LOCAL_SID: u32 = 10;

pub const SID_ION_SYMBOL_TABLE: u32 = 3;
pub const SID_IMPORTS: u32 = 6;
pub const SID_SYMBOLS: u32 = 7;
pub const SID_MAX_ID: u32 = 8;

/// 系统符号，下标即 SID（0 号槽位不使用）。
pub const SYSTEM_SYMBOLS: [&str; 10] = [
    "",
    "$ion",
    "$ion_1_0",
    "$ion_symbol_table",
    "name",
    "version",
    "imports",
    "symbols",
    "max_id",
    "$ion_shared_symbol_table",
];

/// 类型描述符高 4 位。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCode {
    /// null 或 NOP padding
    Null,
    Bool,
    PosInt,
    NegInt,
    Float,
    Decimal,
    Timestamp,
    Symbol,
    String,
    Clob,
    Blob,
    List,
    Sexp,
    Struct,
    /// 注解包装
    Annotation,
    Reserved,
}

impl TypeCode {
    pub fn from_nibble(nibble: u8) -> TypeCode {
        match nibble & 0x0f {
            0x0 => TypeCode::Null,
            0x1 => TypeCode::Bool,
            0x2 => TypeCode::PosInt,
            0x3 => TypeCode::NegInt,
            0x4 => TypeCode::Float,
            0x5 => TypeCode::Decimal,
            0x6 => TypeCode::Timestamp,
            0x7 => TypeCode::Symbol,
            0x8 => TypeCode::String,
            0x9 => TypeCode::Clob,
            0xA => TypeCode::Blob,
            0xB => TypeCode::List,
            0xC => TypeCode::Sexp,
            0xD => TypeCode::Struct,
            0xE => TypeCode::Annotation,
            _ => TypeCode::Reserved,
        }
    }

    pub fn nibble(self) -> u8 {
        match self {
            TypeCode::Null => 0x0,
            TypeCode::Bool => 0x1,
            TypeCode::PosInt => 0x2,
            TypeCode::NegInt => 0x3,
            TypeCode::Float => 0x4,
            TypeCode::Decimal => 0x5,
            TypeCode::Timestamp => 0x6,
            TypeCode::Symbol => 0x7,
            TypeCode::String => 0x8,
            TypeCode::Clob => 0x9,
            TypeCode::Blob => 0xA,
            TypeCode::List => 0xB,
            TypeCode::Sexp => 0xC,
            TypeCode::Struct => 0xD,
            TypeCode::Annotation => 0xE,
            TypeCode::Reserved => 0xF,
        }
    }

    pub fn is_container(self) -> bool {
        matches!(self, TypeCode::List | TypeCode::Sexp | TypeCode::Struct)
    }
}
