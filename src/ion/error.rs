//! Ion 解码错误

/// 读取 Ion 二进制数据时的错误。
///
/// 成帧错误（长度越界、截断）在顶层是致命的；值内容错误只影响单个节点。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IonError {
    #[error("unexpected end of input at offset {offset}")]
    UnexpectedEof { offset: usize },
    #[error("missing Ion binary version marker")]
    MissingVersionMarker,
    #[error("unsupported Ion version {major}.{minor}")]
    UnsupportedVersion { major: u8, minor: u8 },
    #[error("declared length {len} at offset {offset} exceeds enclosing scope")]
    LengthOverflow { offset: usize, len: usize },
    #[error("VarUInt at offset {offset} does not fit in 64 bits")]
    VarIntOverflow { offset: usize },
    #[error("invalid bool length nibble: {0}")]
    InvalidBoolLength(u8),
    #[error("unsupported float length: {0}")]
    InvalidFloatLength(usize),
    #[error("negative zero integer is illegal")]
    NegativeZeroInt,
    #[error("invalid UTF-8 text")]
    InvalidUtf8,
    #[error("unknown symbol ID: {0}")]
    UnknownSymbol(u64),
    #[error("malformed annotation wrapper: {0}")]
    InvalidAnnotation(&'static str),
    #[error("reserved type descriptor 0x{0:02x}")]
    ReservedType(u8),
    #[error("malformed timestamp: {0}")]
    InvalidTimestamp(&'static str),
    #[error("{0} trailing bytes inside value")]
    TrailingBytes(usize),
    #[error("containers nested deeper than {0} levels")]
    NestingTooDeep(usize),
}
