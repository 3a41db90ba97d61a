//! Ion 1.0 二进制格式
//!
//! 读取端把字节流还原为 [`DecodedValue`](crate::log::DecodedValue) 树；
//! 写入端用于构造夹具与示例日志。

mod constants;
mod cursor;
mod encode;
mod error;
mod reader;
mod symbols;
mod timestamp;

pub use constants::{ION_BVM, SYSTEM_SYMBOLS, TypeCode};
pub use cursor::{Cursor, Magnitude, VarInt};
pub use encode::{Element, IonBuilder, TimestampSpec, write_typed, write_var_int, write_var_uint};
pub use error::IonError;
pub use reader::{Header, MAX_DEPTH, Reader, TopLevelItem, read_body, read_header, read_value};
pub use symbols::SymbolTable;
pub use timestamp::decode_timestamp;
