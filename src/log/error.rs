//! 日志解码错误

use crate::ion::IonError;

/// 致命解码错误；出现时不产生任何 `ParsedLog`。
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("input is empty")]
    EmptyInput,
    #[error("failed to parse Ion data: {0}")]
    Decode(#[from] IonError),
    #[error("decode worker panicked")]
    WorkerPanicked,
}
