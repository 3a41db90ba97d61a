//! 顶层解码入口
//!
//! 字节 → 顶层值序列 → 结构化（会话 / 机器人）。

use std::thread::JoinHandle;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::error::LogError;
use super::structure::{RobotInfo, SessionInfo, find_robot, find_session};
use super::value::DecodedValue;
use crate::ion::{Reader, TopLevelItem};

/// 一次解码的结果；由调用方持有。
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ParsedLog {
    /// 顶层值，保持原始顺序
    pub raw: Vec<DecodedValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub robot: Option<RobotInfo>,
    /// 因无法读取而丢弃的顶层值个数
    #[serde(skip)]
    pub dropped_items: usize,
}

impl ParsedLog {
    /// 对已有的顶层值做结构化。
    pub fn from_raw(raw: Vec<DecodedValue>) -> Self {
        let session = find_session(&raw);
        let robot = find_robot(&raw);
        Self {
            raw,
            session,
            robot,
            dropped_items: 0,
        }
    }
}

/// 解码整个缓冲区。
///
/// 空输入（或全为零字节）返回 [`LogError::EmptyInput`]；顶层成帧失败返回
/// [`LogError::Decode`]。单个节点的错误只会让该节点被省略。
#[tracing::instrument(skip(bytes), fields(len = bytes.len()))]
pub fn decode(bytes: &[u8]) -> Result<ParsedLog, LogError> {
    if bytes.iter().all(|b| *b == 0) {
        return Err(LogError::EmptyInput);
    }

    let mut reader = Reader::new(bytes).inspect_err(|err| warn!(error = %err, "不是 Ion 二进制流"))?;
    let mut raw = Vec::new();
    let mut dropped = 0usize;
    loop {
        let item = match reader.next_item() {
            Ok(Some(item)) => item,
            Ok(None) => break,
            Err(err) => {
                warn!(error = %err, items = raw.len(), "顶层遍历失败");
                return Err(err.into());
            }
        };
        match item {
            TopLevelItem::Value(value) => raw.push(value),
            TopLevelItem::Skipped { offset } => {
                dropped += 1;
                debug!(offset, "丢弃无法读取的顶层值");
            }
        }
    }

    let mut parsed = ParsedLog::from_raw(raw);
    parsed.dropped_items = dropped;
    info!(
        items = parsed.raw.len(),
        dropped,
        has_session = parsed.session.is_some(),
        has_robot = parsed.robot.is_some(),
        "解码完成"
    );
    Ok(parsed)
}

/// 在后台线程解码；契约与 [`decode`] 相同。
pub fn decode_in_background(bytes: Vec<u8>) -> JoinHandle<Result<ParsedLog, LogError>> {
    std::thread::spawn(move || decode(&bytes))
}

/// 等待后台解码结果。
pub fn join_decode(handle: JoinHandle<Result<ParsedLog, LogError>>) -> Result<ParsedLog, LogError> {
    handle.join().map_err(|_| LogError::WorkerPanicked)?
}
