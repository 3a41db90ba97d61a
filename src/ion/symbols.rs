//! Ion 符号表
//!
//! 系统符号占用 1..=9，其后是共享导入的槽位（只计数，文本未知），再往后是本地符号。

use super::constants::{FIRST_LOCAL_SID, SYSTEM_SYMBOLS};
use super::error::IonError;

/// 当前生效的符号表（系统层 + 本地层）。
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    /// 共享导入占用的槽位数，来自输入，不做实体化
    imported: u64,
    /// 本地槽位，下标 i 对应 SID `10 + imported + i`；`None` 表示文本未知
    local: Vec<Option<String>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 回到仅含系统符号的状态（遇到 BVM 或非追加式本地符号表）。
    pub fn reset(&mut self) {
        self.imported = 0;
        self.local.clear();
    }

    /// 当前最大 SID（饱和于 `u64::MAX`）
    pub fn max_id(&self) -> u64 {
        (u64::from(FIRST_LOCAL_SID) - 1)
            .saturating_add(self.imported)
            .saturating_add(self.local.len() as u64)
    }

    pub fn push(&mut self, text: Option<String>) -> u64 {
        self.local.push(text);
        self.max_id()
    }

    /// 为共享表导入预留 `count` 个未知文本的槽位，位于所有本地符号之前。
    /// 只应在 `reset` 之后、`push` 之前调用。
    pub fn reserve_imports(&mut self, count: u64) {
        self.imported = self.imported.saturating_add(count);
    }

    /// 解析 SID 对应的文本；文本未知的已定义槽位返回 `$<sid>`。
    pub fn resolve(&self, sid: u64) -> Result<String, IonError> {
        if sid == 0 {
            return Ok("$0".to_string());
        }
        if sid < u64::from(FIRST_LOCAL_SID) {
            return Ok(SYSTEM_SYMBOLS[sid as usize].to_string());
        }
        let slot = sid - u64::from(FIRST_LOCAL_SID);
        if slot < self.imported {
            return Ok(format!("${sid}"));
        }
        let local = usize::try_from(slot - self.imported).ok();
        match local.and_then(|idx| self.local.get(idx)) {
            Some(Some(text)) => Ok(text.clone()),
            Some(None) => Ok(format!("${sid}")),
            None => Err(IonError::UnknownSymbol(sid)),
        }
    }

    /// 查找文本对应的 SID（仅用于编码端）。
    pub fn lookup(&self, text: &str) -> Option<u64> {
        if let Some(i) = SYSTEM_SYMBOLS.iter().skip(1).position(|s| *s == text) {
            return Some(i as u64 + 1);
        }
        self.local
            .iter()
            .position(|s| s.as_deref() == Some(text))
            .map(|i| u64::from(FIRST_LOCAL_SID) + self.imported + i as u64)
    }

    pub fn local_symbols(&self) -> impl Iterator<Item = Option<&str>> {
        self.local.iter().map(|s| s.as_deref())
    }
}
