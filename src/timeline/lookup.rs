//! 最近消息查找
//!
//! 按 |timestamp - target| 最小取消息下标；距离相同取下标较小者。没有带时间戳
//! 的消息时返回 0。

use super::topic::TopicMessage;

/// 线性扫描
pub fn nearest_message_index(messages: &[TopicMessage], target: i64) -> usize {
    let mut best = 0;
    let mut best_diff = u64::MAX;
    for (idx, msg) in messages.iter().enumerate() {
        let Some(ts) = msg.timestamp else { continue };
        let diff = ts.abs_diff(target);
        if diff < best_diff {
            best = idx;
            best_diff = diff;
        }
    }
    best
}

/// 按时间戳排序的索引，O(log n) 查找，结果与 [`nearest_message_index`] 一致。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicIndex {
    /// (timestamp, 下标)；同一时间戳只保留最小下标
    entries: Vec<(i64, usize)>,
}

impl TopicIndex {
    pub fn build(messages: &[TopicMessage]) -> Self {
        let mut entries: Vec<(i64, usize)> = messages
            .iter()
            .enumerate()
            .filter_map(|(idx, m)| m.timestamp.map(|ts| (ts, idx)))
            .collect();
        entries.sort_unstable();
        entries.dedup_by_key(|e| e.0);
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn nearest(&self, target: i64) -> usize {
        let split = self.entries.partition_point(|(ts, _)| *ts < target);
        let below = split.checked_sub(1).map(|i| self.entries[i]);
        let above = self.entries.get(split).copied();
        match (below, above) {
            (None, None) => 0,
            (Some((_, idx)), None) | (None, Some((_, idx))) => idx,
            (Some((lo_ts, lo_idx)), Some((hi_ts, hi_idx))) => {
                let lo_diff = lo_ts.abs_diff(target);
                let hi_diff = hi_ts.abs_diff(target);
                if lo_diff < hi_diff || (lo_diff == hi_diff && lo_idx < hi_idx) {
                    lo_idx
                } else {
                    hi_idx
                }
            }
        }
    }
}
