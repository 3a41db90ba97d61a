//! Topic 提取与时间范围
//!
//! 扫描 `raw` 中带 `topics` 列表的记录并展开为 [`Topic`]。同名 topic 以首次出现
//! 为准；若后出现的同名 topic 消息不同，会丢失数据，因此记录 warn。

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::log::DecodedValue;

/// 一条带时间戳的消息。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicMessage {
    /// 纪元毫秒；缺失时不参与时间范围和最近消息计算
    pub timestamp: Option<i64>,
    pub data: DecodedValue,
}

impl TopicMessage {
    pub fn new(timestamp: i64, data: DecodedValue) -> Self {
        Self {
            timestamp: Some(timestamp),
            data,
        }
    }

    /// 结构体消息取 `timestamp` 与 `data` 字段；没有 `data` 时整条消息作为载荷。
    pub fn from_value(value: &DecodedValue) -> Self {
        let timestamp = value.get("timestamp").and_then(DecodedValue::as_i64);
        let data = value.get("data").cloned().unwrap_or_else(|| value.clone());
        Self { timestamp, data }
    }
}

/// 一个命名、带类型的消息通道。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub topic_name: String,
    pub topic_type: String,
    pub messages: Vec<TopicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declared_frequency: Option<f64>,
}

impl Topic {
    fn from_value(value: &DecodedValue) -> Option<Self> {
        let name = value
            .get("topicName")
            .filter(|v| v.is_truthy())
            .and_then(DecodedValue::as_str)?;
        let topic_type = value
            .get("topicType")
            .filter(|v| v.is_truthy())
            .and_then(DecodedValue::as_str)?;
        let messages = value
            .get("messages")
            .and_then(DecodedValue::as_list)
            .map(|items| items.iter().map(TopicMessage::from_value).collect())
            .unwrap_or_default();
        Some(Self {
            topic_name: name.to_string(),
            topic_type: topic_type.to_string(),
            messages,
            declared_frequency: value.get("frequency").and_then(DecodedValue::as_f64),
        })
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// 消息时间戳的最小 / 最大值
    pub fn time_range(&self) -> Option<TimeRange> {
        TimeRange::from_timestamps(self.messages.iter().filter_map(|m| m.timestamp))
    }
}

/// 日志时间范围（纪元毫秒，闭区间）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub start: i64,
    pub end: i64,
}

impl TimeRange {
    /// 取最小 / 最大值，与出现顺序无关。
    pub fn from_timestamps(timestamps: impl IntoIterator<Item = i64>) -> Option<Self> {
        timestamps.into_iter().fold(None, |acc, ts| match acc {
            None => Some(TimeRange { start: ts, end: ts }),
            Some(r) => Some(TimeRange {
                start: r.start.min(ts),
                end: r.end.max(ts),
            }),
        })
    }

    /// 相距过远时饱和为 `i64::MAX`
    pub fn duration(&self) -> i64 {
        self.end.saturating_sub(self.start)
    }
}

/// 从顶层值中提取 topic，同名以首次出现为准。
pub fn extract_topics(raw: &[DecodedValue]) -> Vec<Topic> {
    let mut topics: Vec<Topic> = Vec::new();
    let mut by_name: HashMap<String, usize> = HashMap::new();

    for item in raw {
        let Some(list) = item.get("topics").and_then(DecodedValue::as_list) else {
            continue;
        };
        for value in list {
            let Some(topic) = Topic::from_value(value) else {
                debug!("跳过缺少 topicName/topicType 的 topic");
                continue;
            };
            if let Some(&idx) = by_name.get(&topic.topic_name) {
                let kept = &topics[idx];
                if kept.messages != topic.messages {
                    warn!(
                        topic = %topic.topic_name,
                        kept_messages = kept.messages.len(),
                        dropped_messages = topic.messages.len(),
                        "重复的 topic 名称，消息不同，保留首次出现"
                    );
                }
                continue;
            }
            by_name.insert(topic.topic_name.clone(), topics.len());
            topics.push(topic);
        }
    }
    topics
}

/// 所有 topic 全部消息的时间范围；没有带时间戳的消息时为 `None`。
pub fn time_range(topics: &[Topic]) -> Option<TimeRange> {
    TimeRange::from_timestamps(
        topics
            .iter()
            .flat_map(|t| t.messages.iter())
            .filter_map(|m| m.timestamp),
    )
}

pub fn topic_names(topics: &[Topic]) -> Vec<&str> {
    topics.iter().map(|t| t.topic_name.as_str()).collect()
}

pub fn find_topic<'a>(topics: &'a [Topic], name: &str) -> Option<&'a Topic> {
    topics.iter().find(|t| t.topic_name == name)
}

/// 第一个名称包含 `pattern`（不区分大小写）的 topic，用作相机画面来源。
pub fn detect_image_topic<'a>(topics: &'a [Topic], pattern: &str) -> Option<&'a str> {
    let pattern = pattern.to_lowercase();
    topics
        .iter()
        .map(|t| t.topic_name.as_str())
        .find(|name| name.to_lowercase().contains(&pattern))
}
