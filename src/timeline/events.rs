use serde::Serialize;
use tracing::debug;

use crate::log::DecodedValue;
use crate::payload::{ImageFormat, ImageFrame, Pose, Transform};

use super::clock::ClockSnapshot;
use super::session::{FrameEntry, LoadedLog, PlaybackSession};
use super::time::TimeSource;

/// 回放事件类型
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlaybackEventKind {
    /// 日志元信息（作为第一条事件）
    Meta {
        #[serde(skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        robot_id: Option<String>,
        start_ms: Option<i64>,
        end_ms: Option<i64>,
        topics: Vec<TopicInfo>,
        #[serde(skip_serializing_if = "Option::is_none")]
        static_transform: Option<Transform>,
    },
    /// 一次 tick 时各 topic 的当前消息，以及同一时刻的位姿与图像
    Frame {
        frames: Vec<FrameMessage>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pose: Option<Pose>,
        #[serde(skip_serializing_if = "Option::is_none")]
        image: Option<ImageInfo>,
    },
    /// 时钟状态变化（播放 / 暂停 / 倍速 / 跳转）
    Clock(ClockSnapshot),
    /// 到达末尾后回到开头
    Loop,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicInfo {
    pub name: String,
    pub topic_type: String,
    pub messages: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declared_frequency: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameMessage {
    pub topic: String,
    pub index: usize,
    pub timestamp: Option<i64>,
    /// 仅在需要载荷时填写
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<DecodedValue>,
}

impl FrameMessage {
    pub fn from_entry(entry: &FrameEntry<'_>, with_data: bool) -> Self {
        Self {
            topic: entry.topic.topic_name.clone(),
            index: entry.index,
            timestamp: entry.message.timestamp,
            data: with_data.then(|| entry.message.data.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageInfo {
    pub topic: String,
    pub format: ImageFormat,
    pub bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_uri: Option<String>,
}

impl ImageInfo {
    pub fn new(topic: &str, frame: &ImageFrame, with_data: bool) -> Self {
        Self {
            topic: topic.to_string(),
            format: frame.format,
            bytes: frame.bytes.len(),
            data_uri: with_data.then(|| frame.to_data_uri()),
        }
    }
}

/// 当前虚拟时间下跨 topic 解析出的载荷；解析失败的载荷视为缺失。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FramePayloads {
    pub pose: Option<Pose>,
    pub image: Option<ImageInfo>,
}

impl FramePayloads {
    pub fn capture<S: TimeSource>(session: &PlaybackSession<S>, with_data: bool) -> Self {
        let pose = session.current_pose().unwrap_or_else(|err| {
            debug!(error = %err, "里程计消息无法解析");
            None
        });
        let image = session.current_image().unwrap_or_else(|err| {
            debug!(error = %err, "图像消息无法解析");
            None
        });
        let image_topic = session.log().and_then(|l| l.image_topic.as_deref());
        Self {
            pose,
            image: image
                .zip(image_topic)
                .map(|(frame, topic)| ImageInfo::new(topic, &frame, with_data)),
        }
    }
}

/// 一个可回放的事件（JSON）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackEvent {
    /// 虚拟时间（毫秒，相对日志起点）
    pub t_ms: i64,
    #[serde(flatten)]
    pub kind: PlaybackEventKind,
}

impl PlaybackEvent {
    pub fn meta(log: &LoadedLog, static_transform: Option<Transform>) -> Self {
        let topics = log
            .topics
            .iter()
            .map(|t| TopicInfo {
                name: t.topic_name.clone(),
                topic_type: t.topic_type.clone(),
                messages: t.messages.len(),
                declared_frequency: t.declared_frequency,
            })
            .collect();
        Self {
            t_ms: 0,
            kind: PlaybackEventKind::Meta {
                session_id: log
                    .parsed
                    .session
                    .as_ref()
                    .and_then(|s| s.id())
                    .map(str::to_string),
                robot_id: log
                    .parsed
                    .robot
                    .as_ref()
                    .and_then(|r| r.id())
                    .map(str::to_string),
                start_ms: log.time_range.map(|r| r.start),
                end_ms: log.time_range.map(|r| r.end),
                topics,
                static_transform,
            },
        }
    }

    pub fn frame(
        snapshot: &ClockSnapshot,
        entries: &[FrameEntry<'_>],
        payloads: FramePayloads,
        with_data: bool,
    ) -> Self {
        Self {
            t_ms: snapshot.virtual_time,
            kind: PlaybackEventKind::Frame {
                frames: entries
                    .iter()
                    .map(|e| FrameMessage::from_entry(e, with_data))
                    .collect(),
                pose: payloads.pose,
                image: payloads.image,
            },
        }
    }

    pub fn clock(snapshot: &ClockSnapshot) -> Self {
        Self {
            t_ms: snapshot.virtual_time,
            kind: PlaybackEventKind::Clock(snapshot.clone()),
        }
    }
}

/// 事件收集器（存内存，回放结束写 JSON 文件）
#[derive(Debug, Default)]
pub struct EventRecorder {
    pub events: Vec<PlaybackEvent>,
}

impl EventRecorder {
    pub fn push(&mut self, ev: PlaybackEvent) {
        self.events.push(ev);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
