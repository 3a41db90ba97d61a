//! 时间轴与回放
//!
//! - [`topic`]：从顶层值中提取 topic 与时间范围
//! - [`lookup`]：按时间戳找最近的消息
//! - [`clock`]：由显式 `now` 驱动的播放时钟
//! - [`session`]：日志 + 时钟 + 观察者的回放会话

pub mod clock;
pub mod events;
pub mod lookup;
pub mod session;
pub mod time;
pub mod topic;

pub use clock::{ClockSnapshot, PlaybackClock};
pub use events::{
    EventRecorder, FrameMessage, FramePayloads, ImageInfo, PlaybackEvent, PlaybackEventKind,
    TopicInfo,
};
pub use lookup::{TopicIndex, nearest_message_index};
pub use session::{
    FrameEntry, LoadOutcome, LoadTicket, LoadedLog, PlaybackCommand, PlaybackObserver,
    PlaybackSession,
};
pub use time::{ManualTimeSource, SystemTimeSource, TimeSource};
pub use topic::{
    TimeRange, Topic, TopicMessage, detect_image_topic, extract_topics, find_topic, time_range,
    topic_names,
};
