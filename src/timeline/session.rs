//! 播放会话
//!
//! 持有已加载的日志、播放时钟、当前选中的 topic 和最近一次加载错误。
//! 观察者在每次 tick 后收到 [`ClockSnapshot`]，可以追加 [`PlaybackCommand`]；
//! 这些命令在所有观察者都处理完之后才执行。

use tracing::{info, warn};

use crate::config::ViewerConfig;
use crate::log::{LogError, ParsedLog, decode};
use crate::payload::{ImageFrame, PayloadError, Pose, Transform};

use super::clock::{ClockSnapshot, PlaybackClock};
use super::lookup::TopicIndex;
use super::time::{SystemTimeSource, TimeSource};
use super::topic::{
    TimeRange, Topic, TopicMessage, detect_image_topic, extract_topics, find_topic, time_range,
};

/// 解码后的日志及其派生数据。
#[derive(Debug, Clone)]
pub struct LoadedLog {
    pub parsed: ParsedLog,
    pub topics: Vec<Topic>,
    /// 与 `topics` 一一对应
    pub indexes: Vec<TopicIndex>,
    pub image_topic: Option<String>,
    pub time_range: Option<TimeRange>,
}

impl LoadedLog {
    pub fn new(parsed: ParsedLog, image_topic_pattern: &str) -> Self {
        let topics = extract_topics(&parsed.raw);
        let indexes = topics
            .iter()
            .map(|t| TopicIndex::build(&t.messages))
            .collect();
        let image_topic = detect_image_topic(&topics, image_topic_pattern).map(str::to_string);
        let time_range = time_range(&topics);
        Self {
            parsed,
            topics,
            indexes,
            image_topic,
            time_range,
        }
    }

    pub fn topic(&self, name: &str) -> Option<&Topic> {
        find_topic(&self.topics, name)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.topics.iter().position(|t| t.topic_name == name)
    }
}

/// 观察者在通知期间发出的控制命令。
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackCommand {
    Play,
    Pause,
    Toggle,
    Seek(f64),
    SetSpeed(f64),
    SelectTopic(Option<String>),
}

pub trait PlaybackObserver {
    fn on_tick(&mut self, snapshot: &ClockSnapshot, commands: &mut Vec<PlaybackCommand>);
}

/// 一次异步加载的凭据；只有最新的凭据能提交结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    /// 已有更新的加载或卸载，结果被丢弃
    Stale,
}

/// 某个 topic 在当前虚拟时间的消息。
#[derive(Debug, Clone, PartialEq)]
pub struct FrameEntry<'a> {
    pub topic: &'a Topic,
    pub index: usize,
    pub message: &'a TopicMessage,
}

pub struct PlaybackSession<S: TimeSource = SystemTimeSource> {
    source: S,
    config: ViewerConfig,
    clock: PlaybackClock,
    log: Option<LoadedLog>,
    selected_topic: Option<String>,
    last_error: Option<String>,
    generation: u64,
    observers: Vec<Box<dyn PlaybackObserver>>,
}

impl PlaybackSession<SystemTimeSource> {
    pub fn with_system_clock(config: ViewerConfig) -> Self {
        Self::new(SystemTimeSource, config)
    }
}

impl<S: TimeSource> PlaybackSession<S> {
    pub fn new(source: S, config: ViewerConfig) -> Self {
        let clock = PlaybackClock::new(config.default_speed);
        Self {
            source,
            config,
            clock,
            log: None,
            selected_topic: None,
            last_error: None,
            generation: 0,
            observers: Vec::new(),
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn clock(&self) -> &PlaybackClock {
        &self.clock
    }

    pub fn log(&self) -> Option<&LoadedLog> {
        self.log.as_ref()
    }

    pub fn topics(&self) -> &[Topic] {
        self.log
            .as_ref()
            .map(|l| l.topics.as_slice())
            .unwrap_or(&[])
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn selected_topic(&self) -> Option<&str> {
        self.selected_topic.as_deref()
    }

    pub fn snapshot(&self) -> ClockSnapshot {
        self.clock.snapshot()
    }

    pub fn subscribe(&mut self, observer: Box<dyn PlaybackObserver>) {
        self.observers.push(observer);
    }

    /// 同步解码并加载；失败时保留原有日志与时钟。
    pub fn load_bytes(&mut self, bytes: &[u8]) -> Result<(), LogError> {
        let ticket = self.begin_load();
        self.complete_load(ticket, decode(bytes)).map(|_| ())
    }

    /// 开始一次加载；之前发出的凭据随之失效。
    pub fn begin_load(&mut self) -> LoadTicket {
        self.generation += 1;
        LoadTicket {
            generation: self.generation,
        }
    }

    /// 提交加载结果。过期凭据的结果（成功或失败）都被丢弃。
    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<ParsedLog, LogError>,
    ) -> Result<LoadOutcome, LogError> {
        if ticket.generation != self.generation {
            warn!(
                ticket = ticket.generation,
                current = self.generation,
                "丢弃过期的加载结果"
            );
            return Ok(LoadOutcome::Stale);
        }
        match result {
            Ok(parsed) => {
                self.apply(parsed);
                Ok(LoadOutcome::Applied)
            }
            Err(err) => {
                warn!(error = %err, "加载日志失败");
                self.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    fn apply(&mut self, parsed: ParsedLog) {
        let log = LoadedLog::new(parsed, &self.config.image_topic_pattern);
        info!(
            items = log.parsed.raw.len(),
            topics = log.topics.len(),
            start = ?log.time_range.map(|r| r.start),
            end = ?log.time_range.map(|r| r.end),
            "日志已加载"
        );
        self.clock.load(log.time_range);
        self.selected_topic = None;
        self.last_error = None;
        self.log = Some(log);
    }

    /// 清空日志与时钟；进行中的加载随之失效。
    pub fn unload(&mut self) {
        self.generation += 1;
        self.log = None;
        self.selected_topic = None;
        self.last_error = None;
        self.clock.unload();
    }

    pub fn play(&mut self) -> bool {
        let now = self.source.now_ms();
        self.clock.play(now)
    }

    pub fn pause(&mut self) -> bool {
        let now = self.source.now_ms();
        self.clock.pause(now)
    }

    pub fn toggle(&mut self) -> bool {
        let now = self.source.now_ms();
        self.clock.toggle(now)
    }

    pub fn set_speed(&mut self, speed: f64) -> bool {
        let now = self.source.now_ms();
        self.clock.set_speed(speed, now)
    }

    /// 倍速翻倍，不超过上限
    pub fn faster(&mut self) -> bool {
        let speed = (self.clock.speed() * 2.0).min(self.config.max_speed);
        self.set_speed(speed)
    }

    /// 倍速减半，不低于下限
    pub fn slower(&mut self) -> bool {
        let speed = (self.clock.speed() / 2.0).max(self.config.min_speed);
        self.set_speed(speed)
    }

    pub fn seek(&mut self, fraction: f64) -> bool {
        let now = self.source.now_ms();
        self.clock.seek(fraction, now)
    }

    /// 选中一个 topic；名称不存在时保持原选择。
    pub fn select_topic(&mut self, name: Option<&str>) -> bool {
        match name {
            None => {
                self.selected_topic = None;
                true
            }
            Some(name) if self.log.as_ref().and_then(|l| l.topic(name)).is_some() => {
                self.selected_topic = Some(name.to_string());
                true
            }
            Some(name) => {
                warn!(topic = name, "选择了不存在的 topic");
                false
            }
        }
    }

    /// 推进时钟。播放中会通知观察者，并在通知结束后执行它们发出的命令。
    pub fn tick(&mut self) -> ClockSnapshot {
        let now = self.source.now_ms();
        self.clock.tick(now);
        let snapshot = self.clock.snapshot();
        if !snapshot.is_playing {
            return snapshot;
        }

        let mut commands = Vec::new();
        for observer in self.observers.iter_mut() {
            observer.on_tick(&snapshot, &mut commands);
        }
        if commands.is_empty() {
            return snapshot;
        }
        for command in commands {
            self.apply_command(command);
        }
        self.clock.snapshot()
    }

    pub fn apply_command(&mut self, command: PlaybackCommand) {
        match command {
            PlaybackCommand::Play => {
                self.play();
            }
            PlaybackCommand::Pause => {
                self.pause();
            }
            PlaybackCommand::Toggle => {
                self.toggle();
            }
            PlaybackCommand::Seek(fraction) => {
                self.seek(fraction);
            }
            PlaybackCommand::SetSpeed(speed) => {
                self.set_speed(speed);
            }
            PlaybackCommand::SelectTopic(name) => {
                self.select_topic(name.as_deref());
            }
        }
    }

    /// 该 topic 在当前绝对时间的最近消息下标；未加载或无此 topic 时为 0。
    pub fn current_index(&self, topic: &str) -> usize {
        let (Some(log), Some(now)) = (self.log.as_ref(), self.clock.absolute_time()) else {
            return 0;
        };
        log.position(topic)
            .map_or(0, |i| log.indexes[i].nearest(now))
    }

    pub fn current_message(&self, topic: &str) -> Option<&TopicMessage> {
        let log = self.log.as_ref()?;
        let idx = log.position(topic)?;
        let index = self.current_index(topic);
        log.topics[idx].messages.get(index)
    }

    pub fn selected_message(&self) -> Option<&TopicMessage> {
        self.selected_topic
            .as_deref()
            .and_then(|t| self.current_message(t))
    }

    /// 里程计 topic（`config.odom_topic`）在当前时间的位姿，机器人坐标系。
    /// 没有该 topic 或消息时为 `Ok(None)`。
    pub fn current_pose(&self) -> Result<Option<Pose>, PayloadError> {
        self.current_message(&self.config.odom_topic)
            .map(|m| Pose::from_message(&m.data))
            .transpose()
    }

    /// 相机 topic 在当前时间的图像帧；与位姿共用同一虚拟时间。
    pub fn current_image(&self) -> Result<Option<ImageFrame>, PayloadError> {
        let Some(topic) = self.log.as_ref().and_then(|l| l.image_topic.as_deref()) else {
            return Ok(None);
        };
        self.current_message(topic)
            .map(|m| ImageFrame::from_message(&m.data))
            .transpose()
    }

    /// 静态变换取 `config.tf_static_topic` 的第一条消息，与播放位置无关。
    pub fn static_transform(&self) -> Result<Option<Transform>, PayloadError> {
        self.log
            .as_ref()
            .and_then(|l| l.topic(&self.config.tf_static_topic))
            .and_then(|t| t.messages.first())
            .map(|m| Transform::from_tf_static(&m.data))
            .transpose()
    }

    /// 所有非空 topic 在同一虚拟时间下的当前消息。
    pub fn current_frame(&self) -> Vec<FrameEntry<'_>> {
        let Some(log) = self.log.as_ref() else {
            return Vec::new();
        };
        let now = self.clock.absolute_time();
        log.topics
            .iter()
            .zip(&log.indexes)
            .filter_map(|(topic, index)| {
                let i = now.map_or(0, |t| index.nearest(t));
                topic.messages.get(i).map(|message| FrameEntry {
                    topic,
                    index: i,
                    message,
                })
            })
            .collect()
    }
}
