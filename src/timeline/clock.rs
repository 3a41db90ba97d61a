//! 播放时钟
//!
//! 虚拟时间 = accumulated_offset + (now - wall_clock_anchor) × speed。
//! 所有转换都显式接收 `now`（毫秒），时钟本身从不读取墙钟。
//!
//! 状态：未加载 → 停止 ⇄ 播放；tick 时虚拟时间超过时长则回到 0 继续播放。

use serde::Serialize;
use tracing::{debug, warn};

use super::topic::TimeRange;

#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackClock {
    is_playing: bool,
    speed_multiplier: f64,
    virtual_time: i64,
    wall_clock_anchor: Option<i64>,
    accumulated_offset: i64,
    range: Option<TimeRange>,
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl PlaybackClock {
    pub fn new(speed: f64) -> Self {
        let speed_multiplier = if valid_speed(speed) { speed } else { 1.0 };
        Self {
            is_playing: false,
            speed_multiplier,
            virtual_time: 0,
            wall_clock_anchor: None,
            accumulated_offset: 0,
            range: None,
        }
    }

    /// 载入新日志的时间范围；回到停止状态、虚拟时间 0，保留倍速。
    pub fn load(&mut self, range: Option<TimeRange>) {
        *self = Self {
            range,
            ..Self::new(self.speed_multiplier)
        };
    }

    /// 卸载日志，保留倍速。
    pub fn unload(&mut self) {
        self.load(None);
    }

    pub fn is_loaded(&self) -> bool {
        self.range.is_some()
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn speed(&self) -> f64 {
        self.speed_multiplier
    }

    pub fn virtual_time(&self) -> i64 {
        self.virtual_time
    }

    pub fn accumulated_offset(&self) -> i64 {
        self.accumulated_offset
    }

    pub fn wall_clock_anchor(&self) -> Option<i64> {
        self.wall_clock_anchor
    }

    pub fn range(&self) -> Option<TimeRange> {
        self.range
    }

    pub fn duration(&self) -> i64 {
        self.range.map_or(0, |r| r.duration())
    }

    /// 0..=1；时长为 0 时为 0
    pub fn progress(&self) -> f64 {
        let duration = self.duration();
        if duration <= 0 {
            return 0.0;
        }
        self.virtual_time as f64 / duration as f64
    }

    /// 日志起点 + 虚拟时间
    pub fn absolute_time(&self) -> Option<i64> {
        self.range.map(|r| r.start.saturating_add(self.virtual_time))
    }

    /// 未加载或已在播放时不做任何事，返回是否发生了状态变化。
    pub fn play(&mut self, now: i64) -> bool {
        if !self.is_loaded() || self.is_playing {
            return false;
        }
        self.wall_clock_anchor = Some(now);
        self.is_playing = true;
        debug!(now, offset = self.accumulated_offset, "开始播放");
        true
    }

    pub fn pause(&mut self, now: i64) -> bool {
        if !self.is_playing {
            return false;
        }
        self.tick(now);
        self.accumulated_offset = self.virtual_time;
        self.wall_clock_anchor = None;
        self.is_playing = false;
        debug!(offset = self.accumulated_offset, "暂停");
        true
    }

    pub fn toggle(&mut self, now: i64) -> bool {
        if self.is_playing {
            self.pause(now)
        } else {
            self.play(now)
        }
    }

    /// 重新计算虚拟时间；超过时长时回到开头（锚点重置为 `now`）。
    pub fn tick(&mut self, now: i64) -> i64 {
        let Some(anchor) = self.wall_clock_anchor.filter(|_| self.is_playing) else {
            return self.virtual_time;
        };
        let current = self
            .accumulated_offset
            .saturating_add(self.scaled(now.saturating_sub(anchor)));
        if current > self.duration() {
            debug!(current, duration = self.duration(), "播放到末尾，循环");
            self.accumulated_offset = 0;
            self.wall_clock_anchor = Some(now);
            self.virtual_time = 0;
        } else {
            self.virtual_time = current;
        }
        self.virtual_time
    }

    /// 播放中先按旧倍速结算已流逝时间再切换，虚拟时间保持连续。
    pub fn set_speed(&mut self, speed: f64, now: i64) -> bool {
        if !valid_speed(speed) {
            warn!(speed, "忽略无效的播放倍速");
            return false;
        }
        if let Some(anchor) = self.wall_clock_anchor.filter(|_| self.is_playing) {
            self.accumulated_offset = self
                .accumulated_offset
                .saturating_add(self.scaled(now.saturating_sub(anchor)));
            self.wall_clock_anchor = Some(now);
            self.virtual_time = self.accumulated_offset;
        }
        self.speed_multiplier = speed;
        true
    }

    /// 跳转到 `fraction` × 时长（钳制到 0..=1）；播放中重置锚点。
    pub fn seek(&mut self, fraction: f64, now: i64) -> bool {
        if !self.is_loaded() {
            return false;
        }
        if fraction.is_nan() {
            warn!("忽略无效的跳转位置");
            return false;
        }
        let fraction = fraction.clamp(0.0, 1.0);
        let target = (fraction * self.duration() as f64).round() as i64;
        self.virtual_time = target;
        self.accumulated_offset = target;
        if self.is_playing {
            self.wall_clock_anchor = Some(now);
        }
        true
    }

    pub fn snapshot(&self) -> ClockSnapshot {
        ClockSnapshot {
            is_playing: self.is_playing,
            speed: self.speed_multiplier,
            virtual_time: self.virtual_time,
            duration: self.duration(),
            progress: self.progress(),
            log_start_time: self.range.map(|r| r.start),
            log_end_time: self.range.map(|r| r.end),
            absolute_time: self.absolute_time(),
        }
    }

    fn scaled(&self, elapsed: i64) -> i64 {
        (elapsed.max(0) as f64 * self.speed_multiplier).round() as i64
    }
}

fn valid_speed(speed: f64) -> bool {
    speed.is_finite() && speed > 0.0
}

/// 观察者看到的只读时钟状态。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockSnapshot {
    pub is_playing: bool,
    pub speed: f64,
    pub virtual_time: i64,
    pub duration: i64,
    pub progress: f64,
    pub log_start_time: Option<i64>,
    pub log_end_time: Option<i64>,
    pub absolute_time: Option<i64>,
}
