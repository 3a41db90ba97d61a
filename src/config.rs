//! 回放配置（JSON 文件，所有字段都有默认值）

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_IMAGE_TOPIC_PATTERN: &str = "/image_raw/compressed_throttle";
pub const DEFAULT_ODOM_TOPIC: &str = "/tb_control/wheel_odom";
pub const DEFAULT_TF_STATIC_TOPIC: &str = "/tf_static";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid speed bounds: min {min}, default {default}, max {max}")]
    InvalidSpeed { min: f64, default: f64, max: f64 },

    #[error("tick interval must be positive")]
    InvalidTickInterval,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// 播放循环的 tick 间隔（毫秒，约 60fps）
    pub tick_interval_ms: u64,
    pub default_speed: f64,
    pub min_speed: f64,
    pub max_speed: f64,
    /// 相机 topic 名称的匹配子串（不区分大小写）
    pub image_topic_pattern: String,
    pub odom_topic: String,
    pub tf_static_topic: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 16,
            default_speed: 1.0,
            min_speed: 0.25,
            max_speed: 4.0,
            image_topic_pattern: DEFAULT_IMAGE_TOPIC_PATTERN.to_string(),
            odom_topic: DEFAULT_ODOM_TOPIC.to_string(),
            tf_static_topic: DEFAULT_TF_STATIC_TOPIC.to_string(),
        }
    }
}

impl ViewerConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let cfg: ViewerConfig = serde_json::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let ok = [self.min_speed, self.default_speed, self.max_speed]
            .iter()
            .all(|s| s.is_finite() && *s > 0.0)
            && self.min_speed <= self.default_speed
            && self.default_speed <= self.max_speed;
        if !ok {
            return Err(ConfigError::InvalidSpeed {
                min: self.min_speed,
                default: self.default_speed,
                max: self.max_speed,
            });
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidTickInterval);
        }
        Ok(())
    }
}
