//! 位姿 / 坐标变换
//!
//! 机器人坐标系 z 轴向上，三维场景 y 轴向上；[`Pose::to_scene`] 交换 y 与 z。

use serde::Serialize;

use super::error::PayloadError;
use crate::log::DecodedValue;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    /// 缺失或非数值的分量按 0 处理。
    fn from_value(value: &DecodedValue) -> Self {
        Self {
            x: component(value, "x", 0.0),
            y: component(value, "y", 0.0),
            z: component(value, "z", 0.0),
        }
    }

    fn swap_yz(self) -> Self {
        Self {
            x: self.x,
            y: self.z,
            z: self.y,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    fn from_value(value: &DecodedValue) -> Self {
        Self {
            x: component(value, "x", 0.0),
            y: component(value, "y", 0.0),
            z: component(value, "z", 0.0),
            w: component(value, "w", 1.0),
        }
    }

    fn swap_yz(self) -> Self {
        Self {
            x: self.x,
            y: self.z,
            z: self.y,
            w: self.w,
        }
    }
}

/// `v || default`：0 / NaN / 缺失都取默认值
fn component(value: &DecodedValue, name: &str, default: f64) -> f64 {
    value
        .get(name)
        .and_then(DecodedValue::as_f64)
        .filter(|v| *v != 0.0 && !v.is_nan())
        .unwrap_or(default)
}

/// 里程计消息中的位姿（`pose.pose.{position, orientation}`）。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pose {
    pub position: Vector3,
    pub orientation: Quaternion,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_frame_id: Option<String>,
}

impl Pose {
    pub fn from_message(data: &DecodedValue) -> Result<Self, PayloadError> {
        let pose = data
            .pointer(&["pose", "pose"])
            .ok_or(PayloadError::MissingField("pose.pose"))?;
        let position = pose
            .get("position")
            .filter(|v| v.as_struct().is_some())
            .ok_or(PayloadError::MissingField("pose.pose.position"))?;
        let orientation = pose
            .get("orientation")
            .filter(|v| v.as_struct().is_some())
            .map_or(Quaternion::IDENTITY, Quaternion::from_value);
        Ok(Self {
            position: Vector3::from_value(position),
            orientation,
            frame_id: text_at(data, &["header", "frame_id"]),
            child_frame_id: text_at(data, &["child_frame_id"]),
        })
    }

    /// 换算到场景坐标系
    pub fn to_scene(&self) -> Self {
        Self {
            position: self.position.swap_yz(),
            orientation: self.orientation.swap_yz(),
            ..self.clone()
        }
    }
}

fn text_at(data: &DecodedValue, path: &[&str]) -> Option<String> {
    data.pointer(path)
        .and_then(DecodedValue::as_str)
        .map(str::to_string)
}

/// 静态坐标变换（`transforms[0]`）。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transform {
    pub translation: Vector3,
    pub rotation: Quaternion,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_frame_id: Option<String>,
}

impl Transform {
    pub fn from_tf_static(data: &DecodedValue) -> Result<Self, PayloadError> {
        let transforms = data
            .get("transforms")
            .ok_or(PayloadError::MissingField("transforms"))?;
        let first = transforms
            .as_list()
            .ok_or(PayloadError::UnexpectedType {
                field: "transforms",
                found: transforms.kind_name(),
            })?
            .first()
            .ok_or(PayloadError::MissingField("transforms[0]"))?;
        let transform = first
            .get("transform")
            .ok_or(PayloadError::MissingField("transforms[0].transform"))?;
        Ok(Self {
            translation: transform
                .get("translation")
                .map(Vector3::from_value)
                .unwrap_or_default(),
            rotation: transform
                .get("rotation")
                .map_or(Quaternion::IDENTITY, Quaternion::from_value),
            frame_id: text_at(first, &["header", "frame_id"]),
            child_frame_id: text_at(first, &["child_frame_id"]),
        })
    }
}
