//! 消息载荷探测
//!
//! 消息数据没有固定 schema，这里按形状识别几类常见载荷：里程计位姿、
//! 静态坐标变换与压缩图像。

mod error;
mod image;
mod pose;

pub use error::PayloadError;
pub use image::{ImageFormat, ImageFrame, parse_python_bytes};
pub use pose::{Pose, Quaternion, Transform, Vector3};
