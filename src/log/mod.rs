//! 解码后的日志
//!
//! 通用值树、顶层解码入口，以及会话 / 机器人信息的结构化。

mod decode;
mod error;
mod structure;
mod value;

pub use decode::{ParsedLog, decode, decode_in_background, join_decode};
pub use error::LogError;
pub use structure::{
    NormalizedRecord, RobotInfo, SessionInfo, find_robot, find_session, metadata_section,
};
pub use value::{DecodedValue, Fields};
