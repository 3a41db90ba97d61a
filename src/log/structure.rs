//! 会话 / 机器人信息的归一化
//!
//! 在 `raw` 中找出第一条形似会话（或机器人）的记录，整理出规范字段，
//! 其余字段原样保留。规范字段与原字段同名时以规范字段为准。

use serde::ser::{Serialize, Serializer};

use super::value::{DecodedValue, Fields};

/// 规范字段名及其别名（按优先级）。
struct CanonicalField {
    name: &'static str,
    aliases: &'static [&'static str],
}

const SESSION_MARKERS: &[&str] = &["sessionId", "session_id", "startTime", "session"];
const ROBOT_MARKERS: &[&str] = &["robotId", "robot_id", "robotName", "robot"];

const SESSION_FIELDS: &[CanonicalField] = &[
    CanonicalField {
        name: "id",
        aliases: &["sessionId", "session_id", "id"],
    },
    CanonicalField {
        name: "startTime",
        aliases: &["startTime", "start_time"],
    },
    CanonicalField {
        name: "endTime",
        aliases: &["endTime", "end_time"],
    },
    CanonicalField {
        name: "duration",
        aliases: &["duration"],
    },
    CanonicalField {
        name: "status",
        aliases: &["status"],
    },
];

const ROBOT_FIELDS: &[CanonicalField] = &[
    CanonicalField {
        name: "id",
        aliases: &["robotId", "robot_id", "id"],
    },
    CanonicalField {
        name: "name",
        aliases: &["robotName", "robot_name", "name"],
    },
    CanonicalField {
        name: "model",
        aliases: &["model", "robotModel"],
    },
    CanonicalField {
        name: "version",
        aliases: &["version", "robotVersion"],
    },
    CanonicalField {
        name: "status",
        aliases: &["status"],
    },
];

/// 规范字段在前、透传字段在后的记录。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NormalizedRecord {
    canonical: Fields,
    passthrough: Fields,
}

impl NormalizedRecord {
    fn normalize(source: &Fields, table: &[CanonicalField]) -> Self {
        let mut canonical = Fields::new();
        for field in table {
            if let Some(value) = resolve_alias(source, field.aliases) {
                canonical.insert(field.name, value.clone());
            }
        }
        let passthrough = source
            .iter()
            .filter(|(k, _)| !table.iter().any(|f| f.name == *k))
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        Self {
            canonical,
            passthrough,
        }
    }

    pub fn get(&self, name: &str) -> Option<&DecodedValue> {
        self.canonical
            .get(name)
            .or_else(|| self.passthrough.get(name))
    }

    pub fn canonical(&self) -> &Fields {
        &self.canonical
    }

    pub fn passthrough(&self) -> &Fields {
        &self.passthrough
    }

    /// 合并为单个结构体
    pub fn as_value(&self) -> DecodedValue {
        let mut merged = self.canonical.clone();
        for (k, v) in self.passthrough.iter() {
            merged.insert(k, v.clone());
        }
        DecodedValue::Struct(merged)
    }

    fn text(&self, name: &str) -> Option<&str> {
        self.canonical.get(name).and_then(DecodedValue::as_str)
    }
}

/// `a || b || c`：取第一个真值别名，全为假时取最后一个别名的原值。
fn resolve_alias<'a>(source: &'a Fields, aliases: &[&str]) -> Option<&'a DecodedValue> {
    aliases
        .iter()
        .filter_map(|a| source.get(a))
        .find(|v| v.is_truthy())
        .or_else(|| aliases.last().and_then(|a| source.get(a)))
}

fn has_marker(item: &DecodedValue, markers: &[&str]) -> bool {
    markers
        .iter()
        .any(|m| item.get(m).is_some_and(DecodedValue::is_truthy))
}

/// 会话信息（规范字段：id / startTime / endTime / duration / status）
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionInfo(NormalizedRecord);

impl SessionInfo {
    pub fn from_fields(fields: &Fields) -> Self {
        Self(NormalizedRecord::normalize(fields, SESSION_FIELDS))
    }

    pub fn id(&self) -> Option<&str> {
        self.0.text("id")
    }

    pub fn start_time(&self) -> Option<&DecodedValue> {
        self.0.canonical.get("startTime")
    }

    pub fn end_time(&self) -> Option<&DecodedValue> {
        self.0.canonical.get("endTime")
    }

    pub fn duration(&self) -> Option<&DecodedValue> {
        self.0.canonical.get("duration")
    }

    pub fn status(&self) -> Option<&DecodedValue> {
        self.0.canonical.get("status")
    }

    pub fn record(&self) -> &NormalizedRecord {
        &self.0
    }
}

/// 机器人信息（规范字段：id / name / model / version / status）
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RobotInfo(NormalizedRecord);

impl RobotInfo {
    pub fn from_fields(fields: &Fields) -> Self {
        Self(NormalizedRecord::normalize(fields, ROBOT_FIELDS))
    }

    pub fn id(&self) -> Option<&str> {
        self.0.text("id")
    }

    pub fn name(&self) -> Option<&str> {
        self.0.text("name")
    }

    pub fn model(&self) -> Option<&str> {
        self.0.text("model")
    }

    pub fn version(&self) -> Option<&str> {
        self.0.text("version")
    }

    pub fn status(&self) -> Option<&DecodedValue> {
        self.0.canonical.get("status")
    }

    pub fn record(&self) -> &NormalizedRecord {
        &self.0
    }
}

pub fn find_session(raw: &[DecodedValue]) -> Option<SessionInfo> {
    raw.iter()
        .filter(|item| has_marker(item, SESSION_MARKERS))
        .find_map(DecodedValue::as_struct)
        .map(SessionInfo::from_fields)
}

pub fn find_robot(raw: &[DecodedValue]) -> Option<RobotInfo> {
    raw.iter()
        .filter(|item| has_marker(item, ROBOT_MARKERS))
        .find_map(DecodedValue::as_struct)
        .map(RobotInfo::from_fields)
}

/// 第一条带有 `metadata.<section>` 的记录中的该段，例如 `sessionInfo`、`botConfig`。
pub fn metadata_section<'a>(raw: &'a [DecodedValue], section: &str) -> Option<&'a DecodedValue> {
    raw.iter()
        .filter_map(|item| item.pointer(&["metadata", section]))
        .find(|v| v.is_truthy())
}

impl Serialize for NormalizedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_value().serialize(serializer)
    }
}

impl Serialize for SessionInfo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl Serialize for RobotInfo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}
