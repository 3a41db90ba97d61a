use crate::log::{DecodedValue, Fields, ParsedLog, RobotInfo, SessionInfo, metadata_section};
use pretty_assertions::assert_eq;

fn fields(pairs: &[(&str, DecodedValue)]) -> Fields {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[test]
fn session_aliases_normalize_to_canonical_fields() {
    let session = SessionInfo::from_fields(&fields(&[
        ("session_id", "s-1".into()),
        ("start_time", 100i64.into()),
        ("end_time", 900i64.into()),
        ("operator", "ops".into()),
    ]));
    assert_eq!(session.id(), Some("s-1"));
    assert_eq!(session.start_time(), Some(&DecodedValue::Int(100)));
    assert_eq!(session.end_time(), Some(&DecodedValue::Int(900)));
    assert_eq!(
        session.record().passthrough().get("operator"),
        Some(&DecodedValue::from("ops"))
    );
}

#[test]
fn first_truthy_alias_wins() {
    let session = SessionInfo::from_fields(&fields(&[
        ("sessionId", "".into()),
        ("session_id", "s-2".into()),
        ("id", "s-3".into()),
    ]));
    assert_eq!(session.id(), Some("s-2"));
}

#[test]
fn canonical_value_wins_over_passthrough_of_same_name() {
    let session = SessionInfo::from_fields(&fields(&[
        ("sessionId", "canonical".into()),
        ("id", "raw-id".into()),
        ("status", "done".into()),
    ]));
    let merged = session.record().as_value();
    assert_eq!(merged.get("id"), Some(&DecodedValue::from("canonical")));
    assert!(!session.record().passthrough().contains_key("id"));
    assert!(!session.record().passthrough().contains_key("status"));
    // 规范字段在前，透传字段在后
    let keys: Vec<_> = merged.as_struct().expect("struct").keys().collect();
    assert_eq!(keys, vec!["id", "status", "sessionId"]);
}

#[test]
fn robot_info_is_found_by_marker_fields() {
    let raw = vec![
        DecodedValue::Struct(fields(&[("topics", DecodedValue::List(vec![]))])),
        DecodedValue::Struct(fields(&[
            ("robotName", "ohmni".into()),
            ("robot_id", "r-7".into()),
            ("robotVersion", "2.1".into()),
        ])),
        DecodedValue::Struct(fields(&[("robotId", "later".into())])),
    ];
    let parsed = ParsedLog::from_raw(raw);
    let robot: &RobotInfo = parsed.robot.as_ref().expect("robot");
    assert_eq!(robot.id(), Some("r-7"));
    assert_eq!(robot.name(), Some("ohmni"));
    assert_eq!(robot.version(), Some("2.1"));
    assert_eq!(robot.model(), None);
    assert!(parsed.session.is_none());
}

#[test]
fn falsy_marker_does_not_identify_a_session() {
    let raw = vec![
        DecodedValue::Struct(fields(&[("sessionId", "".into())])),
        DecodedValue::Struct(fields(&[("startTime", 5i64.into())])),
    ];
    let parsed = ParsedLog::from_raw(raw);
    let session = parsed.session.expect("session");
    assert_eq!(session.start_time(), Some(&DecodedValue::Int(5)));
    assert_eq!(session.id(), None);
}

#[test]
fn metadata_section_returns_first_match_in_raw_order() {
    let meta = |name: &str| {
        DecodedValue::Struct(fields(&[(
            "metadata",
            DecodedValue::Struct(fields(&[(
                "botConfig",
                DecodedValue::Struct(fields(&[("name", name.into())])),
            )])),
        )]))
    };
    let raw = vec![DecodedValue::Int(1), meta("first"), meta("second")];
    let section = metadata_section(&raw, "botConfig").expect("botConfig");
    assert_eq!(section.get("name"), Some(&DecodedValue::from("first")));
    assert!(metadata_section(&raw, "sessionInfo").is_none());
}
