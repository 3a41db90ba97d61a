use crate::ion::{Element, IonBuilder};
use crate::log::{decode, decode_in_background, join_decode};
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn parsed_log_serializes_with_field_order_preserved() {
    let bytes = IonBuilder::new()
        .with(Element::structure([
            ("zeta", Element::Int(1)),
            ("alpha", Element::Blob(vec![1, 2, 3])),
            ("mid", Element::list([Element::Bool(false), Element::Null])),
        ]))
        .finish();
    let parsed = decode(&bytes).expect("decode");
    let v = serde_json::to_value(&parsed).expect("serialize");
    assert_eq!(
        v,
        json!({ "raw": [ { "zeta": 1, "alpha": "AQID", "mid": [false, null] } ] })
    );
    let keys: Vec<_> = v["raw"][0]
        .as_object()
        .expect("object")
        .keys()
        .cloned()
        .collect();
    assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
}

#[test]
fn decode_is_deterministic() {
    let bytes = super::log_bytes(vec![super::topic("/a", "std_msgs/Int32", &[5, 1, 3])]);
    let first = decode(&bytes).expect("decode");
    let second = decode(&bytes).expect("decode");
    assert_eq!(first, second);
}

#[test]
fn background_decode_matches_foreground() {
    let bytes = super::log_bytes(vec![super::topic("/a", "std_msgs/Int32", &[1, 2])]);
    let expected = decode(&bytes).expect("decode");
    let got = join_decode(decode_in_background(bytes)).expect("background decode");
    assert_eq!(got, expected);
}

#[test]
fn background_decode_reports_errors_unchanged() {
    let err = join_decode(decode_in_background(Vec::new())).expect_err("empty");
    assert_eq!(err.to_string(), crate::log::LogError::EmptyInput.to_string());
}
