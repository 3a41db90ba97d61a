use crate::ion::{Element, IonBuilder, IonError, ION_BVM, TypeCode};
use crate::log::{DecodedValue, LogError, decode};
use pretty_assertions::assert_eq;

fn decode_single(value: Element) -> DecodedValue {
    let bytes = IonBuilder::new().with(value).finish();
    let parsed = decode(&bytes).expect("decode");
    assert_eq!(parsed.raw.len(), 1);
    parsed.raw.into_iter().next().expect("one value")
}

fn with_bvm(body: &[u8]) -> Vec<u8> {
    let mut bytes = ION_BVM.to_vec();
    bytes.extend_from_slice(body);
    bytes
}

#[test]
fn scalars_decode_to_matching_variants() {
    let v = decode_single(Element::structure([
        ("i", Element::Int(-5)),
        ("big", Element::Int(1_700_000_000_123)),
        ("f", Element::Float(1.5)),
        ("f32", Element::Float32(0.5)),
        ("d", Element::Decimal { coefficient: 314, exponent: -2 }),
        ("s", Element::string("hello")),
        ("sym", Element::symbol("odom")),
        ("b", Element::Bool(true)),
        ("n", Element::Null),
        ("tn", Element::TypedNull(TypeCode::String)),
        ("clob", Element::Clob(b"hi".to_vec())),
    ]));
    assert_eq!(v.get("i"), Some(&DecodedValue::Int(-5)));
    assert_eq!(v.get("big"), Some(&DecodedValue::Int(1_700_000_000_123)));
    assert_eq!(v.get("f"), Some(&DecodedValue::Float(1.5)));
    assert_eq!(v.get("f32"), Some(&DecodedValue::Float(0.5)));
    assert_eq!(v.get("d"), Some(&DecodedValue::Decimal(3.14)));
    assert_eq!(v.get("s"), Some(&DecodedValue::from("hello")));
    assert_eq!(v.get("sym"), Some(&DecodedValue::Symbol("odom".to_string())));
    assert_eq!(v.get("b"), Some(&DecodedValue::Bool(true)));
    assert_eq!(v.get("n"), Some(&DecodedValue::Null));
    assert_eq!(v.get("tn"), Some(&DecodedValue::Null));
    assert_eq!(v.get("clob"), Some(&DecodedValue::from("hi")));
}

#[test]
fn blob_is_exact_base64_of_original_bytes() {
    let bytes: Vec<u8> = (0..=255).collect();
    let v = decode_single(Element::Blob(bytes.clone()));
    assert!(matches!(v, DecodedValue::Blob(_)));
    assert_eq!(v.blob_bytes(), Some(bytes));
}

#[test]
fn integer_beyond_i64_degrades_to_float() {
    // 2^64，9 字节正整数
    let raw = vec![0x2E, 0x89, 0x01, 0, 0, 0, 0, 0, 0, 0, 0];
    let v = decode_single(Element::Raw(raw));
    assert_eq!(v, DecodedValue::Float(18_446_744_073_709_551_616.0));
}

#[test]
fn i64_min_stays_integer() {
    let v = decode_single(Element::Int(i64::MIN));
    assert_eq!(v, DecodedValue::Int(i64::MIN));
}

#[test]
fn negative_zero_decimal_coefficient_is_negative_zero() {
    // 指数 0，系数 -0
    let v = decode_single(Element::Raw(vec![0x52, 0x80, 0x80]));
    match v {
        DecodedValue::Decimal(d) => {
            assert_eq!(d, 0.0);
            assert!(d.is_sign_negative());
        }
        other => panic!("expected decimal, got {other:?}"),
    }
}

#[test]
fn repeated_struct_field_keeps_first_position_and_last_value() {
    let v = decode_single(Element::structure([
        ("a", Element::Int(1)),
        ("b", Element::Int(2)),
        ("a", Element::Int(3)),
    ]));
    let fields = v.as_struct().expect("struct");
    assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    assert_eq!(fields.get("a"), Some(&DecodedValue::Int(3)));
}

#[test]
fn corrupt_struct_field_is_omitted_and_siblings_survive() {
    let v = decode_single(Element::structure([
        ("a", Element::Int(1)),
        // bool 的长度只能是 0 / 1 / 15
        ("bad", Element::Raw(vec![0x12])),
        ("negzero", Element::Raw(vec![0x30])),
        ("c", Element::string("x")),
    ]));
    let fields = v.as_struct().expect("struct");
    assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["a", "c"]);
}

#[test]
fn corrupt_list_element_is_dropped_without_hole() {
    let v = decode_single(Element::list([
        Element::Int(1),
        Element::Raw(vec![0x12]),
        Element::Int(3),
    ]));
    assert_eq!(
        v,
        DecodedValue::List(vec![DecodedValue::Int(1), DecodedValue::Int(3)])
    );
}

#[test]
fn sexp_decodes_as_list_and_annotations_are_discarded() {
    let v = decode_single(Element::structure([
        ("sexp", Element::Sexp(vec![Element::Int(1), Element::symbol("x")])),
        ("annotated", Element::annotated(["units", "m"], Element::Float(2.0))),
    ]));
    assert_eq!(
        v.get("sexp"),
        Some(&DecodedValue::List(vec![
            DecodedValue::Int(1),
            DecodedValue::Symbol("x".to_string())
        ]))
    );
    assert_eq!(v.get("annotated"), Some(&DecodedValue::Float(2.0)));
}

#[test]
fn nop_padding_is_skipped_everywhere() {
    let bytes = IonBuilder::new()
        .with(Element::Pad(3))
        .with(Element::list([Element::Pad(0), Element::Int(7), Element::Pad(20)]))
        .with(Element::structure([
            ("pad", Element::Pad(2)),
            ("x", Element::Int(1)),
        ]))
        .finish();
    let parsed = decode(&bytes).expect("decode");
    assert_eq!(parsed.raw.len(), 2);
    assert_eq!(parsed.raw[0], DecodedValue::List(vec![DecodedValue::Int(7)]));
    assert_eq!(
        parsed.raw[1].as_struct().map(|f| f.keys().collect::<Vec<_>>()),
        Some(vec!["x"])
    );
}

#[test]
fn unreadable_top_level_value_is_skipped() {
    let bytes = IonBuilder::new()
        .with(Element::Raw(vec![0x12]))
        .with(Element::Int(7))
        .finish();
    let parsed = decode(&bytes).expect("decode");
    assert_eq!(parsed.raw, vec![DecodedValue::Int(7)]);
    assert_eq!(parsed.dropped_items, 1);
}

#[test]
fn empty_and_all_zero_inputs_are_empty_input_errors() {
    assert!(matches!(decode(&[]), Err(LogError::EmptyInput)));
    assert!(matches!(decode(&[0, 0, 0, 0]), Err(LogError::EmptyInput)));
}

#[test]
fn missing_version_marker_is_fatal() {
    let err = decode(&[0x21, 0x01]).expect_err("no bvm");
    assert!(matches!(err, LogError::Decode(IonError::MissingVersionMarker)));
}

#[test]
fn unsupported_version_is_fatal() {
    let err = decode(&[0xE0, 0x02, 0x00, 0xEA]).expect_err("ion 2.0");
    assert!(matches!(
        err,
        LogError::Decode(IonError::UnsupportedVersion { major: 2, minor: 0 })
    ));
}

#[test]
fn truncated_top_level_length_is_fatal() {
    // 声明 16 字节的字符串，实际只有 1 字节
    let err = decode(&with_bvm(&[0x8E, 0x90, b'a'])).expect_err("truncated");
    assert!(matches!(err, LogError::Decode(IonError::LengthOverflow { .. })));
    assert!(err.to_string().starts_with("failed to parse Ion data"));
}

#[test]
fn nested_length_overflow_fails_only_the_enclosing_container() {
    // 列表内的字符串声明 5 字节，但列表只剩 1 字节
    let bad_list = vec![0xB2, 0x85, b'a'];
    let v = decode_single(Element::structure([
        ("bad", Element::Raw(bad_list)),
        ("ok", Element::Int(1)),
    ]));
    assert_eq!(v.as_struct().map(|f| f.len()), Some(1));
    assert_eq!(v.get("ok"), Some(&DecodedValue::Int(1)));
}

#[test]
fn excessive_nesting_is_dropped_not_overflowed() {
    let mut value = Element::Int(1);
    for _ in 0..300 {
        value = Element::list([value]);
    }
    let bytes = IonBuilder::new().with(value).with(Element::Int(2)).finish();
    let parsed = decode(&bytes).expect("decode");
    assert_eq!(parsed.raw.last(), Some(&DecodedValue::Int(2)));
}
