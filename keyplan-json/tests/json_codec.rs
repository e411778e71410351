use keyplan_core::{
    AssociatedValue, EnumSchema, EnumValue, FieldDescriptor, FieldType, KeyCase,
    SequenceElementSpec, StructPlan, StructSchema, Strategy, ValueKind, VariantDescriptor,
};
use keyplan_format::{DecodeError, Record};
use keyplan_json::{
    JsonErrorKind, JsonOptions, from_slice, from_str, to_string, to_string_pretty, to_string_with,
};
use keyplan_value::value;

fn account() -> StructPlan {
    StructSchema::new("Account")
        .key_case(KeyCase::CamelCase)
        .field(FieldDescriptor::new("user_id", ValueKind::UInt))
        .field(
            FieldDescriptor::new("display_name", ValueKind::String).coded_at(["profile", "name"]),
        )
        .field(
            FieldDescriptor::new("email", FieldType::optional(ValueKind::String))
                .coded_at(["profile", "email"]),
        )
        .compile()
        .unwrap()
}

#[keyplan_testhelpers::test]
fn decodes_and_encodes_text() {
    let plan = account();
    let record = from_str(&plan, r#"{"userId": 7, "profile": {"name": "Ann"}}"#).unwrap();
    assert_eq!(
        record,
        Record::new()
            .with("user_id", 7)
            .with("display_name", "Ann")
            .with("email", value!(null))
    );
    assert_eq!(
        to_string(&plan, &record).unwrap(),
        r#"{"userId":7,"profile":{"name":"Ann"}}"#
    );
    assert_eq!(from_slice(&plan, br#"{"userId": 7, "profile": {"name": "Ann"}}"#).unwrap(), record);
}

#[keyplan_testhelpers::test]
fn pretty_output() {
    let plan = account();
    let record = Record::new()
        .with("user_id", 1)
        .with("display_name", "Bo")
        .with("email", "bo@example.com");
    insta::assert_snapshot!(to_string_pretty(&plan, &record).unwrap(), @r#"
    {
      "userId": 1,
      "profile": {
        "name": "Bo",
        "email": "bo@example.com"
      }
    }
    "#);
    let four = to_string_with(&plan, &record, JsonOptions::new().indent("    ")).unwrap();
    assert!(four.contains("\n        \"name\": \"Bo\""), "{four}");
}

#[keyplan_testhelpers::test]
fn syntax_and_decode_errors_are_told_apart() {
    let plan = account();
    let err = from_str(&plan, r#"{"userId": 7,"#).unwrap_err();
    assert!(matches!(err.kind, JsonErrorKind::Syntax { .. }), "{err}");

    let err = from_str(&plan, r#"{"userId": -1, "profile": {"name": "Ann"}}"#).unwrap_err();
    assert!(matches!(err.as_decode(), Some(DecodeError::Mismatch { .. })), "{err}");
    assert_eq!(err.to_string(), "expected uint at $.userId, found number -1");

    let err = from_slice(&plan, b"\xff").unwrap_err();
    assert!(matches!(err.kind, JsonErrorKind::Syntax { line: 0, .. }), "{err}");
}

#[keyplan_testhelpers::test]
fn encode_errors_are_wrapped() {
    let plan = account();
    let err = to_string(&plan, &Record::new().with("user_id", 1)).unwrap_err();
    assert!(matches!(err.kind, JsonErrorKind::Encode(_)), "{err}");
}

#[keyplan_testhelpers::test]
fn sequences_of_element_containers() {
    let plan = StructSchema::new("Scores")
        .field(
            FieldDescriptor::new("scores", ValueKind::array_of(ValueKind::Int))
                .sequence(SequenceElementSpec::new(["v"], ValueKind::Int).default_for_errors(0)),
        )
        .compile()
        .unwrap();
    let record = from_str(&plan, r#"{"scores": [{"v": 1}, {"v": "x"}, {"v": 3}]}"#).unwrap();
    assert_eq!(record.get("scores"), Some(&value!([1, 0, 3])));
    assert_eq!(
        to_string(&plan, &record).unwrap(),
        r#"{"scores":[{"v":1},{"v":0},{"v":3}]}"#
    );
}

#[keyplan_testhelpers::test]
fn enums_through_text() {
    let plan = EnumSchema::new("Shape", Strategy::AdjacentTagged {
        tag: "type".into(),
        content: "data".into(),
    })
    .variant(
        VariantDescriptor::new("circle").value(AssociatedValue::labeled("radius", ValueKind::Float)),
    )
    .compile()
    .unwrap();
    let shape = from_str(&plan, r#"{"type": "circle", "data": {"radius": 2}}"#).unwrap();
    assert_eq!(shape, EnumValue::new("circle", vec![value!(2.0)]));
    assert_eq!(
        to_string(&plan, &shape).unwrap(),
        r#"{"type":"circle","data":{"radius":2.0}}"#
    );
}
