use keyplan_core::{
    FieldDescriptor, FieldType, Predicate, StructPlan, StructSchema, Transform, TransformError,
    ValueKind,
};
use keyplan_format::{DecodeError, EncodeError, Record, from_value, to_value};
use keyplan_value::{Value, value};

fn profile() -> StructPlan {
    StructSchema::new("Profile")
        .field(FieldDescriptor::new("name", ValueKind::String).coded_at(["user", "name"]))
        .field(
            FieldDescriptor::new("nick", FieldType::optional(ValueKind::String))
                .coded_at(["user", "extra", "nick"]),
        )
        .field(
            FieldDescriptor::new("age", ValueKind::Int)
                .coded_at(["user", "extra", "age"])
                .default_value(18),
        )
        .compile()
        .unwrap()
}

#[keyplan_testhelpers::test]
fn missing_optional_region_assigns_fallbacks() {
    let plan = profile();
    let record = from_value(&plan, &value!({"user": {"name": "Ann"}})).unwrap();
    assert_eq!(
        record,
        Record::new()
            .with("name", "Ann")
            .with("nick", Value::Null)
            .with("age", 18)
    );
}

#[keyplan_testhelpers::test]
fn null_region_counts_as_missing() {
    let plan = profile();
    let record = from_value(&plan, &value!({"user": {"name": "Ann", "extra": null}})).unwrap();
    assert_eq!(record.get("age"), Some(&value!(18)));
}

#[keyplan_testhelpers::test]
fn region_tolerates_only_what_every_field_tolerates() {
    let plan = profile();
    let err = from_value(&plan, &value!({"user": {"name": "Ann", "extra": 5}})).unwrap_err();
    assert_eq!(
        err.to_string(),
        "expected object at $.user.extra, found number 5"
    );
}

#[keyplan_testhelpers::test]
fn skipped_region_uses_any_static_fallback() {
    let plan = StructSchema::new("Limits")
        .field(
            FieldDescriptor::new("low", ValueKind::Int)
                .coded_at(["range", "low"])
                .default_if_missing(1),
        )
        .field(
            FieldDescriptor::new("high", ValueKind::Int)
                .coded_at(["range", "high"])
                .default_for_errors(9),
        )
        .compile()
        .unwrap();
    let expected = Record::new().with("low", 1).with("high", 9);
    assert_eq!(from_value(&plan, &value!({})).unwrap(), expected);
    assert_eq!(from_value(&plan, &value!({"range": [1, 2]})).unwrap(), expected);
}

#[keyplan_testhelpers::test]
fn required_containers_propagate_errors() {
    let plan = profile();
    let err = from_value(&plan, &value!({"account": {}})).unwrap_err();
    assert_eq!(err.to_string(), "missing value at $.user");
    assert_eq!(err.class(), Some(keyplan_core::FailureClass::Missing));
}

#[keyplan_testhelpers::test]
fn present_null_of_a_required_field_is_a_mismatch() {
    let plan = profile();
    let err = from_value(&plan, &value!({"user": {"name": null}})).unwrap_err();
    assert!(matches!(err, DecodeError::Mismatch { .. }), "{err}");
}

#[keyplan_testhelpers::test]
fn leaf_fallbacks_follow_the_failure_class() {
    let plan = StructSchema::new("Settings")
        .field(FieldDescriptor::new("retries", ValueKind::Int).default_if_missing(3))
        .compile()
        .unwrap();
    assert_eq!(
        from_value(&plan, &value!({})).unwrap().get("retries"),
        Some(&value!(3))
    );
    let err = from_value(&plan, &value!({"retries": "many"})).unwrap_err();
    assert_eq!(
        err.to_string(),
        "expected int at $.retries, found string \"many\""
    );
}

fn parse_int() -> Transform {
    Transform::new("parse_int", |value: Value| {
        let text = value
            .as_str()
            .ok_or_else(|| TransformError::new("expected a string"))?;
        text.trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|err| TransformError::new(err.to_string()))
    })
}

fn to_text() -> Transform {
    Transform::new("to_text", |value: Value| Ok(Value::from(value.to_string())))
}

#[keyplan_testhelpers::test]
fn transforms_and_validators_run_on_decoded_values() {
    let plan = StructSchema::new("Order")
        .field(
            FieldDescriptor::new("quantity", ValueKind::Int)
                .source_type(ValueKind::String)
                .decode_with(parse_int())
                .encode_with(to_text())
                .validate(Predicate::new("quantity > 0", |v| {
                    v.as_i64().is_some_and(|n| n > 0)
                })),
        )
        .compile()
        .unwrap();

    let record = from_value(&plan, &value!({"quantity": " 4 "})).unwrap();
    assert_eq!(record.get("quantity"), Some(&value!(4)));
    assert_eq!(to_value(&plan, &record).unwrap(), value!({"quantity": "4"}));

    let err = from_value(&plan, &value!({"quantity": "0"})).unwrap_err();
    assert_eq!(
        err,
        DecodeError::Validation {
            type_name: "Order".into(),
            field: "quantity".into(),
            predicate: "quantity > 0".into(),
            value: "number 0".into(),
        }
    );

    let err = from_value(&plan, &value!({"quantity": "four"})).unwrap_err();
    assert!(
        matches!(&err, DecodeError::Transform { transform, .. } if transform == "parse_int"),
        "{err}"
    );
}

#[keyplan_testhelpers::test]
fn fallbacks_skip_transforms() {
    let plan = StructSchema::new("Order")
        .field(
            FieldDescriptor::new("quantity", ValueKind::Int)
                .source_type(ValueKind::String)
                .decode_with(parse_int())
                .default_value(1),
        )
        .compile()
        .unwrap();
    let record = from_value(&plan, &value!({"quantity": 9})).unwrap();
    assert_eq!(record.get("quantity"), Some(&value!(1)));
}

#[keyplan_testhelpers::test]
fn constants_and_ignored_fields_never_touch_the_input() {
    let plan = StructSchema::new("Envelope")
        .field(FieldDescriptor::new("version", ValueKind::Int).constant(2))
        .field(FieldDescriptor::new("cache", ValueKind::Object).ignore(Some(value!({}))))
        .field(
            FieldDescriptor::new("seen", ValueKind::Bool)
                .initializer(false)
                .ignore_decoding(),
        )
        .field(FieldDescriptor::new("body", ValueKind::String))
        .compile()
        .unwrap();

    let input = value!({"version": 9, "cache": 1, "seen": true, "body": "hi"});
    let record = from_value(&plan, &input).unwrap();
    assert_eq!(
        record,
        Record::new()
            .with("version", 2)
            .with("cache", value!({}))
            .with("seen", false)
            .with("body", "hi")
    );

    let out = to_value(&plan, &record.clone().with("seen", true)).unwrap();
    assert_eq!(out, value!({"version": 2, "seen": true, "body": "hi"}));
}

#[keyplan_testhelpers::test]
fn conditional_skips_and_encode_only_fields() {
    let plan = StructSchema::new("Page")
        .field(
            FieldDescriptor::new("tags", ValueKind::array_of(ValueKind::String))
                .ignore_encoding_if(Predicate::new("tags.is_empty()", |v| {
                    v.as_array().is_some_and(<[Value]>::is_empty)
                })),
        )
        .field(
            FieldDescriptor::new("draft", FieldType::optional(ValueKind::Bool)).ignore_encoding(),
        )
        .compile()
        .unwrap();

    let record = Record::new()
        .with("tags", Value::Array(Vec::new()))
        .with("draft", true);
    assert_eq!(to_value(&plan, &record).unwrap(), value!({}));

    let record = Record::new().with("tags", value!(["a"]));
    assert_eq!(to_value(&plan, &record).unwrap(), value!({"tags": ["a"]}));
}

#[keyplan_testhelpers::test]
fn encoding_checks_record_values() {
    let plan = profile();
    let err = to_value(&plan, &Record::new().with("age", 3)).unwrap_err();
    assert_eq!(
        err,
        EncodeError::MissingField {
            type_name: "Profile".into(),
            field: "name".into(),
        }
    );

    let err = to_value(&plan, &Record::new().with("name", 7).with("age", 3)).unwrap_err();
    assert!(matches!(err, EncodeError::InvalidValue { .. }), "{err}");
}

#[keyplan_testhelpers::test]
fn encoding_nests_containers_in_declaration_order() {
    let plan = profile();
    let record = Record::new()
        .with("name", "Ann")
        .with("nick", "a")
        .with("age", 30);
    assert_eq!(
        to_value(&plan, &record).unwrap(),
        value!({"user": {"name": "Ann", "extra": {"nick": "a", "age": 30}}})
    );
}
