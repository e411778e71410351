use keyplan_core::{
    AssociatedValue, DiscriminatorKey, EnumPlan, EnumSchema, EnumValue, FieldType, Literal,
    PayloadShape, Strategy, ValueKind, VariantDescriptor,
};
use keyplan_format::{DecodeError, EncodeError, from_value, to_value};
use keyplan_value::{Value, value};

fn shapes(strategy: Strategy) -> EnumSchema {
    EnumSchema::new("Shape", strategy)
        .variant(
            VariantDescriptor::new("circle")
                .value(AssociatedValue::labeled("radius", ValueKind::Float)),
        )
        .variant(
            VariantDescriptor::new("rect")
                .value(AssociatedValue::labeled("w", ValueKind::Float))
                .value(AssociatedValue::labeled("h", ValueKind::Float)),
        )
        .variant(VariantDescriptor::new("empty"))
}

fn round_trip(plan: &EnumPlan, wire: Value, expected: EnumValue) {
    let decoded = from_value(plan, &wire).unwrap();
    assert_eq!(decoded, expected);
    assert_eq!(to_value(plan, &decoded).unwrap(), wire);
}

#[keyplan_testhelpers::test]
fn externally_tagged() {
    let plan = shapes(Strategy::ExternalTagged).compile().unwrap();
    round_trip(
        &plan,
        value!({"circle": {"radius": 2.0}}),
        EnumValue::new("circle", vec![value!(2.0)]),
    );
    round_trip(&plan, value!({"empty": {}}), EnumValue::unit("empty"));

    let err = from_value(&plan, &value!({"circle": {}, "rect": {}})).unwrap_err();
    assert!(matches!(err, DecodeError::Mismatch { .. }), "{err}");
}

#[keyplan_testhelpers::test]
fn externally_tagged_bare_keys() {
    let plan = EnumSchema::new("Status", Strategy::ExternalTagged)
        .variant(VariantDescriptor::new("active").payload(PayloadShape::Nothing))
        .variant(
            VariantDescriptor::new("banned")
                .value(AssociatedValue::unlabeled(ValueKind::String)),
        )
        .compile()
        .unwrap();
    round_trip(&plan, value!("active"), EnumValue::unit("active"));
    round_trip(
        &plan,
        value!({"banned": "spam"}),
        EnumValue::new("banned", vec![value!("spam")]),
    );
    let err = from_value(&plan, &value!("idle")).unwrap_err();
    assert_eq!(
        err,
        DecodeError::NoMatchingCase {
            type_name: "Status".into(),
            found: "\"idle\"".into(),
        }
    );
}

#[keyplan_testhelpers::test]
fn internally_tagged() {
    let plan = shapes(Strategy::InternalTagged { tag: "kind".into() })
        .compile()
        .unwrap();
    round_trip(
        &plan,
        value!({"kind": "rect", "w": 1.5, "h": 2.0}),
        EnumValue::new("rect", vec![value!(1.5), value!(2.0)]),
    );
    round_trip(&plan, value!({"kind": "empty"}), EnumValue::unit("empty"));

    let err = from_value(&plan, &value!({"w": 1.0})).unwrap_err();
    assert!(matches!(err, DecodeError::Missing { .. }), "{err}");
}

#[keyplan_testhelpers::test]
fn internally_tagged_single_value_is_flattened() {
    let plan = EnumSchema::new("Event", Strategy::InternalTagged { tag: "type".into() })
        .variant(
            VariantDescriptor::new("login")
                .value(AssociatedValue::unlabeled(ValueKind::map_of(ValueKind::String))),
        )
        .compile()
        .unwrap();
    round_trip(
        &plan,
        value!({"type": "login", "user": "ann"}),
        EnumValue::new("login", vec![value!({"user": "ann"})]),
    );
}

#[keyplan_testhelpers::test]
fn integer_tags() {
    let plan = EnumSchema::new("Code", Strategy::InternalTagged { tag: "code".into() })
        .variant(VariantDescriptor::new("ok").key(DiscriminatorKey::Int(200)))
        .variant(VariantDescriptor::new("named"))
        .compile()
        .unwrap();
    round_trip(&plan, value!({"code": 200}), EnumValue::unit("ok"));
    round_trip(&plan, value!({"code": "named"}), EnumValue::unit("named"));
    let err = from_value(&plan, &value!({"code": 404})).unwrap_err();
    assert_eq!(err.to_string(), "Code: no case matches 404");
}

#[keyplan_testhelpers::test]
fn adjacently_tagged_with_fallback() {
    let plan = shapes(Strategy::AdjacentTagged {
        tag: "t".into(),
        content: "c".into(),
    })
    .fallback(EnumValue::unit("empty"))
    .compile()
    .unwrap();
    round_trip(
        &plan,
        value!({"t": "circle", "c": {"radius": 1.0}}),
        EnumValue::new("circle", vec![value!(1.0)]),
    );
    assert_eq!(
        from_value(&plan, &value!({"t": "hexagon"})).unwrap(),
        EnumValue::unit("empty")
    );
    assert_eq!(from_value(&plan, &value!(3)).unwrap(), EnumValue::unit("empty"));

    let err = from_value(&plan, &value!({"t": "circle", "c": {"radius": "big"}})).unwrap_err();
    assert!(matches!(err, DecodeError::Mismatch { .. }), "{err}");
}

#[keyplan_testhelpers::test]
fn array_payloads_need_the_exact_length() {
    let plan = EnumSchema::new("Point", Strategy::ExternalTagged)
        .variant(
            VariantDescriptor::new("xy")
                .value(AssociatedValue::unlabeled(ValueKind::Int))
                .value(AssociatedValue::unlabeled(ValueKind::Int))
                .payload(PayloadShape::Array),
        )
        .compile()
        .unwrap();
    round_trip(
        &plan,
        value!({"xy": [1, 2]}),
        EnumValue::new("xy", vec![value!(1), value!(2)]),
    );
    let err = from_value(&plan, &value!({"xy": [1, 2, 3]})).unwrap_err();
    assert_eq!(
        err.to_string(),
        "expected array of 2 elements at $.xy[2], found more elements"
    );
}

#[keyplan_testhelpers::test]
fn raw_values() {
    let plan = EnumSchema::new("Level", Strategy::RawValueCoded)
        .raw_type(ValueKind::Int)
        .variant(VariantDescriptor::new("low"))
        .variant(VariantDescriptor::new("high").raw_value(Literal::Int(10)))
        .compile()
        .unwrap();
    round_trip(&plan, value!(0), EnumValue::unit("low"));
    round_trip(&plan, value!(10), EnumValue::unit("high"));
    assert!(matches!(
        from_value(&plan, &value!(5)),
        Err(DecodeError::NoMatchingCase { .. })
    ));
}

#[keyplan_testhelpers::test]
fn untagged_attempts_in_order() {
    let plan = EnumSchema::new("Setting", Strategy::Unkeyed)
        .variant(VariantDescriptor::new("unset").literal(Literal::Null))
        .variant(VariantDescriptor::new("off").literal(Literal::Bool(false)))
        .variant(VariantDescriptor::new("count").value(AssociatedValue::unlabeled(ValueKind::Int)))
        .variant(
            VariantDescriptor::new("range")
                .value(AssociatedValue::unlabeled(ValueKind::Int))
                .value(AssociatedValue::unlabeled(ValueKind::Int))
                .payload(PayloadShape::Array),
        )
        .variant(
            VariantDescriptor::new("named")
                .value(AssociatedValue::labeled("name", ValueKind::String))
                .value(AssociatedValue::labeled(
                    "note",
                    FieldType::optional(ValueKind::String),
                )),
        )
        .compile()
        .unwrap();

    round_trip(&plan, Value::Null, EnumValue::unit("unset"));
    round_trip(&plan, value!(false), EnumValue::unit("off"));
    round_trip(&plan, value!(3), EnumValue::new("count", vec![value!(3)]));
    round_trip(
        &plan,
        value!([1, 5]),
        EnumValue::new("range", vec![value!(1), value!(5)]),
    );
    round_trip(
        &plan,
        value!({"name": "x"}),
        EnumValue::new("named", vec![value!("x"), Value::Null]),
    );

    let err = from_value(&plan, &value!(true)).unwrap_err();
    assert_eq!(err.to_string(), "Setting: no case matches bool true");
}

#[keyplan_testhelpers::test]
fn encoding_checks_the_value() {
    let plan = shapes(Strategy::ExternalTagged).compile().unwrap();
    assert!(matches!(
        to_value(&plan, &EnumValue::unit("hexagon")),
        Err(EncodeError::UnknownVariant { .. })
    ));
    assert!(matches!(
        to_value(&plan, &EnumValue::unit("circle")),
        Err(EncodeError::InvalidValue { .. })
    ));
    assert!(matches!(
        to_value(&plan, &EnumValue::new("circle", vec![value!("big")])),
        Err(EncodeError::InvalidValue { .. })
    ));
}
