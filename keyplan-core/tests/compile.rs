use keyplan_core::{
    AssociatedValue, DiscriminatorKey, EnumSchema, FieldDescriptor, FieldType, KeyCase, Literal,
    PayloadShape, SchemaError, SequenceElementSpec, Step, Strategy, StructSchema, ValueKind,
    VariantDescriptor,
};

fn collision_between(first: (&str, &[&str]), second: (&str, &[&str])) -> SchemaError {
    StructSchema::new("Record")
        .field(FieldDescriptor::new(first.0, ValueKind::String).coded_at(first.1.iter().copied()))
        .field(FieldDescriptor::new(second.0, ValueKind::String).coded_at(second.1.iter().copied()))
        .compile()
        .unwrap_err()
}

#[keyplan_testhelpers::test]
fn collisions_are_reported_in_either_declaration_order() {
    let cases: &[(&[&str], &[&str])] = &[
        (&["a"], &["a"]),
        (&["a"], &["a", "b"]),
        (&["a", "b"], &["a", "b", "c", "d"]),
    ];
    for (left, right) in cases {
        for (first, second) in [(("left", *left), ("right", *right)), (("right", *right), ("left", *left))] {
            match collision_between(first, second) {
                SchemaError::PathCollision {
                    first: cited_first,
                    second: cited_second,
                    ..
                } => {
                    assert_eq!(cited_first, first.0);
                    assert_eq!(cited_second, second.0);
                }
                other => panic!("expected a collision, got {other}"),
            }
        }
    }
}

#[keyplan_testhelpers::test]
fn siblings_under_a_shared_prefix_do_not_collide() {
    let plan = StructSchema::new("Record")
        .field(FieldDescriptor::new("a", ValueKind::Int).coded_at(["x", "a"]))
        .field(FieldDescriptor::new("b", ValueKind::Int).coded_at(["x", "b"]))
        .compile()
        .unwrap();
    assert_eq!(plan.containers().len(), 2);
}

#[keyplan_testhelpers::test]
fn repeated_compilation_is_deterministic() {
    let schema = || {
        StructSchema::new("Order")
            .key_case(KeyCase::CamelCase)
            .field(FieldDescriptor::new("order_id", ValueKind::Int))
            .field(
                FieldDescriptor::new("note", FieldType::optional(ValueKind::String))
                    .coded_at(["meta", "note"]),
            )
            .field(
                FieldDescriptor::new("skus", ValueKind::array_of(ValueKind::String))
                    .coded_at(["lines"])
                    .sequence(SequenceElementSpec::new(["sku"], ValueKind::String)),
            )
            .field(
                FieldDescriptor::new("quantities", ValueKind::array_of(ValueKind::Int))
                    .coded_at(["lines"])
                    .sequence(SequenceElementSpec::new(["qty"], ValueKind::Int).default_value(1)),
            )
    };
    let first = schema().compile().unwrap();
    let second = schema().compile().unwrap();
    assert_eq!(first.decode_steps(), second.decode_steps());
    assert_eq!(first.encode_steps(), second.encode_steps());
    assert_eq!(first.to_string(), second.to_string());
    assert!(matches!(
        &first.decode_steps()[1],
        Step::DecodeValue { key, .. } if key == "orderId"
    ));
}

#[keyplan_testhelpers::test]
fn discriminators_must_be_unique_for_every_keyed_strategy() {
    let strategies = [
        Strategy::ExternalTagged,
        Strategy::InternalTagged { tag: "kind".into() },
        Strategy::AdjacentTagged {
            tag: "kind".into(),
            content: "value".into(),
        },
    ];
    for strategy in strategies {
        let err = EnumSchema::new("Event", strategy)
            .variant(VariantDescriptor::new("created").key(DiscriminatorKey::Int(1)))
            .variant(VariantDescriptor::new("removed"))
            .variant(VariantDescriptor::new("deleted").key(DiscriminatorKey::Int(1)))
            .compile()
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::DuplicateDiscriminator {
                type_name: "Event".into(),
                first: "created".into(),
                second: "deleted".into(),
                key: "1".into(),
            }
        );
    }
}

#[keyplan_testhelpers::test]
fn payload_shapes_follow_the_values() {
    let err = EnumSchema::new("Shape", Strategy::ExternalTagged)
        .variant(
            VariantDescriptor::new("circle")
                .value(AssociatedValue::labeled("r", ValueKind::Float))
                .payload(PayloadShape::EmptyObject),
        )
        .compile()
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Shape::circle: a payload-free shape cannot carry associated values"
    );
}

#[keyplan_testhelpers::test]
fn automatic_raw_values_must_fit_in_i64() {
    let err = EnumSchema::new("Level", Strategy::RawValueCoded)
        .raw_type(ValueKind::Int)
        .variant(VariantDescriptor::new("max").raw_value(Literal::Int(i64::MAX)))
        .variant(VariantDescriptor::new("beyond"))
        .compile()
        .unwrap_err();
    assert!(
        matches!(
            &err,
            SchemaError::InvalidCustomization { variant: Some(v), reason, .. }
                if v == "beyond" && reason.contains("overflows")
        ),
        "{err}"
    );

    let plan = EnumSchema::new("Level", Strategy::RawValueCoded)
        .raw_type(ValueKind::Int)
        .variant(VariantDescriptor::new("near").raw_value(Literal::Int(i64::MAX - 1)))
        .variant(VariantDescriptor::new("max"))
        .compile()
        .unwrap();
    assert_eq!(
        plan.case("max").and_then(|(_, case)| case.raw_value.clone()),
        Some(Literal::Int(i64::MAX))
    );
}
