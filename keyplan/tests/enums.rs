use keyplan::json;
use keyplan::{
    AssociatedValue, EnumPlan, EnumSchema, EnumValue, KeyCase, Literal, PayloadShape, Strategy,
    ValueKind, VariantDescriptor, value,
};

fn notifications(strategy: Strategy) -> EnumPlan {
    EnumSchema::new("Notice", strategy)
        .key_case(KeyCase::SnakeCase)
        .variant(
            VariantDescriptor::new("SignedUp")
                .value(AssociatedValue::labeled("user", ValueKind::String)),
        )
        .variant(VariantDescriptor::new("LoggedOut"))
        .fallback(EnumValue::unit("LoggedOut"))
        .compile()
        .unwrap()
}

fn check(plan: &EnumPlan, text: &str, expected: EnumValue) {
    let decoded = json::from_str(plan, text).unwrap();
    assert_eq!(decoded, expected);
    assert_eq!(json::to_string(plan, &decoded).unwrap(), text);
}

#[keyplan_testhelpers::test]
fn keyed_strategies_through_text() {
    let signed_up = || EnumValue::new("SignedUp", vec![value!("ann")]);

    let plan = notifications(Strategy::ExternalTagged);
    check(&plan, r#"{"signed_up":{"user":"ann"}}"#, signed_up());
    check(&plan, r#"{"logged_out":{}}"#, EnumValue::unit("LoggedOut"));

    let plan = notifications(Strategy::InternalTagged { tag: "kind".into() });
    check(&plan, r#"{"kind":"signed_up","user":"ann"}"#, signed_up());
    check(&plan, r#"{"kind":"logged_out"}"#, EnumValue::unit("LoggedOut"));

    let plan = notifications(Strategy::AdjacentTagged {
        tag: "kind".into(),
        content: "body".into(),
    });
    check(&plan, r#"{"kind":"signed_up","body":{"user":"ann"}}"#, signed_up());
}

#[keyplan_testhelpers::test]
fn unknown_discriminators_use_the_fallback() {
    let cases = [
        (Strategy::ExternalTagged, r#"{"deleted":{}}"#),
        (Strategy::InternalTagged { tag: "kind".into() }, r#"{"kind":"deleted"}"#),
        (Strategy::InternalTagged { tag: "kind".into() }, r#"{"kind":7}"#),
    ];
    for (strategy, text) in cases {
        let plan = notifications(strategy);
        assert_eq!(json::from_str(&plan, text).unwrap(), EnumValue::unit("LoggedOut"), "{text}");
    }
}

#[keyplan_testhelpers::test]
fn raw_and_untagged_through_text() {
    let plan = EnumSchema::new("Priority", Strategy::RawValueCoded)
        .raw_type(ValueKind::String)
        .variant(VariantDescriptor::new("low"))
        .variant(VariantDescriptor::new("urgent").raw_value(Literal::Str("P0".into())))
        .compile()
        .unwrap();
    check(&plan, r#""low""#, EnumValue::unit("low"));
    check(&plan, r#""P0""#, EnumValue::unit("urgent"));

    let plan = EnumSchema::new("Limit", Strategy::Unkeyed)
        .variant(VariantDescriptor::new("none").literal(Literal::Str("none".into())))
        .variant(
            VariantDescriptor::new("bytes")
                .value(AssociatedValue::unlabeled(ValueKind::UInt))
                .payload(PayloadShape::SingleValue),
        )
        .compile()
        .unwrap();
    check(&plan, r#""none""#, EnumValue::unit("none"));
    check(&plan, "1024", EnumValue::new("bytes", vec![value!(1024)]));
    let err = json::from_str(&plan, r#""lots""#).unwrap_err();
    assert_eq!(err.to_string(), r#"Limit: no case matches string "lots""#);
}
