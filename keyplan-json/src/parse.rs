use keyplan_value::{Number, Object, Value};

use crate::{JsonError, trace};

/// Parses JSON text into a [`Value`], keeping object key order.
pub fn parse_value(input: &str) -> Result<Value, JsonError> {
    let parsed: serde_json::Value = serde_json::from_str(input)?;
    trace!("parsed {} bytes of JSON", input.len());
    Ok(convert(parsed))
}

fn convert(value: serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => Value::Number(number(&n)),
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(items) => Value::Array(items.into_iter().map(convert).collect()),
        serde_json::Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, item)| (key, convert(item)))
                .collect::<Object>(),
        ),
    }
}

fn number(n: &serde_json::Number) -> Number {
    if let Some(i) = n.as_i64() {
        Number::I64(i)
    } else if let Some(u) = n.as_u64() {
        Number::from_u64(u)
    } else {
        Number::F64(n.as_f64().unwrap_or(f64::NAN))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::JsonErrorKind;
    use keyplan_value::value;

    #[test]
    fn keeps_key_order_and_number_kinds() {
        let parsed =
            parse_value(r#"{"z": 1, "a": [2.5, 18446744073709551615, 3], "m": null}"#).unwrap();
        assert_eq!(
            parsed,
            value!({"z": 1, "a": [2.5, 18446744073709551615u64, 3], "m": null})
        );
        let keys: Vec<_> = parsed.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, ["z", "a", "m"]);
        assert!(matches!(
            parsed.pointer(&["a"]).and_then(|a| a.as_array()).map(|a| a[1].clone()),
            Some(Value::Number(Number::U64(u64::MAX)))
        ));
    }

    #[test]
    fn syntax_errors_carry_a_position() {
        let err = parse_value("{\n  \"a\": tru\n}").unwrap_err();
        let JsonErrorKind::Syntax { line, .. } = err.kind else {
            panic!("unexpected error {err}");
        };
        assert_eq!(line, 2);
        assert!(err.to_string().starts_with("invalid JSON at line 2"), "{err}");
    }
}
