use keyplan_core::{CasePlan, EnumPlan, EnumValue, ResolvedShape, Strategy};
use keyplan_value::Value;

use crate::{EncodeError, StructuredEncoder, trace};

fn invalid(plan: &EnumPlan, case: &CasePlan, message: String) -> EncodeError {
    EncodeError::InvalidValue {
        type_name: plan.type_name().to_string(),
        field: case.name.clone(),
        message,
    }
}

/// Checks the associated values against the case's declared types.
fn checked_values(
    plan: &EnumPlan,
    case: &CasePlan,
    value: &EnumValue,
) -> Result<Vec<Value>, EncodeError> {
    if value.values.len() != case.values.len() {
        return Err(invalid(
            plan,
            case,
            format!(
                "expected {} associated values, found {}",
                case.values.len(),
                value.values.len()
            ),
        ));
    }
    case.values
        .iter()
        .zip(&value.values)
        .enumerate()
        .map(|(i, (ty, v))| {
            ty.coerce(v).ok_or_else(|| {
                invalid(plan, case, format!("value {i} is {}, expected {ty}", v.describe()))
            })
        })
        .collect()
}

fn write_payload<E: StructuredEncoder>(
    encoder: &mut E,
    case: &CasePlan,
    values: &[Value],
) -> Result<(), EncodeError> {
    match &case.shape {
        ResolvedShape::Nothing => Ok(()),
        ResolvedShape::Null => encoder.nil(),
        ResolvedShape::EmptyArray => {
            encoder.begin_sequence()?;
            encoder.end_sequence()
        }
        ResolvedShape::EmptyObject => {
            encoder.begin_keyed()?;
            encoder.end_keyed()
        }
        ResolvedShape::SingleValue => encoder.value(&values[0]),
        ResolvedShape::Array => {
            encoder.begin_sequence()?;
            for value in values {
                encoder.value(value)?;
            }
            encoder.end_sequence()
        }
        ResolvedShape::Object(keys) => {
            encoder.begin_keyed()?;
            write_members(encoder, case, keys, values)?;
            encoder.end_keyed()
        }
    }
}

/// Writes object members, leaving out nulls of nullable values.
fn write_members<E: StructuredEncoder>(
    encoder: &mut E,
    case: &CasePlan,
    keys: &[String],
    values: &[Value],
) -> Result<(), EncodeError> {
    for ((key, ty), value) in keys.iter().zip(&case.values).zip(values) {
        if value.is_null() && ty.nullable {
            continue;
        }
        encoder.key(key)?;
        encoder.value(value)?;
    }
    Ok(())
}

/// Encodes one enum value with `plan`.
pub fn encode_enum<E: StructuredEncoder>(
    plan: &EnumPlan,
    value: &EnumValue,
    encoder: &mut E,
) -> Result<(), EncodeError> {
    let Some((_, case)) = plan.case(&value.variant) else {
        return Err(EncodeError::UnknownVariant {
            type_name: plan.type_name().to_string(),
            variant: value.variant.clone(),
        });
    };
    let values = checked_values(plan, case, value)?;
    trace!("encoding {}::{}", plan.type_name(), case.name);

    let key = || {
        case.key
            .as_ref()
            .ok_or_else(|| invalid(plan, case, "the case has no discriminator".to_string()))
    };

    match plan.strategy() {
        Strategy::ExternalTagged => {
            let wire = key()?.wire_key();
            if case.shape == ResolvedShape::Nothing {
                return encoder.value(&Value::String(wire));
            }
            encoder.begin_keyed()?;
            encoder.key(&wire)?;
            write_payload(encoder, case, &values)?;
            encoder.end_keyed()
        }
        Strategy::InternalTagged { tag } => {
            encoder.begin_keyed()?;
            encoder.key(tag)?;
            encoder.value(&key()?.to_value())?;
            match &case.shape {
                ResolvedShape::Object(keys) => write_members(encoder, case, keys, &values)?,
                ResolvedShape::SingleValue => {
                    let Value::Object(object) = &values[0] else {
                        return Err(invalid(
                            plan,
                            case,
                            format!(
                                "an internally tagged payload must be an object, not {}",
                                values[0].describe()
                            ),
                        ));
                    };
                    for (member, value) in object.iter().filter(|(k, _)| *k != tag) {
                        encoder.key(member)?;
                        encoder.value(value)?;
                    }
                }
                _ => {}
            }
            encoder.end_keyed()
        }
        Strategy::AdjacentTagged { tag, content } => {
            encoder.begin_keyed()?;
            encoder.key(tag)?;
            encoder.value(&key()?.to_value())?;
            if case.shape != ResolvedShape::Nothing {
                encoder.key(content)?;
                write_payload(encoder, case, &values)?;
            }
            encoder.end_keyed()
        }
        Strategy::RawValueCoded => match &case.raw_value {
            Some(raw) => encoder.value(&raw.to_value()),
            None => Err(invalid(plan, case, "the case has no raw value".to_string())),
        },
        Strategy::Unkeyed => match case.literals.first() {
            Some(literal) => encoder.value(&literal.to_value()),
            None => write_payload(encoder, case, &values),
        },
    }
}
