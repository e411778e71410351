//! Decoding enum values with a compiled [`EnumPlan`].
//!
//! A failure to identify the case (no discriminator, wrong input shape, an
//! unknown discriminator) produces the plan's fallback value when one is
//! configured. Once a case is identified its payload must decode.

use keyplan_core::{
    CasePlan, DecodeSearch, EnumPlan, EnumValue, KeyGroup, KeySet, ResolvedShape, Strategy,
};
use keyplan_value::{FieldType, Value, ValueKind};

use crate::{CodingPath, DecodeError, StructuredDecoder, trace};

/// The case identified by a discriminator lookup.
enum Lookup {
    Case(usize),
    Unmatched(String),
    Failed(DecodeError),
}

fn unmatched(plan: &EnumPlan, found: String) -> Result<EnumValue, DecodeError> {
    match plan.fallback() {
        Some(fallback) => {
            trace!("{}: nothing matches {found}, using {fallback}", plan.type_name());
            Ok(fallback.clone())
        }
        None => Err(DecodeError::NoMatchingCase {
            type_name: plan.type_name().to_string(),
            found,
        }),
    }
}

fn unidentified(plan: &EnumPlan, err: DecodeError) -> Result<EnumValue, DecodeError> {
    match (plan.fallback(), err.class()) {
        (Some(fallback), Some(_)) => {
            trace!("{}: cannot identify a case ({err}), using {fallback}", plan.type_name());
            Ok(fallback.clone())
        }
        _ => Err(err),
    }
}

fn key_groups(plan: &EnumPlan) -> Result<&[KeyGroup], DecodeError> {
    match plan.search() {
        DecodeSearch::Keyed { groups } => Ok(groups),
        _ => Err(DecodeError::Custom {
            path: CodingPath::root(),
            message: format!("{} is not a keyed enum", plan.type_name()),
        }),
    }
}

/// Decodes the tag at `tag` once per key group, in group order.
fn lookup_tag<D: StructuredDecoder>(
    decoder: &mut D,
    plan: &EnumPlan,
    groups: &[KeyGroup],
    container: &D::Keyed,
    tag: &str,
) -> Lookup {
    for group in groups {
        match decoder.decode_value(container, tag, &group.kind.field_type()) {
            Ok(value) => {
                let found = group.cases.iter().copied().find(|&i| {
                    plan.cases()[i]
                        .key
                        .as_ref()
                        .is_some_and(|key| key.matches(&value))
                });
                if let Some(index) = found {
                    return Lookup::Case(index);
                }
            }
            Err(err @ DecodeError::Missing { .. }) => return Lookup::Failed(err),
            Err(_) => {}
        }
    }
    match decoder.decode_value(container, tag, &FieldType::optional(ValueKind::Any)) {
        Ok(value) => Lookup::Unmatched(value.to_string()),
        Err(err) => Lookup::Failed(err),
    }
}

/// Reads a payload member; an absent nullable member is `null`.
fn member<D: StructuredDecoder>(
    decoder: &mut D,
    container: &D::Keyed,
    key: &str,
    ty: &FieldType,
) -> Result<Value, DecodeError> {
    match decoder.decode_value(container, key, ty) {
        Err(DecodeError::Missing { .. }) if ty.nullable => Ok(Value::Null),
        other => other,
    }
}

fn read_object<D: StructuredDecoder>(
    decoder: &mut D,
    container: &D::Keyed,
    case: &CasePlan,
    keys: &[String],
) -> Result<Vec<Value>, DecodeError> {
    keys.iter()
        .zip(&case.values)
        .map(|(key, ty)| member(decoder, container, key, ty))
        .collect()
}

fn read_array<D: StructuredDecoder>(
    decoder: &mut D,
    seq: &mut D::Sequence,
    case: &CasePlan,
) -> Result<Vec<Value>, DecodeError> {
    let expected = format!("array of {} elements", case.values.len());
    let mut values = Vec::with_capacity(case.values.len());
    for ty in &case.values {
        if decoder.is_at_end(seq) {
            return Err(DecodeError::mismatch(
                decoder.sequence_path(seq),
                &expected,
                "end of array",
            ));
        }
        values.push(decoder.next_value(seq, ty)?);
    }
    if !decoder.is_at_end(seq) {
        return Err(DecodeError::mismatch(
            decoder.sequence_path(seq),
            &expected,
            "more elements",
        ));
    }
    Ok(values)
}

fn object_keys(keys: &[String]) -> KeySet {
    keys.iter().map(String::as_str).collect()
}

/// Reads the payload stored at `key` inside `parent`.
fn payload_at<D: StructuredDecoder>(
    decoder: &mut D,
    parent: &D::Keyed,
    key: &str,
    case: &CasePlan,
) -> Result<Vec<Value>, DecodeError> {
    match &case.shape {
        ResolvedShape::Nothing
        | ResolvedShape::Null
        | ResolvedShape::EmptyArray
        | ResolvedShape::EmptyObject => Ok(Vec::new()),
        ResolvedShape::SingleValue => Ok(vec![member(decoder, parent, key, &case.values[0])?]),
        ResolvedShape::Array => {
            let mut seq = decoder.nested_sequence(parent, key)?;
            read_array(decoder, &mut seq, case)
        }
        ResolvedShape::Object(keys) => {
            let container = decoder.nested_keyed(parent, key, &object_keys(keys))?;
            read_object(decoder, &container, case, keys)
        }
    }
}

fn external<D: StructuredDecoder>(
    plan: &EnumPlan,
    decoder: &mut D,
) -> Result<EnumValue, DecodeError> {
    let cases = plan.cases();
    let bare = cases
        .iter()
        .any(|case| case.shape == ResolvedShape::Nothing);
    if bare && let Ok(Value::String(wire)) = decoder.single_value(&ValueKind::String.into()) {
        let found = cases.iter().find(|case| {
            case.shape == ResolvedShape::Nothing
                && case.key.as_ref().is_some_and(|key| key.matches_wire(&wire))
        });
        return match found {
            Some(case) => Ok(EnumValue::unit(case.name.as_str())),
            None => unmatched(plan, Value::String(wire).to_string()),
        };
    }

    let wire_keys: KeySet = cases
        .iter()
        .filter_map(|case| case.key.as_ref().map(|key| key.wire_key()))
        .collect();
    let root = match decoder.root_keyed(&wire_keys) {
        Ok(root) => root,
        Err(err) => return unidentified(plan, err),
    };
    let keys = decoder.keys(&root);
    let [key] = keys.as_slice() else {
        let err = DecodeError::mismatch(
            decoder.container_path(&root),
            "object with exactly one key",
            format!("object with {} keys", keys.len()),
        );
        return unidentified(plan, err);
    };

    let groups = key_groups(plan)?;
    let found = groups.iter().flat_map(|g| g.cases.iter().copied()).find(|&i| {
        cases[i]
            .key
            .as_ref()
            .is_some_and(|resolved| resolved.matches_wire(key))
    });
    let Some(index) = found else {
        return unmatched(plan, Value::from(key.as_str()).to_string());
    };
    let case = &cases[index];
    trace!("{}: key {key} selects {}", plan.type_name(), case.name);
    let values = payload_at(decoder, &root, key, case)?;
    Ok(EnumValue::new(case.name.as_str(), values))
}

fn internal<D: StructuredDecoder>(
    plan: &EnumPlan,
    decoder: &mut D,
    tag: &str,
) -> Result<EnumValue, DecodeError> {
    let mut keys = vec![tag.to_string()];
    for case in plan.cases() {
        if let ResolvedShape::Object(object) = &case.shape {
            keys.extend(object.iter().cloned());
        }
    }
    let keys: KeySet = keys.into_iter().collect();
    let root = match decoder.root_keyed(&keys) {
        Ok(root) => root,
        Err(err) => return unidentified(plan, err),
    };
    let index = match lookup_tag(decoder, plan, key_groups(plan)?, &root, tag) {
        Lookup::Case(index) => index,
        Lookup::Unmatched(found) => return unmatched(plan, found),
        Lookup::Failed(err) => return unidentified(plan, err),
    };

    let case = &plan.cases()[index];
    trace!("{}: tag selects {}", plan.type_name(), case.name);
    let values = match &case.shape {
        ResolvedShape::Object(keys) => read_object(decoder, &root, case, keys)?,
        ResolvedShape::SingleValue => {
            let Value::Object(mut object) =
                decoder.single_value(&ValueKind::Object.into())?
            else {
                return Err(DecodeError::mismatch(CodingPath::root(), "object", "another value"));
            };
            object.shift_remove(tag);
            let rest = Value::Object(object);
            let ty = &case.values[0];
            let value = ty.coerce(&rest).ok_or_else(|| {
                DecodeError::mismatch(CodingPath::root(), ty, rest.describe())
            })?;
            vec![value]
        }
        _ => Vec::new(),
    };
    Ok(EnumValue::new(case.name.as_str(), values))
}

fn adjacent<D: StructuredDecoder>(
    plan: &EnumPlan,
    decoder: &mut D,
    tag: &str,
    content: &str,
) -> Result<EnumValue, DecodeError> {
    let keys: KeySet = [tag, content].into_iter().collect();
    let root = match decoder.root_keyed(&keys) {
        Ok(root) => root,
        Err(err) => return unidentified(plan, err),
    };
    let index = match lookup_tag(decoder, plan, key_groups(plan)?, &root, tag) {
        Lookup::Case(index) => index,
        Lookup::Unmatched(found) => return unmatched(plan, found),
        Lookup::Failed(err) => return unidentified(plan, err),
    };
    let case = &plan.cases()[index];
    trace!("{}: tag selects {}", plan.type_name(), case.name);
    let values = payload_at(decoder, &root, content, case)?;
    Ok(EnumValue::new(case.name.as_str(), values))
}

fn raw<D: StructuredDecoder>(plan: &EnumPlan, decoder: &mut D) -> Result<EnumValue, DecodeError> {
    let DecodeSearch::Raw { kind, table } = plan.search() else {
        return Err(DecodeError::Custom {
            path: CodingPath::root(),
            message: format!("{} is not a raw-value enum", plan.type_name()),
        });
    };
    let value = match decoder.single_value(&kind.clone().into()) {
        Ok(value) => value,
        Err(err) => return unidentified(plan, err),
    };
    match table.iter().find(|(raw, _)| raw.matches(&value)) {
        Some((_, index)) => Ok(EnumValue::unit(plan.cases()[*index].name.as_str())),
        None => unmatched(plan, value.to_string()),
    }
}

fn unkeyed<D: StructuredDecoder>(
    plan: &EnumPlan,
    decoder: &mut D,
) -> Result<EnumValue, DecodeError> {
    let DecodeSearch::Unkeyed {
        literals,
        single,
        arrays,
        objects,
    } = plan.search()
    else {
        return Err(DecodeError::Custom {
            path: CodingPath::root(),
            message: format!("{} is not an untagged enum", plan.type_name()),
        });
    };
    let cases = plan.cases();

    for group in literals {
        let Ok(value) = decoder.single_value(&group.kind.value_kind()) else {
            continue;
        };
        if let Some((_, index)) = group.entries.iter().find(|(l, _)| l.matches(&value)) {
            return Ok(EnumValue::unit(cases[*index].name.as_str()));
        }
    }

    for &index in single {
        let case = &cases[index];
        if let Ok(value) = decoder.single_value(&case.values[0]) {
            trace!("{}: single value matches {}", plan.type_name(), case.name);
            return Ok(EnumValue::new(case.name.as_str(), vec![value]));
        }
    }

    for &index in arrays {
        let case = &cases[index];
        let Ok(mut seq) = decoder.root_sequence() else {
            break;
        };
        match read_array(decoder, &mut seq, case) {
            Ok(values) => return Ok(EnumValue::new(case.name.as_str(), values)),
            Err(_err) => {
                trace!("{}: {} does not match: {_err}", plan.type_name(), case.name);
            }
        }
    }

    for &index in objects {
        let case = &cases[index];
        let ResolvedShape::Object(keys) = &case.shape else {
            continue;
        };
        let Ok(root) = decoder.root_keyed(&object_keys(keys)) else {
            break;
        };
        match read_object(decoder, &root, case, keys) {
            Ok(values) => return Ok(EnumValue::new(case.name.as_str(), values)),
            Err(_err) => {
                trace!("{}: {} does not match: {_err}", plan.type_name(), case.name);
            }
        }
    }

    let found = decoder
        .single_value(&FieldType::optional(ValueKind::Any))
        .map_or_else(|err| err.to_string(), |value| value.describe());
    unmatched(plan, found)
}

/// Decodes one enum value with `plan`.
pub fn decode_enum<D: StructuredDecoder>(
    plan: &EnumPlan,
    decoder: &mut D,
) -> Result<EnumValue, DecodeError> {
    trace!("decoding enum {}", plan.type_name());
    match plan.strategy() {
        Strategy::ExternalTagged => external(plan, decoder),
        Strategy::InternalTagged { tag } => internal(plan, decoder, tag),
        Strategy::AdjacentTagged { tag, content } => adjacent(plan, decoder, tag, content),
        Strategy::RawValueCoded => raw(plan, decoder),
        Strategy::Unkeyed => unkeyed(plan, decoder),
    }
}
