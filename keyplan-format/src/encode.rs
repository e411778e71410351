//! Encode executor: writes a record through a plan's encode steps.

use keyplan_core::{EncodeCondition, FieldId, SequenceStep, Step, StructPlan};
use keyplan_value::Value;

use crate::sequence::encode_sequence;
use crate::{EncodeError, Record, StructuredEncoder, trace};

/// Supplies the values written by a step list.
pub(crate) trait EncodeSource {
    /// The value to write for `field`, or `None` to leave it out.
    fn value(&mut self, field: FieldId) -> Result<Option<Value>, EncodeError>;

    /// Writes a sequence shared by several fields.
    fn sequence<E: StructuredEncoder>(
        &mut self,
        encoder: &mut E,
        step: &SequenceStep,
    ) -> Result<(), EncodeError>;
}

/// The value of `field` as it is written, or `None` when it is left out.
///
/// Constants are always written. Null and absent values of nullable fields
/// are left out, as are values matched by the field's skip predicate.
pub(crate) fn encoded_value(
    plan: &StructPlan,
    id: FieldId,
    record: &Record,
) -> Result<Option<Value>, EncodeError> {
    let field = plan.field(id);
    if let Some(constant) = &field.constant {
        return Ok(Some(constant.clone()));
    }

    let invalid = |message: String| EncodeError::InvalidValue {
        type_name: plan.type_name().to_string(),
        field: field.name.clone(),
        message,
    };

    let value = match record.get(&field.name) {
        Some(Value::Null) | None if field.ty.nullable => return Ok(None),
        None => {
            return Err(EncodeError::MissingField {
                type_name: plan.type_name().to_string(),
                field: field.name.clone(),
            });
        }
        Some(value) => value,
    };
    let mut value = field.ty.coerce(value).ok_or_else(|| {
        invalid(format!("expected {}, found {}", field.ty, value.describe()))
    })?;

    if let EncodeCondition::If(predicate) = &field.ignore_encoding
        && predicate.test(&value)
    {
        trace!("{} skipped: `{}` holds", field.name, predicate.source());
        return Ok(None);
    }

    for transform in &field.encode_transforms {
        value = transform
            .apply(value)
            .map_err(|err| EncodeError::Transform {
                type_name: plan.type_name().to_string(),
                field: field.name.clone(),
                transform: transform.name().to_string(),
                message: err.message().to_string(),
            })?;
    }
    Ok(Some(value))
}

/// Interprets encode steps.
pub(crate) fn run_encode_steps<E, S>(
    steps: &[Step],
    encoder: &mut E,
    source: &mut S,
) -> Result<(), EncodeError>
where
    E: StructuredEncoder,
    S: EncodeSource,
{
    for step in steps {
        match step {
            Step::EnterContainer { parent, .. } => {
                if let Some((_, key)) = parent {
                    encoder.key(key)?;
                }
                encoder.begin_keyed()?;
            }
            Step::ExitContainer { .. } => encoder.end_keyed()?,
            Step::EncodeValue { field, key, .. } => {
                if let Some(value) = source.value(*field)? {
                    encoder.key(key)?;
                    encoder.value(&value)?;
                }
            }
            Step::EncodeSequence(seq) => source.sequence(encoder, seq)?,
            Step::ExitOptionalContainer { .. }
            | Step::DecodeValue { .. }
            | Step::DecodeSequence(_) => {}
        }
    }
    Ok(())
}

struct RecordSource<'a> {
    plan: &'a StructPlan,
    record: &'a Record,
}

impl EncodeSource for RecordSource<'_> {
    fn value(&mut self, field: FieldId) -> Result<Option<Value>, EncodeError> {
        encoded_value(self.plan, field, self.record)
    }

    fn sequence<E: StructuredEncoder>(
        &mut self,
        encoder: &mut E,
        step: &SequenceStep,
    ) -> Result<(), EncodeError> {
        encode_sequence(self.plan, self.record, step, encoder)
    }
}

/// Encodes `record` with `plan`.
pub fn encode_struct<E: StructuredEncoder>(
    plan: &StructPlan,
    record: &Record,
    encoder: &mut E,
) -> Result<(), EncodeError> {
    trace!("encoding {}", plan.type_name());
    run_encode_steps(
        plan.encode_steps(),
        encoder,
        &mut RecordSource { plan, record },
    )
}
