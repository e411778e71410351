//! Decode executor: runs a plan's decode steps against a decoder.

use keyplan_core::{
    ContainerId, ContainerKeys, FailureClass, FieldDescriptor, FieldId, SequenceStep, Step,
    StructPlan, ValuePolicy,
};
use keyplan_value::{FieldType, Value};

use crate::sequence::decode_sequence;
use crate::{CodingPath, DecodeError, Record, StructuredDecoder, trace};

/// Where the values produced by a step list go.
///
/// Record steps fill one slot per field. Element steps of a sequence push
/// one value per field and element.
pub(crate) trait Slots<'p> {
    /// The fallback rules for `field` in this scope.
    fn policy(&self, field: FieldId) -> ValuePolicy<'p>;

    /// The type the decoder is asked for.
    fn read_type(&self, field: FieldId) -> &'p FieldType;

    /// Stores a value read from the decoder at `path`.
    fn decoded(&mut self, field: FieldId, value: Value, path: CodingPath)
    -> Result<(), DecodeError>;

    /// Stores a fallback value.
    fn fell_back(&mut self, field: FieldId, value: Value);

    /// Decodes a sequence shared by several fields.
    fn sequence<D: StructuredDecoder>(
        &mut self,
        decoder: &mut D,
        parent: &D::Keyed,
        step: &'p SequenceStep,
    ) -> Result<(), DecodeError>;

    /// Where `field` would have been read from.
    fn field_path(&self, field: FieldId) -> CodingPath;
}

/// One slot per schema field.
struct RecordSlots<'p> {
    plan: &'p StructPlan,
    values: Vec<Option<Value>>,
}

impl<'p> RecordSlots<'p> {
    fn new(plan: &'p StructPlan) -> Self {
        let values = plan
            .schema()
            .fields
            .iter()
            .map(|field| {
                if field.is_decoded() {
                    None
                } else {
                    field.undecoded_value()
                }
            })
            .collect();
        Self { plan, values }
    }

    fn into_record(self) -> Result<Record, DecodeError> {
        let mut record = Record::new();
        for ((id, field), value) in self.plan.schema().iter().zip(self.values) {
            let value = match value {
                Some(value) => value,
                None if field.ty.nullable => Value::Null,
                None => {
                    return Err(DecodeError::Missing {
                        path: CodingPath::from_keys(self.plan.path(id)),
                    });
                }
            };
            record.insert(field.name.clone(), value);
        }
        Ok(record)
    }
}

impl<'p> Slots<'p> for RecordSlots<'p> {
    fn policy(&self, field: FieldId) -> ValuePolicy<'p> {
        self.plan.field(field).policy()
    }

    fn read_type(&self, field: FieldId) -> &'p FieldType {
        self.plan.field(field).decoded_type()
    }

    fn decoded(
        &mut self,
        field: FieldId,
        value: Value,
        path: CodingPath,
    ) -> Result<(), DecodeError> {
        let value = finish_value(self.plan.type_name(), self.plan.field(field), value, path)?;
        self.values[field.index()] = Some(value);
        Ok(())
    }

    fn fell_back(&mut self, field: FieldId, value: Value) {
        self.values[field.index()] = Some(value);
    }

    fn sequence<D: StructuredDecoder>(
        &mut self,
        decoder: &mut D,
        parent: &D::Keyed,
        step: &'p SequenceStep,
    ) -> Result<(), DecodeError> {
        decode_sequence(self.plan, decoder, parent, step, &mut self.values)
    }

    fn field_path(&self, field: FieldId) -> CodingPath {
        CodingPath::from_keys(self.plan.path(field))
    }
}

/// Runs a decoded value through the field's transform chain and
/// validators.
///
/// Transforms and validators never run on fallbacks, and `null` of a
/// nullable field is passed through untouched.
pub(crate) fn finish_value(
    type_name: &str,
    field: &FieldDescriptor,
    value: Value,
    path: CodingPath,
) -> Result<Value, DecodeError> {
    if value.is_null() && field.ty.nullable {
        return Ok(Value::Null);
    }

    let mut value = value;
    for transform in &field.decode_transforms {
        value = transform
            .apply(value)
            .map_err(|err| DecodeError::Transform {
                path: path.clone(),
                type_name: type_name.to_string(),
                field: field.name.clone(),
                transform: transform.name().to_string(),
                message: err.message().to_string(),
            })?;
    }
    if !field.decode_transforms.is_empty() {
        value = field.ty.coerce(&value).ok_or_else(|| DecodeError::Transform {
            path: path.clone(),
            type_name: type_name.to_string(),
            field: field.name.clone(),
            transform: field
                .decode_transforms
                .last()
                .map(|t| t.name().to_string())
                .unwrap_or_default(),
            message: format!("produced {}, expected {}", value.describe(), field.ty),
        })?;
    }

    if let Some(predicate) = field.validators.iter().find(|p| !p.test(&value)) {
        return Err(DecodeError::Validation {
            type_name: type_name.to_string(),
            field: field.name.clone(),
            predicate: predicate.source().to_string(),
            value: value.describe(),
        });
    }
    Ok(value)
}

fn open_container<'h, H>(
    open: &'h [Option<H>],
    id: ContainerId,
) -> Result<&'h H, DecodeError> {
    open.get(id.index())
        .and_then(Option::as_ref)
        .ok_or_else(|| DecodeError::Custom {
            path: CodingPath::root(),
            message: format!("container {id} is not open"),
        })
}

/// Assigns static fallbacks to every field inside the optional region that
/// starts at `start`, and returns the index just past its end.
fn skip_region<'p, S: Slots<'p>>(
    steps: &'p [Step],
    start: usize,
    id: ContainerId,
    class: FailureClass,
    slots: &mut S,
) -> Result<usize, DecodeError> {
    let assign = |slots: &mut S, field: FieldId| -> Result<(), DecodeError> {
        let value = slots.policy(field).static_fallback(class).ok_or_else(|| {
            DecodeError::Missing {
                path: slots.field_path(field),
            }
        })?;
        trace!("region {id} skipped, {field:?} falls back to {value}");
        slots.fell_back(field, value);
        Ok(())
    };

    for (offset, step) in steps[start + 1..].iter().enumerate() {
        match step {
            Step::ExitOptionalContainer { id: end } if *end == id => {
                return Ok(start + 1 + offset + 1);
            }
            Step::DecodeValue { field, .. } => assign(slots, *field)?,
            Step::DecodeSequence(seq) => {
                for field in &seq.fields {
                    assign(slots, *field)?;
                }
            }
            _ => {}
        }
    }
    Ok(steps.len())
}

/// Interprets decode steps.
///
/// `root` is an already opened root container, used for sequence elements.
pub(crate) fn run_decode_steps<'p, D, S>(
    decoder: &mut D,
    steps: &'p [Step],
    containers: &[ContainerKeys],
    root: Option<D::Keyed>,
    slots: &mut S,
) -> Result<(), DecodeError>
where
    D: StructuredDecoder,
    S: Slots<'p>,
{
    let mut open: Vec<Option<D::Keyed>> = vec![None; containers.len()];
    let mut index = 0;
    while index < steps.len() {
        match &steps[index] {
            Step::EnterContainer {
                id,
                required,
                requirement,
                parent,
            } => {
                let keys = &containers[id.index()].keys;
                let opened = match (parent, &root) {
                    (None, Some(root)) => Ok(root.clone()),
                    (None, None) => decoder.root_keyed(keys),
                    (Some((parent, key)), _) => {
                        let parent = open_container(&open, *parent)?;
                        decoder.nested_keyed(parent, key, keys)
                    }
                };
                match opened {
                    Ok(handle) => open[id.index()] = Some(handle),
                    Err(err) => {
                        let class = err
                            .class()
                            .filter(|class| !*required && requirement.allows(*class));
                        let Some(class) = class else {
                            return Err(err);
                        };
                        trace!("cannot enter {id} ({class}), skipping its region");
                        index = skip_region(steps, index, *id, class, slots)?;
                        continue;
                    }
                }
            }
            Step::DecodeValue {
                field,
                container,
                key,
            } => {
                let handle = open_container(&open, *container)?;
                match decoder.decode_value(handle, key, slots.read_type(*field)) {
                    Ok(value) => {
                        let path = decoder.container_path(handle).key(key.as_str());
                        trace!("read {field:?} at {path}");
                        slots.decoded(*field, value, path)?;
                    }
                    Err(err) => {
                        let fallback = err
                            .class()
                            .and_then(|class| slots.policy(*field).fallback_for(class));
                        match fallback {
                            Some(value) => {
                                trace!("{field:?} falls back to {value}: {err}");
                                slots.fell_back(*field, value);
                            }
                            None => return Err(err),
                        }
                    }
                }
            }
            Step::DecodeSequence(seq) => {
                let parent = open_container(&open, seq.container)?.clone();
                slots.sequence(decoder, &parent, seq)?;
            }
            Step::ExitOptionalContainer { .. }
            | Step::ExitContainer { .. }
            | Step::EncodeValue { .. }
            | Step::EncodeSequence(_) => {}
        }
        index += 1;
    }
    Ok(())
}

/// Decodes one record with `plan`.
///
/// Either every field gets a value or decoding fails; a partially decoded
/// record is never returned.
pub fn decode_struct<D: StructuredDecoder>(
    plan: &StructPlan,
    decoder: &mut D,
) -> Result<Record, DecodeError> {
    trace!("decoding {}", plan.type_name());
    let mut slots = RecordSlots::new(plan);
    run_decode_steps(
        decoder,
        plan.decode_steps(),
        plan.containers(),
        None,
        &mut slots,
    )?;
    slots.into_record()
}
