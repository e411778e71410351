//! Fields coded as a sequence of element containers.
//!
//! Several fields may share one sequence: each element container holds one
//! value per field, and each field's value is the array of its per-element
//! values. Per-element failures fall back using the field's
//! [`SequenceElementSpec`]; the field's transform chain then runs once on
//! the whole array.

use keyplan_core::{
    FailureClass, FieldId, SequenceElementSpec, SequenceStep, StructPlan, ValuePolicy,
};
use keyplan_value::{FieldType, Value};

use crate::decode::{Slots, finish_value, run_decode_steps};
use crate::encode::{EncodeSource, encoded_value, run_encode_steps};
use crate::{
    CodingPath, DecodeError, EncodeError, Record, StructuredDecoder, StructuredEncoder, trace,
};

fn element_spec<'p>(
    plan: &'p StructPlan,
    field: FieldId,
) -> Result<&'p SequenceElementSpec, DecodeError> {
    plan.field(field)
        .sequence
        .as_ref()
        .ok_or_else(|| DecodeError::Custom {
            path: CodingPath::from_keys(plan.path(field)),
            message: format!("field `{}` is not coded as a sequence", plan.field(field).name),
        })
}

/// Per-field buffers filled by the element steps.
struct ElementSlots<'p> {
    fields: &'p [FieldId],
    specs: Vec<&'p SequenceElementSpec>,
    buffers: Vec<Vec<Value>>,
    base: CodingPath,
    position: usize,
}

impl<'p> ElementSlots<'p> {
    fn new(
        plan: &'p StructPlan,
        step: &'p SequenceStep,
        base: CodingPath,
    ) -> Result<Self, DecodeError> {
        let specs = step
            .fields
            .iter()
            .map(|field| element_spec(plan, *field))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            fields: &step.fields,
            buffers: vec![Vec::new(); specs.len()],
            specs,
            base,
            position: 0,
        })
    }

    fn slot(&self, field: FieldId) -> usize {
        self.fields
            .iter()
            .position(|f| *f == field)
            .unwrap_or_default()
    }

    /// Element that could not be opened: every field takes its static
    /// element fallback at this position.
    fn fill_static(&mut self, class: FailureClass) -> Result<(), DecodeError> {
        for (slot, spec) in self.specs.iter().enumerate() {
            let value = spec
                .policy()
                .static_fallback(class)
                .ok_or_else(|| DecodeError::Missing {
                    path: self.base.index(self.position),
                })?;
            self.buffers[slot].push(value);
        }
        Ok(())
    }
}

impl<'p> Slots<'p> for ElementSlots<'p> {
    fn policy(&self, field: FieldId) -> ValuePolicy<'p> {
        self.specs[self.slot(field)].policy()
    }

    fn read_type(&self, field: FieldId) -> &'p FieldType {
        &self.specs[self.slot(field)].ty
    }

    fn decoded(
        &mut self,
        field: FieldId,
        value: Value,
        _path: CodingPath,
    ) -> Result<(), DecodeError> {
        let slot = self.slot(field);
        self.buffers[slot].push(value);
        Ok(())
    }

    fn fell_back(&mut self, field: FieldId, value: Value) {
        let slot = self.slot(field);
        self.buffers[slot].push(value);
    }

    fn sequence<D: StructuredDecoder>(
        &mut self,
        _decoder: &mut D,
        _parent: &D::Keyed,
        step: &'p SequenceStep,
    ) -> Result<(), DecodeError> {
        Err(DecodeError::Custom {
            path: self.base.index(self.position).key(step.key.as_str()),
            message: "sequences cannot nest inside sequence elements".to_string(),
        })
    }

    fn field_path(&self, field: FieldId) -> CodingPath {
        let mut path = self.base.index(self.position);
        for key in &self.specs[self.slot(field)].path {
            path = path.key(key.as_str());
        }
        path
    }
}

/// Decodes the sequence at `step.key` inside `parent` and stores one array
/// per field into `values`.
pub(crate) fn decode_sequence<'p, D: StructuredDecoder>(
    plan: &'p StructPlan,
    decoder: &mut D,
    parent: &D::Keyed,
    step: &'p SequenceStep,
    values: &mut [Option<Value>],
) -> Result<(), DecodeError> {
    let base = decoder.container_path(parent).key(step.key.as_str());
    let mut seq = match decoder.nested_sequence(parent, &step.key) {
        Ok(seq) => seq,
        Err(err) => {
            let Some(class) = err.class().filter(|c| step.requirement.allows(*c)) else {
                return Err(err);
            };
            trace!("sequence {base} unavailable ({class}), fields fall back");
            for field in &step.fields {
                let Some(value) = plan.field(*field).policy().static_fallback(class) else {
                    return Err(err);
                };
                values[field.index()] = Some(value);
            }
            return Ok(());
        }
    };

    let mut slots = ElementSlots::new(plan, step, base.clone())?;
    let element_requirement = step.element.requirement();
    while !decoder.is_at_end(&seq) {
        match decoder.next_keyed(&mut seq, step.element.root_keys()) {
            Ok(element) => run_decode_steps(
                decoder,
                &step.element.steps,
                &step.element.containers,
                Some(element),
                &mut slots,
            )?,
            Err(err) => {
                let Some(class) = err.class().filter(|c| element_requirement.allows(*c)) else {
                    return Err(err);
                };
                trace!("element {} unavailable ({class}), skipping", slots.position);
                decoder.skip(&mut seq)?;
                slots.fill_static(class)?;
            }
        }
        slots.position += 1;
    }

    for (field, buffer) in step.fields.iter().zip(slots.buffers) {
        let descriptor = plan.field(*field);
        let value = finish_value(
            plan.type_name(),
            descriptor,
            Value::Array(buffer),
            base.clone(),
        )?;
        values[field.index()] = Some(value);
    }
    Ok(())
}

/// Values of one element position, for the element encode steps.
struct ElementSource<'a> {
    plan: &'a StructPlan,
    fields: &'a [FieldId],
    columns: &'a [Option<Vec<Value>>],
    position: usize,
}

impl EncodeSource for ElementSource<'_> {
    fn value(&mut self, field: FieldId) -> Result<Option<Value>, EncodeError> {
        let Some(slot) = self.fields.iter().position(|f| *f == field) else {
            return Ok(None);
        };
        let Some(column) = &self.columns[slot] else {
            return Ok(None);
        };
        let descriptor = self.plan.field(field);
        let ty = descriptor
            .sequence
            .as_ref()
            .map_or(&descriptor.ty, |spec| &spec.ty);
        let element = &column[self.position];
        if element.is_null() && ty.nullable {
            return Ok(None);
        }
        ty.coerce(element)
            .map(Some)
            .ok_or_else(|| EncodeError::InvalidValue {
                type_name: self.plan.type_name().to_string(),
                field: descriptor.name.clone(),
                message: format!(
                    "element {} is {}, expected {ty}",
                    self.position,
                    element.describe()
                ),
            })
    }

    fn sequence<E: StructuredEncoder>(
        &mut self,
        _encoder: &mut E,
        step: &SequenceStep,
    ) -> Result<(), EncodeError> {
        Err(EncodeError::InvalidValue {
            type_name: self.plan.type_name().to_string(),
            field: step.key.clone(),
            message: "sequences cannot nest inside sequence elements".to_string(),
        })
    }
}

/// Writes the sequence shared by `step.fields`. The sequence is left out
/// when none of its fields has a value.
pub(crate) fn encode_sequence<E: StructuredEncoder>(
    plan: &StructPlan,
    record: &Record,
    step: &SequenceStep,
    encoder: &mut E,
) -> Result<(), EncodeError> {
    let mut columns: Vec<Option<Vec<Value>>> = Vec::with_capacity(step.fields.len());
    for field in &step.fields {
        let column = match encoded_value(plan, *field, record)? {
            None => None,
            Some(Value::Array(items)) => Some(items),
            Some(other) => {
                return Err(EncodeError::InvalidValue {
                    type_name: plan.type_name().to_string(),
                    field: plan.field(*field).name.clone(),
                    message: format!("a sequence field must encode to an array, not {}", other.describe()),
                });
            }
        };
        columns.push(column);
    }

    let mut lengths = step
        .fields
        .iter()
        .zip(&columns)
        .filter_map(|(field, column)| column.as_ref().map(|c| (*field, c.len())));
    let Some((_, len)) = lengths.next() else {
        trace!("sequence {} has no values, omitted", step.key);
        return Ok(());
    };
    if let Some((field, found)) = lengths.find(|(_, l)| *l != len) {
        return Err(EncodeError::SequenceLengthMismatch {
            type_name: plan.type_name().to_string(),
            key: step.key.clone(),
            field: plan.field(field).name.clone(),
            expected: len,
            found,
        });
    }

    encoder.key(&step.key)?;
    encoder.begin_sequence()?;
    for position in 0..len {
        let mut source = ElementSource {
            plan,
            fields: &step.fields,
            columns: &columns,
            position,
        };
        run_encode_steps(&step.element.steps, encoder, &mut source)?;
    }
    encoder.end_sequence()
}
