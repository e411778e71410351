use std::borrow::Cow;
use std::sync::Arc;
use core::fmt;

use keyplan_value::{FieldType, Value};

use crate::{KeyCase, Requirement, TransformError, ValuePolicy};

/// Index of a field inside its [`StructSchema`](crate::StructSchema).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(pub usize);

impl FieldId {
    /// The position of the field in declaration order.
    pub const fn index(self) -> usize {
        self.0
    }
}

type TransformFn = dyn Fn(Value) -> Result<Value, TransformError> + Send + Sync;
type PredicateFn = dyn Fn(&Value) -> bool + Send + Sync;

/// One unary step of a transform chain.
#[derive(Clone)]
pub struct Transform {
    name: Cow<'static, str>,
    func: Arc<TransformFn>,
}

impl Transform {
    /// Wraps a function as a named transform step.
    pub fn new<F>(name: impl Into<Cow<'static, str>>, func: F) -> Self
    where
        F: Fn(Value) -> Result<Value, TransformError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    /// Name used in errors and plan dumps.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the transform.
    pub fn apply(&self, value: Value) -> Result<Value, TransformError> {
        (self.func)(value)
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Transform").field(&self.name).finish()
    }
}

/// A boolean check over a value, carrying its source text for errors.
#[derive(Clone)]
pub struct Predicate {
    source: Cow<'static, str>,
    func: Arc<PredicateFn>,
}

impl Predicate {
    /// Wraps a function; `source` is how the predicate reads in errors.
    pub fn new<F>(source: impl Into<Cow<'static, str>>, func: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self {
            source: source.into(),
            func: Arc::new(func),
        }
    }

    /// The predicate's source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluates the predicate.
    pub fn test(&self, value: &Value) -> bool {
        (self.func)(value)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Predicate").field(&self.source).finish()
    }
}

/// When a field is left out of the encoded output.
#[derive(Debug, Clone, Default)]
pub enum EncodeCondition {
    /// The field is always written.
    #[default]
    Never,
    /// The field is never written.
    Always,
    /// The field is skipped whenever the predicate holds for its value.
    If(Predicate),
}

/// Per-element coding of a sequence field whose elements are structured
/// containers.
///
/// The field's own value is the whole sequence; this describes where each
/// element's contribution lives inside one element container and how a
/// single element position falls back.
#[derive(Debug, Clone)]
pub struct SequenceElementSpec {
    /// Path inside one element container.
    pub path: Vec<String>,
    /// Type of the value read at `path`.
    pub ty: FieldType,
    /// Which per-element failures fall back.
    pub requirement: Requirement,
    /// Per-element fallback when the value is absent.
    pub fallback_on_missing: Option<Value>,
    /// Per-element fallback when the value has the wrong type.
    pub fallback_on_mismatch: Option<Value>,
}

impl SequenceElementSpec {
    /// Elements are read from `path` inside each element container.
    pub fn new<I, S>(path: I, ty: impl Into<FieldType>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path: path.into_iter().map(Into::into).collect(),
            ty: ty.into(),
            requirement: Requirement::Always,
            fallback_on_missing: None,
            fallback_on_mismatch: None,
        }
    }

    /// Use `value` for elements lacking the key.
    pub fn default_if_missing(mut self, value: impl Into<Value>) -> Self {
        self.fallback_on_missing = Some(value.into());
        self.requirement = self.requirement.widen(Requirement::AllowMissing);
        self
    }

    /// Use `value` for elements whose value has the wrong type.
    pub fn default_for_errors(mut self, value: impl Into<Value>) -> Self {
        self.fallback_on_mismatch = Some(value.into());
        self.requirement = self.requirement.widen(Requirement::AllowMismatch);
        self
    }

    /// Use `value` for any recoverable per-element failure.
    pub fn default_value(self, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.default_if_missing(value.clone()).default_for_errors(value)
    }

    /// The per-element fallback rules.
    pub fn policy(&self) -> ValuePolicy<'_> {
        ValuePolicy {
            ty: &self.ty,
            requirement: self.requirement,
            on_missing: self.fallback_on_missing.as_ref(),
            on_mismatch: self.fallback_on_mismatch.as_ref(),
        }
    }
}

/// One field eligible for coding.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    /// Field identifier.
    pub name: String,
    /// Declared type of the field, after the decode transform chain.
    pub ty: FieldType,
    /// Type read from the decoder before the decode transform chain.
    /// Defaults to `ty`.
    pub source_type: Option<FieldType>,
    /// Explicit coding path. Defaults to the key-cased name.
    pub path: Option<Vec<String>>,
    /// Which decode failures fall back.
    pub requirement: Requirement,
    /// Fallback when the key is absent.
    pub fallback_on_missing: Option<Value>,
    /// Fallback when the value has the wrong type.
    pub fallback_on_mismatch: Option<Value>,
    /// Steps from the source type to `ty`.
    pub decode_transforms: Vec<Transform>,
    /// Steps from `ty` back to the source type.
    pub encode_transforms: Vec<Transform>,
    /// Checks run on the decoded value, in order.
    pub validators: Vec<Predicate>,
    /// Excluded from coding entirely.
    pub ignored: bool,
    /// Never decoded, still encoded.
    pub ignore_decoding: bool,
    /// When the field is left out of the encoded output.
    pub ignore_encoding: EncodeCondition,
    /// Declared initial value, used whenever the field is not decoded.
    pub initializer: Option<Value>,
    /// Fixed value: never decoded, always encoded.
    pub constant: Option<Value>,
    /// Present when the field is a sequence of structured elements.
    pub sequence: Option<SequenceElementSpec>,
}

impl FieldDescriptor {
    /// A required field coded at its own (key-cased) name.
    pub fn new(name: impl Into<String>, ty: impl Into<FieldType>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            source_type: None,
            path: None,
            requirement: Requirement::Always,
            fallback_on_missing: None,
            fallback_on_mismatch: None,
            decode_transforms: Vec::new(),
            encode_transforms: Vec::new(),
            validators: Vec::new(),
            ignored: false,
            ignore_decoding: false,
            ignore_encoding: EncodeCondition::Never,
            initializer: None,
            constant: None,
            sequence: None,
        }
    }

    /// Codes the field at an explicit nested path.
    pub fn coded_at<I, S>(mut self, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.path = Some(path.into_iter().map(Into::into).collect());
        self
    }

    /// Reads `ty` from the decoder and runs the decode chain to reach the
    /// field type.
    pub fn source_type(mut self, ty: impl Into<FieldType>) -> Self {
        self.source_type = Some(ty.into());
        self
    }

    /// Use `value` when the key is absent.
    pub fn default_if_missing(mut self, value: impl Into<Value>) -> Self {
        self.fallback_on_missing = Some(value.into());
        self.requirement = self.requirement.widen(Requirement::AllowMissing);
        self
    }

    /// Use `value` when the stored value has the wrong type.
    pub fn default_for_errors(mut self, value: impl Into<Value>) -> Self {
        self.fallback_on_mismatch = Some(value.into());
        self.requirement = self.requirement.widen(Requirement::AllowMismatch);
        self
    }

    /// Use `value` for either recoverable failure.
    pub fn default_value(self, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.default_if_missing(value.clone()).default_for_errors(value)
    }

    /// Appends a decode step.
    pub fn decode_with(mut self, transform: Transform) -> Self {
        self.decode_transforms.push(transform);
        self
    }

    /// Appends an encode step.
    pub fn encode_with(mut self, transform: Transform) -> Self {
        self.encode_transforms.push(transform);
        self
    }

    /// Appends a validator.
    pub fn validate(mut self, predicate: Predicate) -> Self {
        self.validators.push(predicate);
        self
    }

    /// Excludes the field from coding; decoding yields `initializer`.
    pub fn ignore(mut self, initializer: Option<Value>) -> Self {
        self.ignored = true;
        self.initializer = initializer.or(self.initializer);
        self
    }

    /// Declares an initial value.
    pub fn initializer(mut self, value: impl Into<Value>) -> Self {
        self.initializer = Some(value.into());
        self
    }

    /// Makes the field a constant.
    pub fn constant(mut self, value: impl Into<Value>) -> Self {
        self.constant = Some(value.into());
        self
    }

    /// Skips the field when decoding.
    pub fn ignore_decoding(mut self) -> Self {
        self.ignore_decoding = true;
        self
    }

    /// Skips the field when encoding.
    pub fn ignore_encoding(mut self) -> Self {
        self.ignore_encoding = EncodeCondition::Always;
        self
    }

    /// Skips the field when encoding whenever `predicate` holds.
    pub fn ignore_encoding_if(mut self, predicate: Predicate) -> Self {
        self.ignore_encoding = EncodeCondition::If(predicate);
        self
    }

    /// Codes the field as a sequence of structured elements.
    pub fn sequence(mut self, spec: SequenceElementSpec) -> Self {
        self.sequence = Some(spec);
        self
    }

    /// The path the field is coded at under `case`.
    pub fn resolved_path(&self, case: KeyCase) -> Vec<String> {
        match &self.path {
            Some(path) => path.clone(),
            None => vec![case.apply(&self.name)],
        }
    }

    /// The type read from the decoder.
    pub fn decoded_type(&self) -> &FieldType {
        self.source_type.as_ref().unwrap_or(&self.ty)
    }

    /// The field-level fallback rules.
    pub fn policy(&self) -> ValuePolicy<'_> {
        ValuePolicy {
            ty: &self.ty,
            requirement: self.requirement,
            on_missing: self.fallback_on_missing.as_ref(),
            on_mismatch: self.fallback_on_mismatch.as_ref(),
        }
    }

    /// Whether the decoder is consulted for this field.
    pub fn is_decoded(&self) -> bool {
        !self.ignored && !self.ignore_decoding && self.constant.is_none()
    }

    /// Whether the field can appear in encoded output.
    pub fn is_encoded(&self) -> bool {
        !self.ignored && !matches!(self.ignore_encoding, EncodeCondition::Always)
    }

    /// The value a field gets without consulting the decoder.
    pub fn undecoded_value(&self) -> Option<Value> {
        self.constant
            .clone()
            .or_else(|| self.initializer.clone())
            .or_else(|| self.ty.nullable.then_some(Value::Null))
    }
}
