use core::fmt;

use keyplan_value::{FieldType, Number, Value, ValueKind};

use crate::{EnumPlan, KeyCase, SchemaError};

/// The discriminator a variant is selected by.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DiscriminatorKey {
    /// The key-cased variant name.
    #[default]
    Auto,
    /// An explicit string key.
    Str(String),
    /// An integer discriminator.
    Int(i64),
    /// A floating-point discriminator.
    Float(f64),
}

/// A constant payload that selects an untagged variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// `null`
    Null,
    /// `true` or `false`
    Bool(bool),
    /// An integer.
    Int(i64),
    /// A floating-point number.
    Float(f64),
    /// A string.
    Str(String),
}

/// The type of a [`Literal`], which is also the order literal groups are
/// tried in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LiteralKind {
    /// Null literals.
    Null,
    /// Boolean literals.
    Bool,
    /// Integer literals.
    Int,
    /// Floating-point literals.
    Float,
    /// String literals.
    Str,
}

impl Literal {
    /// The literal's type.
    pub fn kind(&self) -> LiteralKind {
        match self {
            Literal::Null => LiteralKind::Null,
            Literal::Bool(_) => LiteralKind::Bool,
            Literal::Int(_) => LiteralKind::Int,
            Literal::Float(_) => LiteralKind::Float,
            Literal::Str(_) => LiteralKind::Str,
        }
    }

    /// The literal as a value.
    pub fn to_value(&self) -> Value {
        match self {
            Literal::Null => Value::Null,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Int(n) => Value::from(*n),
            Literal::Float(n) => Value::from(*n),
            Literal::Str(s) => Value::from(s.as_str()),
        }
    }

    /// Whether `value` is this literal. Numbers compare numerically.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (Literal::Null, Value::Null) => true,
            (Literal::Bool(a), Value::Bool(b)) => a == b,
            (Literal::Int(a), Value::Number(n)) => n.as_i64() == Some(*a),
            (Literal::Float(a), Value::Number(n)) => *n == Number::F64(*a),
            (Literal::Str(a), Value::String(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.to_value(), f)
    }
}

impl LiteralKind {
    /// The value kind a decoder is asked for when trying literals of this
    /// kind.
    pub fn value_kind(self) -> FieldType {
        match self {
            LiteralKind::Null => FieldType::optional(ValueKind::Any),
            LiteralKind::Bool => ValueKind::Bool.into(),
            LiteralKind::Int => ValueKind::Int.into(),
            LiteralKind::Float => ValueKind::Float.into(),
            LiteralKind::Str => ValueKind::String.into(),
        }
    }
}

/// How a variant's associated values are laid out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PayloadShape {
    /// Derived from the associated values.
    #[default]
    Auto,
    /// No payload at all: the discriminator stands alone.
    Nothing,
    /// A `null` payload.
    Null,
    /// An empty array payload.
    EmptyArray,
    /// An empty object payload.
    EmptyObject,
    /// The single associated value, unwrapped.
    SingleValue,
    /// The associated values as a positional array.
    Array,
    /// The associated values as an object with these keys, in order.
    Object(Vec<String>),
}

impl PayloadShape {
    /// Whether the shape carries no associated values.
    pub fn is_empty(&self) -> bool {
        matches!(
            self,
            PayloadShape::Nothing
                | PayloadShape::Null
                | PayloadShape::EmptyArray
                | PayloadShape::EmptyObject
        )
    }
}

/// One associated value of a variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociatedValue {
    /// Optional label; unlabeled values are keyed `_0`, `_1`, ... in object
    /// payloads.
    pub label: Option<String>,
    /// Declared type.
    pub ty: FieldType,
}

impl AssociatedValue {
    /// A labeled value.
    pub fn labeled(label: impl Into<String>, ty: impl Into<FieldType>) -> Self {
        Self {
            label: Some(label.into()),
            ty: ty.into(),
        }
    }

    /// An unlabeled value.
    pub fn unlabeled(ty: impl Into<FieldType>) -> Self {
        Self {
            label: None,
            ty: ty.into(),
        }
    }
}

/// One case of an enum schema.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantDescriptor {
    /// Case name.
    pub name: String,
    /// Associated values, in order.
    pub values: Vec<AssociatedValue>,
    /// Discriminator for keyed strategies.
    pub key: DiscriminatorKey,
    /// Payload layout.
    pub payload: PayloadShape,
    /// Literal payloads for untagged enums.
    pub literals: Vec<Literal>,
    /// Raw value for raw-value enums; derived when absent.
    pub raw_value: Option<Literal>,
}

impl VariantDescriptor {
    /// A case with no associated values and automatic coding.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Vec::new(),
            key: DiscriminatorKey::Auto,
            payload: PayloadShape::Auto,
            literals: Vec::new(),
            raw_value: None,
        }
    }

    /// Appends an associated value.
    pub fn value(mut self, value: AssociatedValue) -> Self {
        self.values.push(value);
        self
    }

    /// Sets the discriminator.
    pub fn key(mut self, key: DiscriminatorKey) -> Self {
        self.key = key;
        self
    }

    /// Sets the payload layout.
    pub fn payload(mut self, payload: PayloadShape) -> Self {
        self.payload = payload;
        self
    }

    /// Adds a literal payload.
    pub fn literal(mut self, literal: Literal) -> Self {
        self.literals.push(literal);
        self
    }

    /// Sets the raw value.
    pub fn raw_value(mut self, raw: Literal) -> Self {
        self.raw_value = Some(raw);
        self
    }
}

/// How variants are told apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// `{"<key>": <payload>}`
    ExternalTagged,
    /// `{"<tag>": "<key>", ...object payload}`
    InternalTagged {
        /// Discriminator key.
        tag: String,
    },
    /// `{"<tag>": "<key>", "<content>": <payload>}`
    AdjacentTagged {
        /// Discriminator key.
        tag: String,
        /// Payload key.
        content: String,
    },
    /// The enum is coded as its raw value.
    RawValueCoded,
    /// No discriminator: payload shapes are tried in a fixed order.
    Unkeyed,
}

/// A value of an enum type.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumValue {
    /// Variant name.
    pub variant: String,
    /// Associated values, in declaration order.
    pub values: Vec<Value>,
}

impl EnumValue {
    /// A variant with the given associated values.
    pub fn new(variant: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            variant: variant.into(),
            values,
        }
    }

    /// A variant with no associated values.
    pub fn unit(variant: impl Into<String>) -> Self {
        Self::new(variant, Vec::new())
    }
}

impl fmt::Display for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.variant)?;
        if self.values.is_empty() {
            return Ok(());
        }
        f.write_str("(")?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{value}")?;
        }
        f.write_str(")")
    }
}

/// A sum type described as a list of variants and a strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumSchema {
    /// Name used in errors.
    pub type_name: String,
    /// Variants in declaration order.
    pub variants: Vec<VariantDescriptor>,
    /// Discrimination strategy.
    pub strategy: Strategy,
    /// How automatic keys are derived from variant names.
    pub key_case: KeyCase,
    /// Value produced when no variant matches.
    pub fallback: Option<EnumValue>,
    /// Type of the raw value under [`Strategy::RawValueCoded`].
    pub raw_type: ValueKind,
}

impl EnumSchema {
    /// An empty schema with the given strategy.
    pub fn new(type_name: impl Into<String>, strategy: Strategy) -> Self {
        Self {
            type_name: type_name.into(),
            variants: Vec::new(),
            strategy,
            key_case: KeyCase::AsIs,
            fallback: None,
            raw_type: ValueKind::String,
        }
    }

    /// Appends a variant.
    pub fn variant(mut self, variant: VariantDescriptor) -> Self {
        self.variants.push(variant);
        self
    }

    /// Sets the key case for automatic keys.
    pub fn key_case(mut self, case: KeyCase) -> Self {
        self.key_case = case;
        self
    }

    /// Sets the value used when nothing matches.
    pub fn fallback(mut self, value: EnumValue) -> Self {
        self.fallback = Some(value);
        self
    }

    /// Sets the raw value type.
    pub fn raw_type(mut self, kind: ValueKind) -> Self {
        self.raw_type = kind;
        self
    }

    /// Compiles the schema.
    pub fn compile(self) -> Result<EnumPlan, SchemaError> {
        EnumPlan::compile(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literals_match_numerically() {
        assert!(Literal::Int(2).matches(&Value::from(2u64)));
        assert!(Literal::Float(2.0).matches(&Value::from(2)));
        assert!(!Literal::Str("2".into()).matches(&Value::from(2)));
        assert!(Literal::Null.matches(&Value::Null));
    }

    #[test]
    fn enum_values_display_like_calls() {
        assert_eq!(EnumValue::unit("none").to_string(), "none");
        assert_eq!(
            EnumValue::new("circle", vec![Value::from(2.0)]).to_string(),
            "circle(2.0)"
        );
    }
}
