//! Discriminator plans for enum schemas.
//!
//! Compilation resolves every variant's key and payload shape, checks them
//! against the strategy, and lays out the order decoding tries variants in.

use core::fmt;
use std::collections::HashSet;

use keyplan_value::{FieldType, Number, Value, ValueKind};

use crate::{
    DiscriminatorKey, EnumSchema, EnumValue, Literal, LiteralKind, PayloadShape, SchemaError,
    Strategy, VariantDescriptor, debug,
};

/// A discriminator after automatic keys are resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedKey {
    /// String discriminator.
    Str(String),
    /// Integer discriminator.
    Int(i64),
    /// Floating-point discriminator.
    Float(f64),
}

/// The type of a [`ResolvedKey`]; decoding tries groups in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyKind {
    /// String keys.
    Str,
    /// Integer keys.
    Int,
    /// Floating-point keys.
    Float,
}

impl KeyKind {
    /// The type a tag of this kind is decoded as.
    pub fn field_type(self) -> FieldType {
        match self {
            KeyKind::Str => ValueKind::String.into(),
            KeyKind::Int => ValueKind::Int.into(),
            KeyKind::Float => ValueKind::Float.into(),
        }
    }
}

impl ResolvedKey {
    /// The key's type.
    pub fn kind(&self) -> KeyKind {
        match self {
            ResolvedKey::Str(_) => KeyKind::Str,
            ResolvedKey::Int(_) => KeyKind::Int,
            ResolvedKey::Float(_) => KeyKind::Float,
        }
    }

    /// The key written as a tag value.
    pub fn to_value(&self) -> Value {
        match self {
            ResolvedKey::Str(s) => Value::from(s.as_str()),
            ResolvedKey::Int(n) => Value::from(*n),
            ResolvedKey::Float(n) => Value::from(*n),
        }
    }

    /// The key written as an object key.
    pub fn wire_key(&self) -> String {
        match self {
            ResolvedKey::Str(s) => s.clone(),
            ResolvedKey::Int(n) => n.to_string(),
            ResolvedKey::Float(n) => Number::F64(*n).to_string(),
        }
    }

    /// Whether a decoded tag value selects this key.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (ResolvedKey::Str(a), Value::String(b)) => a == b,
            (ResolvedKey::Int(a), Value::Number(n)) => n.as_i64() == Some(*a),
            (ResolvedKey::Float(a), Value::Number(n)) => *n == Number::F64(*a),
            _ => false,
        }
    }

    /// Whether an object key selects this key.
    pub fn matches_wire(&self, key: &str) -> bool {
        match self {
            ResolvedKey::Str(s) => s == key,
            ResolvedKey::Int(n) => key.parse::<i64>().is_ok_and(|k| k == *n),
            ResolvedKey::Float(n) => key.parse::<f64>().is_ok_and(|k| k == *n),
        }
    }

    fn conflicts_with(&self, other: &ResolvedKey, as_object_keys: bool) -> bool {
        if as_object_keys {
            return self.wire_key() == other.wire_key();
        }
        match (self, other) {
            (ResolvedKey::Str(a), ResolvedKey::Str(b)) => a == b,
            (ResolvedKey::Str(_), _) | (_, ResolvedKey::Str(_)) => false,
            _ => self.matches(&other.to_value()),
        }
    }
}

impl fmt::Display for ResolvedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.to_value(), f)
    }
}

/// A payload layout after `Auto` is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedShape {
    /// Nothing besides the discriminator.
    Nothing,
    /// `null`
    Null,
    /// `[]`
    EmptyArray,
    /// `{}`
    EmptyObject,
    /// The single associated value.
    SingleValue,
    /// A positional array of the associated values.
    Array,
    /// An object with one key per associated value.
    Object(Vec<String>),
}

impl fmt::Display for ResolvedShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedShape::Nothing => f.write_str("nothing"),
            ResolvedShape::Null => f.write_str("null"),
            ResolvedShape::EmptyArray => f.write_str("[]"),
            ResolvedShape::EmptyObject => f.write_str("{}"),
            ResolvedShape::SingleValue => f.write_str("value"),
            ResolvedShape::Array => f.write_str("array"),
            ResolvedShape::Object(keys) => write!(f, "{{{}}}", keys.join(", ")),
        }
    }
}

/// How one variant is coded.
#[derive(Debug, Clone, PartialEq)]
pub struct CasePlan {
    /// Variant name.
    pub name: String,
    /// Types of the associated values.
    pub values: Vec<FieldType>,
    /// Discriminator, for keyed strategies.
    pub key: Option<ResolvedKey>,
    /// Payload layout.
    pub shape: ResolvedShape,
    /// Literal payloads, for untagged enums.
    pub literals: Vec<Literal>,
    /// Raw value, for raw-value enums.
    pub raw_value: Option<Literal>,
}

/// Cases whose discriminators share a type, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyGroup {
    /// Discriminator type.
    pub kind: KeyKind,
    /// Case indices.
    pub cases: Vec<usize>,
}

/// Literal payloads of one type, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct LiteralGroup {
    /// Literal type.
    pub kind: LiteralKind,
    /// Each literal with the case it selects.
    pub entries: Vec<(Literal, usize)>,
}

/// The order decoding tries variants in.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeSearch {
    /// Decode the discriminator, then look it up group by group.
    Keyed {
        /// Non-empty groups, strings first.
        groups: Vec<KeyGroup>,
    },
    /// Decode the raw value and look it up.
    Raw {
        /// Raw value type.
        kind: ValueKind,
        /// Raw values with the case each selects.
        table: Vec<(Literal, usize)>,
    },
    /// Try literal payloads, then single values, arrays and objects.
    Unkeyed {
        /// Literal groups, in [`LiteralKind`] order.
        literals: Vec<LiteralGroup>,
        /// Cases coded as a single value.
        single: Vec<usize>,
        /// Cases coded as an array.
        arrays: Vec<usize>,
        /// Cases coded as an object.
        objects: Vec<usize>,
    },
}

/// A compiled enum schema.
#[derive(Debug, Clone)]
pub struct EnumPlan {
    schema: EnumSchema,
    cases: Vec<CasePlan>,
    search: DecodeSearch,
}

struct Compiler<'a> {
    schema: &'a EnumSchema,
}

impl Compiler<'_> {
    fn invalid(&self, variant: Option<&VariantDescriptor>, reason: impl Into<String>) -> SchemaError {
        SchemaError::InvalidCustomization {
            type_name: self.schema.type_name.clone(),
            variant: variant.map(|v| v.name.clone()),
            reason: reason.into(),
        }
    }

    fn payload_mismatch(&self, variant: &VariantDescriptor, reason: &str) -> SchemaError {
        SchemaError::PayloadMismatch {
            type_name: self.schema.type_name.clone(),
            variant: variant.name.clone(),
            reason: reason.to_string(),
        }
    }

    fn duplicate(&self, first: usize, second: usize, key: impl fmt::Display) -> SchemaError {
        SchemaError::DuplicateDiscriminator {
            type_name: self.schema.type_name.clone(),
            first: self.schema.variants[first].name.clone(),
            second: self.schema.variants[second].name.clone(),
            key: key.to_string(),
        }
    }

    fn shape(&self, variant: &VariantDescriptor) -> Result<ResolvedShape, SchemaError> {
        let count = variant.values.len();
        let shape = match &variant.payload {
            PayloadShape::Auto if count == 0 => ResolvedShape::EmptyObject,
            PayloadShape::Auto if count == 1 && variant.values[0].label.is_none() => {
                ResolvedShape::SingleValue
            }
            PayloadShape::Auto => ResolvedShape::Object(
                variant
                    .values
                    .iter()
                    .enumerate()
                    .map(|(i, v)| v.label.clone().unwrap_or_else(|| format!("_{i}")))
                    .collect(),
            ),
            empty if empty.is_empty() && count > 0 => {
                return Err(self.payload_mismatch(
                    variant,
                    "a payload-free shape cannot carry associated values",
                ));
            }
            PayloadShape::Nothing => ResolvedShape::Nothing,
            PayloadShape::Null => ResolvedShape::Null,
            PayloadShape::EmptyArray => ResolvedShape::EmptyArray,
            PayloadShape::EmptyObject => ResolvedShape::EmptyObject,
            _ if count == 0 => {
                return Err(self.payload_mismatch(
                    variant,
                    "a payload shape needs at least one associated value",
                ));
            }
            PayloadShape::SingleValue if count != 1 => {
                return Err(self.payload_mismatch(
                    variant,
                    "a single-value payload needs exactly one associated value",
                ));
            }
            PayloadShape::SingleValue => ResolvedShape::SingleValue,
            PayloadShape::Array => ResolvedShape::Array,
            PayloadShape::Object(keys) => {
                if keys.len() != count {
                    return Err(SchemaError::ObjectKeyCount {
                        type_name: self.schema.type_name.clone(),
                        variant: variant.name.clone(),
                        expected: count,
                        found: keys.len(),
                    });
                }
                ResolvedShape::Object(keys.clone())
            }
        };
        if let ResolvedShape::Object(keys) = &shape {
            let mut seen = HashSet::new();
            if let Some(key) = keys.iter().find(|k| !seen.insert(k.as_str())) {
                return Err(SchemaError::DuplicatePayloadKey {
                    type_name: self.schema.type_name.clone(),
                    variant: variant.name.clone(),
                    key: key.clone(),
                });
            }
        }
        Ok(shape)
    }

    fn key(&self, variant: &VariantDescriptor) -> ResolvedKey {
        match &variant.key {
            DiscriminatorKey::Auto => ResolvedKey::Str(self.schema.key_case.apply(&variant.name)),
            DiscriminatorKey::Str(s) => ResolvedKey::Str(s.clone()),
            DiscriminatorKey::Int(n) => ResolvedKey::Int(*n),
            DiscriminatorKey::Float(n) => ResolvedKey::Float(*n),
        }
    }

    fn keyed(&self, as_object_keys: bool) -> Result<(Vec<CasePlan>, DecodeSearch), SchemaError> {
        let mut cases: Vec<CasePlan> = Vec::new();
        for variant in &self.schema.variants {
            if !variant.literals.is_empty() {
                return Err(self.invalid(
                    Some(variant),
                    "literal payloads are only valid for untagged enums",
                ));
            }
            if variant.raw_value.is_some() {
                return Err(self.invalid(
                    Some(variant),
                    "raw values are only valid for raw-value enums",
                ));
            }
            let key = self.key(variant);
            if let Some(first) = cases
                .iter()
                .position(|c| c.key.as_ref().is_some_and(|k| k.conflicts_with(&key, as_object_keys)))
            {
                return Err(self.duplicate(first, cases.len(), &key));
            }
            let shape = self.shape(variant)?;
            if let Strategy::InternalTagged { tag } = &self.schema.strategy {
                match &shape {
                    ResolvedShape::Array | ResolvedShape::Null | ResolvedShape::EmptyArray => {
                        return Err(self.invalid(
                            Some(variant),
                            "internally tagged payloads must be objects",
                        ));
                    }
                    ResolvedShape::Object(keys) if keys.contains(tag) => {
                        return Err(SchemaError::KeyConflictsWithDiscriminator {
                            type_name: self.schema.type_name.clone(),
                            variant: variant.name.clone(),
                            key: tag.clone(),
                        });
                    }
                    _ => {}
                }
            }
            cases.push(CasePlan {
                name: variant.name.clone(),
                values: variant.values.iter().map(|v| v.ty.clone()).collect(),
                key: Some(key),
                shape,
                literals: Vec::new(),
                raw_value: None,
            });
        }

        let groups = [KeyKind::Str, KeyKind::Int, KeyKind::Float]
            .into_iter()
            .map(|kind| KeyGroup {
                kind,
                cases: cases
                    .iter()
                    .enumerate()
                    .filter(|(_, c)| c.key.as_ref().is_some_and(|k| k.kind() == kind))
                    .map(|(i, _)| i)
                    .collect(),
            })
            .filter(|group| !group.cases.is_empty())
            .collect();
        Ok((cases, DecodeSearch::Keyed { groups }))
    }

    fn raw(&self) -> Result<(Vec<CasePlan>, DecodeSearch), SchemaError> {
        let kind = &self.schema.raw_type;
        if !matches!(kind, ValueKind::String | ValueKind::Int | ValueKind::Float) {
            return Err(self.invalid(
                None,
                format!("raw values must be strings or numbers, not {kind}"),
            ));
        }

        let mut cases: Vec<CasePlan> = Vec::new();
        let mut table: Vec<(Literal, usize)> = Vec::new();
        let mut previous: Option<i64> = None;
        for (index, variant) in self.schema.variants.iter().enumerate() {
            let customized = !variant.values.is_empty()
                || variant.key != DiscriminatorKey::Auto
                || variant.payload != PayloadShape::Auto
                || !variant.literals.is_empty();
            if customized {
                return Err(self.invalid(
                    Some(variant),
                    "raw-value enums take no associated values, keys, payloads or literals",
                ));
            }
            let raw = match (kind, &variant.raw_value) {
                (ValueKind::String, Some(raw @ Literal::Str(_))) => raw.clone(),
                (ValueKind::String, None) => Literal::Str(variant.name.clone()),
                (ValueKind::Int, Some(raw @ Literal::Int(_))) => raw.clone(),
                (ValueKind::Int, None) => match previous.map_or(Some(0), |p| p.checked_add(1)) {
                    Some(next) => Literal::Int(next),
                    None => {
                        return Err(
                            self.invalid(Some(variant), "automatic raw value overflows i64")
                        );
                    }
                },
                (ValueKind::Float, Some(Literal::Float(n))) => Literal::Float(*n),
                (ValueKind::Float, Some(Literal::Int(n))) => Literal::Float(*n as f64),
                (ValueKind::Float, None) => {
                    return Err(self.invalid(
                        Some(variant),
                        "floating-point raw values must be given explicitly",
                    ));
                }
                (_, raw) => {
                    let raw = raw.as_ref().map_or_else(String::new, |r| format!("{r} "));
                    return Err(self.invalid(
                        Some(variant),
                        format!("raw value {raw}does not have the raw type {kind}"),
                    ));
                }
            };
            if let Literal::Int(n) = raw {
                previous = Some(n);
            }
            if let Some((_, first)) = table.iter().find(|(existing, _)| existing == &raw) {
                return Err(self.duplicate(*first, index, &raw));
            }
            table.push((raw.clone(), index));
            cases.push(CasePlan {
                name: variant.name.clone(),
                values: Vec::new(),
                key: None,
                shape: ResolvedShape::Nothing,
                literals: Vec::new(),
                raw_value: Some(raw),
            });
        }
        Ok((
            cases,
            DecodeSearch::Raw {
                kind: kind.clone(),
                table,
            },
        ))
    }

    fn unkeyed(&self) -> Result<(Vec<CasePlan>, DecodeSearch), SchemaError> {
        let mut cases: Vec<CasePlan> = Vec::new();
        let mut literals: Vec<(Literal, usize)> = Vec::new();
        let (mut single, mut arrays, mut objects) = (Vec::new(), Vec::new(), Vec::new());

        for (index, variant) in self.schema.variants.iter().enumerate() {
            if variant.key != DiscriminatorKey::Auto {
                return Err(self.invalid(
                    Some(variant),
                    "untagged enums have no discriminator keys",
                ));
            }
            if variant.raw_value.is_some() {
                return Err(self.invalid(
                    Some(variant),
                    "raw values are only valid for raw-value enums",
                ));
            }
            let shape = if variant.values.is_empty() {
                if variant.payload != PayloadShape::Auto {
                    return Err(self.invalid(
                        Some(variant),
                        "untagged variants without associated values are matched by literals only",
                    ));
                }
                if variant.literals.is_empty() {
                    return Err(SchemaError::UnreachableVariant {
                        type_name: self.schema.type_name.clone(),
                        variant: variant.name.clone(),
                    });
                }
                ResolvedShape::Nothing
            } else {
                if !variant.literals.is_empty() {
                    return Err(self.invalid(
                        Some(variant),
                        "literal payloads are only valid on variants without associated values",
                    ));
                }
                self.shape(variant)?
            };

            for literal in &variant.literals {
                if let Some((_, first)) = literals.iter().find(|(l, _)| l == literal) {
                    return Err(self.duplicate(*first, index, literal));
                }
                literals.push((literal.clone(), index));
            }
            match shape {
                ResolvedShape::SingleValue => single.push(index),
                ResolvedShape::Array => arrays.push(index),
                ResolvedShape::Object(_) => objects.push(index),
                _ => {}
            }
            cases.push(CasePlan {
                name: variant.name.clone(),
                values: variant.values.iter().map(|v| v.ty.clone()).collect(),
                key: None,
                shape,
                literals: variant.literals.clone(),
                raw_value: None,
            });
        }

        let mut kinds: Vec<LiteralKind> = literals.iter().map(|(l, _)| l.kind()).collect();
        kinds.sort();
        kinds.dedup();
        let literals = kinds
            .into_iter()
            .map(|kind| LiteralGroup {
                kind,
                entries: literals
                    .iter()
                    .filter(|(l, _)| l.kind() == kind)
                    .cloned()
                    .collect(),
            })
            .collect();
        Ok((
            cases,
            DecodeSearch::Unkeyed {
                literals,
                single,
                arrays,
                objects,
            },
        ))
    }

    fn check_fallback(&self, cases: &[CasePlan]) -> Result<(), SchemaError> {
        let Some(fallback) = &self.schema.fallback else {
            return Ok(());
        };
        let valid = cases.iter().any(|c| {
            c.name == fallback.variant
                && c.values.len() == fallback.values.len()
                && c.values
                    .iter()
                    .zip(&fallback.values)
                    .all(|(ty, v)| ty.coerce(v).is_some())
        });
        if valid {
            Ok(())
        } else {
            Err(SchemaError::UnknownFallbackVariant {
                type_name: self.schema.type_name.clone(),
                variant: fallback.variant.clone(),
            })
        }
    }
}

impl EnumPlan {
    /// Validates `schema` and compiles its discriminator plan.
    pub fn compile(schema: EnumSchema) -> Result<Self, SchemaError> {
        let compiler = Compiler { schema: &schema };
        let (cases, search) = match &schema.strategy {
            Strategy::ExternalTagged => compiler.keyed(true)?,
            Strategy::InternalTagged { .. } => compiler.keyed(false)?,
            Strategy::AdjacentTagged { tag, content } => {
                if tag == content {
                    return Err(compiler.invalid(
                        None,
                        format!("tag and content keys must differ, both are `{tag}`"),
                    ));
                }
                compiler.keyed(false)?
            }
            Strategy::RawValueCoded => compiler.raw()?,
            Strategy::Unkeyed => compiler.unkeyed()?,
        };
        compiler.check_fallback(&cases)?;

        debug!(
            "compiled enum {}: {} cases, strategy {:?}",
            schema.type_name,
            cases.len(),
            schema.strategy
        );
        Ok(Self {
            schema,
            cases,
            search,
        })
    }

    /// The schema the plan was compiled from.
    pub fn schema(&self) -> &EnumSchema {
        &self.schema
    }

    /// Name of the enum type.
    pub fn type_name(&self) -> &str {
        &self.schema.type_name
    }

    /// The discrimination strategy.
    pub fn strategy(&self) -> &Strategy {
        &self.schema.strategy
    }

    /// Cases in declaration order.
    pub fn cases(&self) -> &[CasePlan] {
        &self.cases
    }

    /// Looks up a case by variant name.
    pub fn case(&self, name: &str) -> Option<(usize, &CasePlan)> {
        self.cases.iter().enumerate().find(|(_, c)| c.name == name)
    }

    /// The decode search order.
    pub fn search(&self) -> &DecodeSearch {
        &self.search
    }

    /// The value used when no case matches.
    pub fn fallback(&self) -> Option<&EnumValue> {
        self.schema.fallback.as_ref()
    }
}

impl fmt::Display for EnumPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "enum {} ({:?})", self.schema.type_name, self.schema.strategy)?;
        for case in &self.cases {
            write!(f, "  {}", case.name)?;
            if let Some(key) = &case.key {
                write!(f, " key={key}")?;
            }
            if let Some(raw) = &case.raw_value {
                write!(f, " raw={raw}")?;
            }
            for literal in &case.literals {
                write!(f, " literal={literal}")?;
            }
            writeln!(f, " payload={}", case.shape)?;
        }
        if let Some(fallback) = &self.schema.fallback {
            writeln!(f, "  fallback {fallback}")?;
        }
        Ok(())
    }
}
