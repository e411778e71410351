use core::fmt;

use crate::FailureClass;

/// Errors detected while compiling a schema into a plan.
///
/// These never occur while decoding or encoding a record: a plan that
/// compiled successfully is internally consistent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A field has an empty path or an empty path segment.
    EmptyPath {
        /// Type being compiled.
        type_name: String,
        /// Offending field.
        field: String,
    },
    /// Two fields share a name.
    DuplicateField {
        /// Type being compiled.
        type_name: String,
        /// The repeated name.
        field: String,
    },
    /// One field's path equals, or is a prefix of, another field's path.
    PathCollision {
        /// Type being compiled.
        type_name: String,
        /// The field declared first.
        first: String,
        /// The field declared second.
        second: String,
        /// Dotted path where the two meet.
        path: String,
    },
    /// Two fields sharing a sequence path collide inside the element.
    SequencePathConflict {
        /// Type being compiled.
        type_name: String,
        /// The field declared first.
        first: String,
        /// The field declared second.
        second: String,
        /// Dotted element path where the two meet.
        path: String,
    },
    /// A requirement tolerates a failure class, but the field has neither a
    /// fallback for it nor a nullable type.
    MissingFallback {
        /// Type being compiled.
        type_name: String,
        /// Offending field.
        field: String,
        /// The uncovered failure class.
        class: FailureClass,
        /// Whether the policy is the per-element one of a sequence field.
        element: bool,
    },
    /// A field is excluded from decoding but has no initializer and is not
    /// nullable, so it could never be given a value.
    NotIgnorable {
        /// Type being compiled.
        type_name: String,
        /// Offending field.
        field: String,
    },
    /// A constant field also declares a different default.
    ConflictingConstantDefault {
        /// Type being compiled.
        type_name: String,
        /// Offending field.
        field: String,
    },
    /// Two variants resolve to the same discriminator.
    DuplicateDiscriminator {
        /// Enum being compiled.
        type_name: String,
        /// The variant declared first.
        first: String,
        /// The variant declared second.
        second: String,
        /// The shared discriminator, as written on the wire.
        key: String,
    },
    /// A payload shape does not fit the variant's associated values.
    PayloadMismatch {
        /// Enum being compiled.
        type_name: String,
        /// Offending variant.
        variant: String,
        /// What is wrong.
        reason: String,
    },
    /// An object payload names a different number of keys than the variant
    /// has associated values.
    ObjectKeyCount {
        /// Enum being compiled.
        type_name: String,
        /// Offending variant.
        variant: String,
        /// Number of associated values.
        expected: usize,
        /// Number of keys given.
        found: usize,
    },
    /// An object payload repeats a key.
    DuplicatePayloadKey {
        /// Enum being compiled.
        type_name: String,
        /// Offending variant.
        variant: String,
        /// The repeated key.
        key: String,
    },
    /// An object payload key equals the discriminator key of an internally
    /// tagged enum.
    KeyConflictsWithDiscriminator {
        /// Enum being compiled.
        type_name: String,
        /// Offending variant.
        variant: String,
        /// The conflicting key.
        key: String,
    },
    /// A setting is not valid for the chosen strategy.
    InvalidCustomization {
        /// Enum being compiled.
        type_name: String,
        /// Offending variant, if the setting is per variant.
        variant: Option<String>,
        /// What is wrong.
        reason: String,
    },
    /// An untagged variant can never be produced by decoding.
    UnreachableVariant {
        /// Enum being compiled.
        type_name: String,
        /// Offending variant.
        variant: String,
    },
    /// The configured fallback value does not name a valid variant.
    UnknownFallbackVariant {
        /// Enum being compiled.
        type_name: String,
        /// The variant named by the fallback.
        variant: String,
    },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::EmptyPath { type_name, field } => {
                write!(f, "{type_name}.{field}: coding path must have at least one non-empty segment")
            }
            SchemaError::DuplicateField { type_name, field } => {
                write!(f, "{type_name}: field `{field}` is declared more than once")
            }
            SchemaError::PathCollision {
                type_name,
                first,
                second,
                path,
            } => write!(
                f,
                "{type_name}: fields `{first}` and `{second}` collide at path `{path}`; \
                 a value cannot also be a container"
            ),
            SchemaError::SequencePathConflict {
                type_name,
                first,
                second,
                path,
            } => write!(
                f,
                "{type_name}: sequence fields `{first}` and `{second}` collide at element path `{path}`"
            ),
            SchemaError::MissingFallback {
                type_name,
                field,
                class,
                element,
            } => {
                let scope = if *element { "element of " } else { "" };
                write!(
                    f,
                    "{type_name}.{field}: {scope}field tolerates {class} values but has no fallback \
                     for them and is not nullable"
                )
            }
            SchemaError::NotIgnorable { type_name, field } => write!(
                f,
                "{type_name}.{field}: only fields with an initializer or a nullable type can be ignored"
            ),
            SchemaError::ConflictingConstantDefault { type_name, field } => write!(
                f,
                "{type_name}.{field}: constant field also declares a different default"
            ),
            SchemaError::DuplicateDiscriminator {
                type_name,
                first,
                second,
                key,
            } => write!(
                f,
                "{type_name}: variants `{first}` and `{second}` share the discriminator {key}"
            ),
            SchemaError::PayloadMismatch {
                type_name,
                variant,
                reason,
            } => write!(f, "{type_name}::{variant}: {reason}"),
            SchemaError::ObjectKeyCount {
                type_name,
                variant,
                expected,
                found,
            } => write!(
                f,
                "{type_name}::{variant}: object payload lists {found} keys for {expected} associated values"
            ),
            SchemaError::DuplicatePayloadKey {
                type_name,
                variant,
                key,
            } => write!(f, "{type_name}::{variant}: payload key `{key}` is used twice"),
            SchemaError::KeyConflictsWithDiscriminator {
                type_name,
                variant,
                key,
            } => write!(
                f,
                "{type_name}::{variant}: payload key `{key}` is also the discriminator key"
            ),
            SchemaError::InvalidCustomization {
                type_name,
                variant,
                reason,
            } => match variant {
                Some(variant) => write!(f, "{type_name}::{variant}: {reason}"),
                None => write!(f, "{type_name}: {reason}"),
            },
            SchemaError::UnreachableVariant { type_name, variant } => write!(
                f,
                "{type_name}::{variant}: untagged variant without associated values needs a literal payload"
            ),
            SchemaError::UnknownFallbackVariant { type_name, variant } => write!(
                f,
                "{type_name}: fallback value names variant `{variant}`, which does not exist \
                 or takes different associated values"
            ),
        }
    }
}

impl std::error::Error for SchemaError {}

/// Failure reported by a user-supplied transform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformError {
    message: String,
}

impl TransformError {
    /// Creates a transform error with a human-readable message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The message passed to [`TransformError::new`].
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for TransformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for TransformError {}
