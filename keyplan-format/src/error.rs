use core::fmt;

use keyplan_core::FailureClass;

use crate::CodingPath;

/// Errors produced while decoding a record or an enum.
///
/// Only [`DecodeError::Missing`] and [`DecodeError::Mismatch`] can be
/// recovered from, and only where a requirement policy tolerates them.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// A key or container is absent.
    Missing {
        /// Where the value was expected.
        path: CodingPath,
    },
    /// A value is present but has the wrong type or shape.
    Mismatch {
        /// Where the value was found.
        path: CodingPath,
        /// What the plan expected.
        expected: String,
        /// What was there instead.
        found: String,
    },
    /// A decode transform failed.
    Transform {
        /// Where the transformed value came from.
        path: CodingPath,
        /// Record type.
        type_name: String,
        /// Field being decoded.
        field: String,
        /// Name of the failing transform.
        transform: String,
        /// What went wrong.
        message: String,
    },
    /// A validator rejected a decoded value.
    Validation {
        /// Record type.
        type_name: String,
        /// Field being decoded.
        field: String,
        /// Source text of the failing predicate.
        predicate: String,
        /// Description of the rejected value.
        value: String,
    },
    /// No enum case matched and no fallback is configured.
    NoMatchingCase {
        /// Enum type.
        type_name: String,
        /// The discriminator or payload that was found.
        found: String,
    },
    /// Any other failure reported by a decoder.
    Custom {
        /// Where it happened.
        path: CodingPath,
        /// What went wrong.
        message: String,
    },
}

impl DecodeError {
    /// A mismatch at `path`.
    pub fn mismatch(path: CodingPath, expected: impl fmt::Display, found: impl Into<String>) -> Self {
        DecodeError::Mismatch {
            path,
            expected: expected.to_string(),
            found: found.into(),
        }
    }

    /// The recoverable class of this error, if it has one.
    pub fn class(&self) -> Option<FailureClass> {
        match self {
            DecodeError::Missing { .. } => Some(FailureClass::Missing),
            DecodeError::Mismatch { .. } => Some(FailureClass::Mismatch),
            _ => None,
        }
    }

    /// Where the error happened, if it is tied to a position.
    pub fn path(&self) -> Option<&CodingPath> {
        match self {
            DecodeError::Missing { path }
            | DecodeError::Mismatch { path, .. }
            | DecodeError::Transform { path, .. }
            | DecodeError::Custom { path, .. } => Some(path),
            DecodeError::Validation { .. } | DecodeError::NoMatchingCase { .. } => None,
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Missing { path } => write!(f, "missing value at {path}"),
            DecodeError::Mismatch {
                path,
                expected,
                found,
            } => write!(f, "expected {expected} at {path}, found {found}"),
            DecodeError::Transform {
                path,
                type_name,
                field,
                transform,
                message,
            } => write!(
                f,
                "{type_name}.{field}: transform `{transform}` failed on the value at {path}: {message}"
            ),
            DecodeError::Validation {
                type_name,
                field,
                predicate,
                value,
            } => write!(
                f,
                "{type_name}.{field}: {value} does not satisfy `{predicate}`"
            ),
            DecodeError::NoMatchingCase { type_name, found } => {
                write!(f, "{type_name}: no case matches {found}")
            }
            DecodeError::Custom { path, message } => write!(f, "{message} at {path}"),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Errors produced while encoding a record or an enum.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodeError {
    /// The encoder failed to write.
    Sink {
        /// What went wrong.
        message: String,
    },
    /// An encode transform failed.
    Transform {
        /// Record type.
        type_name: String,
        /// Field being encoded.
        field: String,
        /// Name of the failing transform.
        transform: String,
        /// What went wrong.
        message: String,
    },
    /// The record has no value for a non-nullable field.
    MissingField {
        /// Record type.
        type_name: String,
        /// The absent field.
        field: String,
    },
    /// Fields sharing a sequence hold different numbers of elements.
    SequenceLengthMismatch {
        /// Record type.
        type_name: String,
        /// Key of the shared sequence.
        key: String,
        /// The field whose length disagrees.
        field: String,
        /// Length of the first field.
        expected: usize,
        /// Length of `field`.
        found: usize,
    },
    /// The enum value names no case of the schema.
    UnknownVariant {
        /// Enum type.
        type_name: String,
        /// The unknown name.
        variant: String,
    },
    /// A value does not fit its declared type.
    InvalidValue {
        /// Record or enum type.
        type_name: String,
        /// Field or variant.
        field: String,
        /// What is wrong.
        message: String,
    },
}

impl EncodeError {
    /// A sink failure.
    pub fn sink(message: impl Into<String>) -> Self {
        EncodeError::Sink {
            message: message.into(),
        }
    }
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::Sink { message } => write!(f, "encoder error: {message}"),
            EncodeError::Transform {
                type_name,
                field,
                transform,
                message,
            } => write!(
                f,
                "{type_name}.{field}: encode transform `{transform}` failed: {message}"
            ),
            EncodeError::MissingField { type_name, field } => {
                write!(f, "{type_name}.{field}: no value for a non-nullable field")
            }
            EncodeError::SequenceLengthMismatch {
                type_name,
                key,
                field,
                expected,
                found,
            } => write!(
                f,
                "{type_name}.{field}: {found} elements for sequence `{key}`, other fields have {expected}"
            ),
            EncodeError::UnknownVariant { type_name, variant } => {
                write!(f, "{type_name}: unknown variant `{variant}`")
            }
            EncodeError::InvalidValue {
                type_name,
                field,
                message,
            } => write!(f, "{type_name}.{field}: {message}"),
        }
    }
}

impl std::error::Error for EncodeError {}

impl From<fmt::Error> for EncodeError {
    fn from(_: fmt::Error) -> Self {
        EncodeError::sink("formatter error")
    }
}
