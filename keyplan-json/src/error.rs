use core::fmt;

use keyplan_format::{DecodeError, EncodeError};

/// Error returned by the JSON entry points.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonError {
    /// What went wrong.
    pub kind: JsonErrorKind,
}

impl JsonError {
    /// Wraps an error kind.
    pub const fn new(kind: JsonErrorKind) -> Self {
        Self { kind }
    }

    /// The decode error, if the text parsed but did not fit the plan.
    pub fn as_decode(&self) -> Option<&DecodeError> {
        match &self.kind {
            JsonErrorKind::Decode(err) => Some(err),
            _ => None,
        }
    }
}

/// Specific JSON error kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonErrorKind {
    /// The input is not valid JSON.
    Syntax {
        /// Parser message
        message: String,
        /// 1-based line, 0 when unknown
        line: usize,
        /// 1-based column, 0 when unknown
        column: usize,
    },
    /// The document does not fit the plan.
    Decode(DecodeError),
    /// The value could not be encoded.
    Encode(EncodeError),
}

impl fmt::Display for JsonErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonErrorKind::Syntax {
                message,
                line,
                column,
            } => {
                if *line == 0 {
                    write!(f, "invalid JSON: {message}")
                } else {
                    write!(f, "invalid JSON at line {line}, column {column}: {message}")
                }
            }
            JsonErrorKind::Decode(err) => write!(f, "{err}"),
            JsonErrorKind::Encode(err) => write!(f, "{err}"),
        }
    }
}

impl fmt::Display for JsonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for JsonError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            JsonErrorKind::Syntax { .. } => None,
            JsonErrorKind::Decode(err) => Some(err),
            JsonErrorKind::Encode(err) => Some(err),
        }
    }
}

impl From<DecodeError> for JsonError {
    fn from(err: DecodeError) -> Self {
        JsonError::new(JsonErrorKind::Decode(err))
    }
}

impl From<EncodeError> for JsonError {
    fn from(err: EncodeError) -> Self {
        JsonError::new(JsonErrorKind::Encode(err))
    }
}

impl From<serde_json::Error> for JsonError {
    fn from(err: serde_json::Error) -> Self {
        // serde_json appends " at line X column Y" to its Display output
        let mut message = err.to_string();
        if let Some(at) = message.rfind(" at line ") {
            message.truncate(at);
        }
        JsonError::new(JsonErrorKind::Syntax {
            message,
            line: err.line(),
            column: err.column(),
        })
    }
}
