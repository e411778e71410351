use keyplan_value::Value;

use crate::EncodeError;

/// Write access to a structured output.
///
/// Calls arrive in document order: a keyed container is a `begin_keyed`,
/// then `key` followed by one value or container per entry, then
/// `end_keyed`.
pub trait StructuredEncoder {
    /// Opens a keyed container.
    fn begin_keyed(&mut self) -> Result<(), EncodeError>;

    /// Writes the key of the next entry.
    fn key(&mut self, key: &str) -> Result<(), EncodeError>;

    /// Closes the innermost keyed container.
    fn end_keyed(&mut self) -> Result<(), EncodeError>;

    /// Opens a sequence.
    fn begin_sequence(&mut self) -> Result<(), EncodeError>;

    /// Closes the innermost sequence.
    fn end_sequence(&mut self) -> Result<(), EncodeError>;

    /// Writes a complete value.
    fn value(&mut self, value: &Value) -> Result<(), EncodeError>;

    /// Writes `null`.
    fn nil(&mut self) -> Result<(), EncodeError> {
        self.value(&Value::Null)
    }
}

impl<E: StructuredEncoder + ?Sized> StructuredEncoder for &mut E {
    fn begin_keyed(&mut self) -> Result<(), EncodeError> {
        (**self).begin_keyed()
    }

    fn key(&mut self, key: &str) -> Result<(), EncodeError> {
        (**self).key(key)
    }

    fn end_keyed(&mut self) -> Result<(), EncodeError> {
        (**self).end_keyed()
    }

    fn begin_sequence(&mut self) -> Result<(), EncodeError> {
        (**self).begin_sequence()
    }

    fn end_sequence(&mut self) -> Result<(), EncodeError> {
        (**self).end_sequence()
    }

    fn value(&mut self, value: &Value) -> Result<(), EncodeError> {
        (**self).value(value)
    }

    fn nil(&mut self) -> Result<(), EncodeError> {
        (**self).nil()
    }
}
