use keyplan_core::KeySet;
use keyplan_value::{FieldType, Value};

use crate::{CodingPath, DecodeError};

/// Read access to a structured input.
///
/// Containers are opened as handles. Opening or reading never consumes
/// the input, so enum strategies can retry from the root.
///
/// Absent keys, and containers that are absent or `null`, are reported as
/// [`DecodeError::Missing`]. Values of the wrong type are
/// [`DecodeError::Mismatch`]; a `null` value decodes to [`Value::Null`]
/// when the requested type is nullable and is a mismatch otherwise.
pub trait StructuredDecoder {
    /// An open keyed container.
    type Keyed: Clone;
    /// An open sequence with a cursor.
    type Sequence;

    /// Opens the root as a keyed container holding `keys`.
    fn root_keyed(&mut self, keys: &KeySet) -> Result<Self::Keyed, DecodeError>;

    /// Opens the keyed container stored at `key` inside `parent`.
    fn nested_keyed(
        &mut self,
        parent: &Self::Keyed,
        key: &str,
        keys: &KeySet,
    ) -> Result<Self::Keyed, DecodeError>;

    /// Whether `container` holds `key`.
    fn contains(&self, container: &Self::Keyed, key: &str) -> bool;

    /// Every key `container` holds, in input order.
    fn keys(&self, container: &Self::Keyed) -> Vec<String>;

    /// Reads the value at `key` as `ty`.
    fn decode_value(
        &mut self,
        container: &Self::Keyed,
        key: &str,
        ty: &FieldType,
    ) -> Result<Value, DecodeError>;

    /// Opens the root as a sequence.
    fn root_sequence(&mut self) -> Result<Self::Sequence, DecodeError>;

    /// Opens the sequence stored at `key` inside `parent`.
    fn nested_sequence(
        &mut self,
        parent: &Self::Keyed,
        key: &str,
    ) -> Result<Self::Sequence, DecodeError>;

    /// Whether the cursor has passed the last element.
    fn is_at_end(&self, seq: &Self::Sequence) -> bool;

    /// Opens the element under the cursor as a keyed container. The cursor
    /// advances only on success.
    fn next_keyed(
        &mut self,
        seq: &mut Self::Sequence,
        keys: &KeySet,
    ) -> Result<Self::Keyed, DecodeError>;

    /// Reads the element under the cursor as `ty`. The cursor advances only
    /// on success.
    fn next_value(&mut self, seq: &mut Self::Sequence, ty: &FieldType)
    -> Result<Value, DecodeError>;

    /// Moves the cursor past the current element.
    fn skip(&mut self, seq: &mut Self::Sequence) -> Result<(), DecodeError>;

    /// Reads the whole input as one value of type `ty`.
    fn single_value(&mut self, ty: &FieldType) -> Result<Value, DecodeError>;

    /// Where a keyed container lives.
    fn container_path(&self, container: &Self::Keyed) -> CodingPath;

    /// Where the cursor of a sequence points.
    fn sequence_path(&self, seq: &Self::Sequence) -> CodingPath;
}
