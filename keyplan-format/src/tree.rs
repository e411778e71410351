//! Decoder and encoder over an in-memory [`Value`] tree.

use keyplan_core::KeySet;
use keyplan_value::{FieldType, Object, Value};

use crate::{
    CodingPath, DecodeError, EncodeError, StructuredDecoder, StructuredEncoder,
};

/// Reads from a borrowed [`Value`].
#[derive(Debug, Clone, Copy)]
pub struct TreeDecoder<'de> {
    root: &'de Value,
}

/// An open object inside a [`TreeDecoder`].
#[derive(Debug, Clone)]
pub struct TreeKeyed<'de> {
    object: &'de Object,
    path: CodingPath,
}

/// An open array inside a [`TreeDecoder`].
#[derive(Debug, Clone)]
pub struct TreeSequence<'de> {
    items: &'de [Value],
    index: usize,
    path: CodingPath,
}

impl<'de> TreeDecoder<'de> {
    /// A decoder reading `root`.
    pub fn new(root: &'de Value) -> Self {
        Self { root }
    }

    fn keyed(value: Option<&'de Value>, path: CodingPath) -> Result<TreeKeyed<'de>, DecodeError> {
        match value {
            None | Some(Value::Null) => Err(DecodeError::Missing { path }),
            Some(Value::Object(object)) => Ok(TreeKeyed { object, path }),
            Some(other) => Err(DecodeError::mismatch(path, "object", other.describe())),
        }
    }

    fn sequence(
        value: Option<&'de Value>,
        path: CodingPath,
    ) -> Result<TreeSequence<'de>, DecodeError> {
        match value {
            None | Some(Value::Null) => Err(DecodeError::Missing { path }),
            Some(Value::Array(items)) => Ok(TreeSequence {
                items,
                index: 0,
                path,
            }),
            Some(other) => Err(DecodeError::mismatch(path, "array", other.describe())),
        }
    }

    fn read(value: Option<&Value>, ty: &FieldType, path: CodingPath) -> Result<Value, DecodeError> {
        let Some(value) = value else {
            return Err(DecodeError::Missing { path });
        };
        ty.coerce(value)
            .ok_or_else(|| DecodeError::mismatch(path, ty, value.describe()))
    }
}

impl<'de> StructuredDecoder for TreeDecoder<'de> {
    type Keyed = TreeKeyed<'de>;
    type Sequence = TreeSequence<'de>;

    fn root_keyed(&mut self, _keys: &KeySet) -> Result<Self::Keyed, DecodeError> {
        Self::keyed(Some(self.root), CodingPath::root())
    }

    fn nested_keyed(
        &mut self,
        parent: &Self::Keyed,
        key: &str,
        _keys: &KeySet,
    ) -> Result<Self::Keyed, DecodeError> {
        Self::keyed(parent.object.get(key), parent.path.key(key))
    }

    fn contains(&self, container: &Self::Keyed, key: &str) -> bool {
        container.object.contains_key(key)
    }

    fn keys(&self, container: &Self::Keyed) -> Vec<String> {
        container.object.keys().cloned().collect()
    }

    fn decode_value(
        &mut self,
        container: &Self::Keyed,
        key: &str,
        ty: &FieldType,
    ) -> Result<Value, DecodeError> {
        Self::read(container.object.get(key), ty, container.path.key(key))
    }

    fn root_sequence(&mut self) -> Result<Self::Sequence, DecodeError> {
        Self::sequence(Some(self.root), CodingPath::root())
    }

    fn nested_sequence(
        &mut self,
        parent: &Self::Keyed,
        key: &str,
    ) -> Result<Self::Sequence, DecodeError> {
        Self::sequence(parent.object.get(key), parent.path.key(key))
    }

    fn is_at_end(&self, seq: &Self::Sequence) -> bool {
        seq.index >= seq.items.len()
    }

    fn next_keyed(
        &mut self,
        seq: &mut Self::Sequence,
        _keys: &KeySet,
    ) -> Result<Self::Keyed, DecodeError> {
        let keyed = Self::keyed(seq.items.get(seq.index), seq.path.index(seq.index))?;
        seq.index += 1;
        Ok(keyed)
    }

    fn next_value(
        &mut self,
        seq: &mut Self::Sequence,
        ty: &FieldType,
    ) -> Result<Value, DecodeError> {
        let value = Self::read(seq.items.get(seq.index), ty, seq.path.index(seq.index))?;
        seq.index += 1;
        Ok(value)
    }

    fn skip(&mut self, seq: &mut Self::Sequence) -> Result<(), DecodeError> {
        if self.is_at_end(seq) {
            return Err(DecodeError::Custom {
                path: seq.path.index(seq.index),
                message: "no element left to skip".to_string(),
            });
        }
        seq.index += 1;
        Ok(())
    }

    fn single_value(&mut self, ty: &FieldType) -> Result<Value, DecodeError> {
        Self::read(Some(self.root), ty, CodingPath::root())
    }

    fn container_path(&self, container: &Self::Keyed) -> CodingPath {
        container.path.clone()
    }

    fn sequence_path(&self, seq: &Self::Sequence) -> CodingPath {
        seq.path.index(seq.index)
    }
}

#[derive(Debug)]
enum Frame {
    Object { entries: Object, key: Option<String> },
    Array { items: Vec<Value>, key: Option<String> },
}

/// Builds a [`Value`] from encoder calls.
#[derive(Debug, Default)]
pub struct TreeEncoder {
    stack: Vec<Frame>,
    pending: Option<String>,
    result: Option<Value>,
}

impl TreeEncoder {
    /// An encoder with nothing written yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// The finished value.
    pub fn finish(self) -> Result<Value, EncodeError> {
        if !self.stack.is_empty() {
            return Err(EncodeError::sink(format!(
                "{} container(s) left open",
                self.stack.len()
            )));
        }
        self.result
            .ok_or_else(|| EncodeError::sink("nothing was encoded"))
    }

    fn place(&mut self, value: Value) -> Result<(), EncodeError> {
        match self.stack.last_mut() {
            None if self.result.is_some() => Err(EncodeError::sink("more than one root value")),
            None => {
                self.result = Some(value);
                Ok(())
            }
            Some(Frame::Object { entries, .. }) => {
                let key = self
                    .pending
                    .take()
                    .ok_or_else(|| EncodeError::sink("object entry without a key"))?;
                entries.insert(key, value);
                Ok(())
            }
            Some(Frame::Array { items, .. }) => {
                items.push(value);
                Ok(())
            }
        }
    }
}

impl StructuredEncoder for TreeEncoder {
    fn begin_keyed(&mut self) -> Result<(), EncodeError> {
        let key = self.pending.take();
        self.stack.push(Frame::Object {
            entries: Object::new(),
            key,
        });
        Ok(())
    }

    fn key(&mut self, key: &str) -> Result<(), EncodeError> {
        if !matches!(self.stack.last(), Some(Frame::Object { .. })) {
            return Err(EncodeError::sink(format!("key `{key}` outside an object")));
        }
        self.pending = Some(key.to_string());
        Ok(())
    }

    fn end_keyed(&mut self) -> Result<(), EncodeError> {
        match self.stack.pop() {
            Some(Frame::Object { entries, key }) => {
                self.pending = key;
                self.place(Value::Object(entries))
            }
            _ => Err(EncodeError::sink("end_keyed without an open object")),
        }
    }

    fn begin_sequence(&mut self) -> Result<(), EncodeError> {
        let key = self.pending.take();
        self.stack.push(Frame::Array {
            items: Vec::new(),
            key,
        });
        Ok(())
    }

    fn end_sequence(&mut self) -> Result<(), EncodeError> {
        match self.stack.pop() {
            Some(Frame::Array { items, key }) => {
                self.pending = key;
                self.place(Value::Array(items))
            }
            _ => Err(EncodeError::sink("end_sequence without an open array")),
        }
    }

    fn value(&mut self, value: &Value) -> Result<(), EncodeError> {
        self.place(value.clone())
    }
}
