use keyplan_core::{EnumPlan, EnumValue, StructPlan};
use keyplan_value::Value;

use crate::{
    DecodeError, EncodeError, Record, StructuredDecoder, StructuredEncoder, TreeDecoder,
    TreeEncoder, decode_enum, decode_struct, encode_enum, encode_struct,
};

/// A compiled plan that can drive any structured decoder or encoder.
pub trait Codec {
    /// What decoding produces and encoding consumes.
    type Output;

    /// Decodes one value.
    fn decode<D: StructuredDecoder>(&self, decoder: &mut D) -> Result<Self::Output, DecodeError>;

    /// Encodes one value.
    fn encode<E: StructuredEncoder>(
        &self,
        value: &Self::Output,
        encoder: &mut E,
    ) -> Result<(), EncodeError>;
}

impl Codec for StructPlan {
    type Output = Record;

    fn decode<D: StructuredDecoder>(&self, decoder: &mut D) -> Result<Record, DecodeError> {
        decode_struct(self, decoder)
    }

    fn encode<E: StructuredEncoder>(
        &self,
        value: &Record,
        encoder: &mut E,
    ) -> Result<(), EncodeError> {
        encode_struct(self, value, encoder)
    }
}

impl Codec for EnumPlan {
    type Output = EnumValue;

    fn decode<D: StructuredDecoder>(&self, decoder: &mut D) -> Result<EnumValue, DecodeError> {
        decode_enum(self, decoder)
    }

    fn encode<E: StructuredEncoder>(
        &self,
        value: &EnumValue,
        encoder: &mut E,
    ) -> Result<(), EncodeError> {
        encode_enum(self, value, encoder)
    }
}

/// Decodes from an in-memory value.
pub fn from_value<C: Codec>(codec: &C, value: &Value) -> Result<C::Output, DecodeError> {
    codec.decode(&mut TreeDecoder::new(value))
}

/// Encodes into an in-memory value.
pub fn to_value<C: Codec>(codec: &C, value: &C::Output) -> Result<Value, EncodeError> {
    let mut encoder = TreeEncoder::new();
    codec.encode(value, &mut encoder)?;
    encoder.finish()
}
