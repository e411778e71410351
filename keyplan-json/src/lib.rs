#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]
#![doc = include_str!("../README.md")]

mod tracing_macros;
#[allow(unused_imports)]
pub(crate) use tracing_macros::{debug, trace};

mod error;
pub use error::{JsonError, JsonErrorKind};

mod options;
pub use options::JsonOptions;

mod parse;
pub use parse::parse_value;

mod encoder;
pub use encoder::JsonEncoder;

use keyplan_format::{Codec, TreeDecoder};

/// Decodes JSON text with `codec`.
pub fn from_str<C: Codec>(codec: &C, input: &str) -> Result<C::Output, JsonError> {
    let value = parse_value(input)?;
    let output = codec.decode(&mut TreeDecoder::new(&value))?;
    Ok(output)
}

/// Decodes JSON bytes with `codec`.
pub fn from_slice<C: Codec>(codec: &C, input: &[u8]) -> Result<C::Output, JsonError> {
    let text = core::str::from_utf8(input).map_err(|err| {
        JsonError::new(JsonErrorKind::Syntax {
            message: err.to_string(),
            line: 0,
            column: 0,
        })
    })?;
    from_str(codec, text)
}

/// Encodes `value` with `codec` as compact JSON text.
pub fn to_string<C: Codec>(codec: &C, value: &C::Output) -> Result<String, JsonError> {
    to_string_with(codec, value, JsonOptions::default())
}

/// Encodes `value` with `codec` as indented JSON text.
pub fn to_string_pretty<C: Codec>(codec: &C, value: &C::Output) -> Result<String, JsonError> {
    to_string_with(codec, value, JsonOptions::new().pretty())
}

/// Encodes `value` with `codec` using the given formatting options.
pub fn to_string_with<C: Codec>(
    codec: &C,
    value: &C::Output,
    options: JsonOptions,
) -> Result<String, JsonError> {
    let mut encoder = JsonEncoder::with_options(options);
    codec.encode(value, &mut encoder)?;
    Ok(encoder.finish()?)
}
