#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]
#![doc = include_str!("../README.md")]

mod tracing_macros;
#[allow(unused_imports)]
pub(crate) use tracing_macros::{debug, trace};

mod path;
pub use path::{CodingPath, PathSegment};

mod error;
pub use error::{DecodeError, EncodeError};

mod decoder;
pub use decoder::StructuredDecoder;

mod encoder;
pub use encoder::StructuredEncoder;

mod record;
pub use record::Record;

mod decode;
pub use decode::decode_struct;

mod encode;
pub use encode::encode_struct;

mod sequence;

mod enum_decode;
pub use enum_decode::decode_enum;

mod enum_encode;
pub use enum_encode::encode_enum;

mod tree;
pub use tree::{TreeDecoder, TreeEncoder, TreeKeyed, TreeSequence};

mod codec;
pub use codec::{Codec, from_value, to_value};

pub use keyplan_core::EnumValue;
