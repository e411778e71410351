#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]
#![doc = include_str!("../README.md")]

mod macros;

mod value;
pub use value::*;

mod kind;
pub use kind::*;

mod format;
pub use format::{write_escaped_str, write_json, write_number};
