#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]
#![doc = include_str!("../README.md")]

pub use keyplan_core::*;
pub use keyplan_format::*;
pub use keyplan_value::value;

/// JSON text entry points.
#[cfg(feature = "json")]
pub mod json {
    pub use keyplan_json::*;
}
