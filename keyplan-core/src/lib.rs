#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]
#![doc = include_str!("../README.md")]

mod tracing_macros;
#[allow(unused_imports)]
pub(crate) use tracing_macros::{debug, trace};

mod requirement;
pub use requirement::{FailureClass, Requirement, ValuePolicy};

mod case;
pub use case::KeyCase;

mod error;
pub use error::{SchemaError, TransformError};

mod field;
pub use field::{
    EncodeCondition, FieldDescriptor, FieldId, Predicate, SequenceElementSpec, Transform,
};

mod schema;
pub use schema::StructSchema;

pub mod tree;
pub use tree::{PathNode, PathTree};

pub mod plan;
pub use plan::{
    ContainerId, ContainerKeys, Direction, ElementPlan, KeySet, SequenceStep, Step, StructPlan,
};

mod variant;
pub use variant::{
    AssociatedValue, DiscriminatorKey, EnumSchema, EnumValue, Literal, LiteralKind, PayloadShape,
    Strategy, VariantDescriptor,
};

pub mod enum_plan;
pub use enum_plan::{
    CasePlan, DecodeSearch, EnumPlan, KeyGroup, KeyKind, LiteralGroup, ResolvedKey, ResolvedShape,
};

pub use keyplan_value::{FieldType, Number, Object, Value, ValueKind};
