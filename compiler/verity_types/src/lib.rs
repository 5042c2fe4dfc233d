//! Resolved types for the verity linter.
//!
//! - [`Type`]: one concrete type, produced by lowering doc-comment types
//! - [`Map`]: a union of type strings with precision tracking
//! - [`lazy`]: string encoding of deferred type queries
//! - [`Normalizer`]: canonical spelling of lowered types
//! - [`Checker`]: compatibility of two type sets
//! - [`predicates`]: classification of type names

pub mod compatible;
pub mod lazy;
mod map;
mod normalizer;
pub mod predicates;
mod ty;

pub use compatible::{
    compatible_type, Checker, ClassData, ClassHierarchy, CompatibleConfig, CompatibleResult,
    InMemoryClasses, Relation,
};
pub use lazy::{format_type, is_lazy, DecodeError, LazyTag, LazyType, LAZY_TAG_MAX};
pub use map::{
    mixed, null, precise_bool, precise_float, precise_int, precise_string, void, Map, MapFlags,
};
pub use normalizer::{ClassResolver, Normalizer};
pub use ty::{
    ClosureInfo, ClosureMap, DefaultShapeNamer, ShapeInfo, ShapeProp, ShapeNamer, ShapesMap, Type,
};
