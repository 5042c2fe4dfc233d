//! Resolved type units and the shape/closure registries.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::lazy::wrap_array_of;

/// A concrete type: an element name nested in `dims` arrays.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct Type {
    pub elem: String,
    pub dims: usize,
}

impl Type {
    pub fn new(elem: impl Into<String>) -> Self {
        Type {
            elem: elem.into(),
            dims: 0,
        }
    }

    pub fn array_of(elem: impl Into<String>, dims: usize) -> Self {
        Type {
            elem: elem.into(),
            dims,
        }
    }

    /// Map key form: the element wrapped in one lazy `array_of` per dimension.
    pub fn to_lazy_string(&self) -> String {
        let mut s = self.elem.clone();
        for _ in 0..self.dims {
            s = wrap_array_of(&s);
        }
        s
    }
}

/// `elem` followed by `[]` per dimension.
impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.elem)?;
        for _ in 0..self.dims {
            f.write_str("[]")?;
        }
        Ok(())
    }
}

/// One `key: types` entry of a shape.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct ShapeProp {
    pub key: String,
    pub types: Vec<Type>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct ShapeInfo {
    pub name: String,
    /// Declaration order.
    pub props: Vec<ShapeProp>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct ClosureInfo {
    pub name: String,
    pub return_type: Vec<Type>,
    pub param_types: Vec<Vec<Type>>,
}

pub type ShapesMap = FxHashMap<String, ShapeInfo>;
pub type ClosureMap = FxHashMap<String, ClosureInfo>;

/// Produces the synthesized class-like name of a shape.
///
/// Implementations must be deterministic, and distinct prop lists must get
/// distinct names, since shapes compare equal by name.
pub trait ShapeNamer {
    fn shape_name(&self, props: &[ShapeProp]) -> String;
}

impl<F> ShapeNamer for F
where
    F: Fn(&[ShapeProp]) -> String,
{
    fn shape_name(&self, props: &[ShapeProp]) -> String {
        self(props)
    }
}

/// `\shape$k1:t1/t2,k2:t3$`
#[derive(Copy, Clone, Debug, Default)]
pub struct DefaultShapeNamer;

impl ShapeNamer for DefaultShapeNamer {
    fn shape_name(&self, props: &[ShapeProp]) -> String {
        let mut name = String::from("\\shape$");
        for (i, prop) in props.iter().enumerate() {
            if i > 0 {
                name.push(',');
            }
            name.push_str(&prop.key);
            name.push(':');
            for (j, ty) in prop.types.iter().enumerate() {
                if j > 0 {
                    name.push('/');
                }
                name.push_str(&ty.to_string());
            }
        }
        name.push('$');
        name
    }
}
