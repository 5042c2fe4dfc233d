//! Type compatibility checks.
//!
//! [`Checker::check`] answers whether the type set `t2` may stand where
//! `t1` is used and, when it may not (or when the answer depends on a
//! subtyping relation), reports a single [`Relation`] describing why.
//! The checker is direction-agnostic: callers decide which side is the
//! declared one.

use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::lazy::{lazy_tag, unwrap_array_of, LazyTag};
use crate::predicates::{alias, array_element_type, is_array, is_class, is_pod};
use crate::Map;

/// Class metadata consumed by the checker.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassData {
    pub name: String,
    pub parent: Option<String>,
    pub interfaces: FxHashSet<String>,
    pub is_interface: bool,
}

impl ClassData {
    pub fn class(name: impl Into<String>) -> Self {
        ClassData {
            name: name.into(),
            ..ClassData::default()
        }
    }

    pub fn interface(name: impl Into<String>) -> Self {
        ClassData {
            name: name.into(),
            is_interface: true,
            ..ClassData::default()
        }
    }

    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    #[must_use]
    pub fn with_interface(mut self, iface: impl Into<String>) -> Self {
        self.interfaces.insert(iface.into());
        self
    }
}

/// Read-only access to already-indexed class metadata.
pub trait ClassHierarchy: Sync {
    fn class_data(&self, name: &str) -> Option<&ClassData>;
}

/// A [`ClassHierarchy`] backed by a hash map.
#[derive(Clone, Debug, Default)]
pub struct InMemoryClasses {
    classes: FxHashMap<String, ClassData>,
}

impl InMemoryClasses {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, class: ClassData) {
        self.classes.insert(class.name.clone(), class);
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl FromIterator<ClassData> for InMemoryClasses {
    fn from_iter<I: IntoIterator<Item = ClassData>>(iter: I) -> Self {
        let mut classes = InMemoryClasses::new();
        for class in iter {
            classes.insert(class);
        }
        classes
    }
}

impl ClassHierarchy for InMemoryClasses {
    fn class_data(&self, name: &str) -> Option<&ClassData> {
        self.classes.get(name)
    }
}

/// Why two types relate the way they do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Relation {
    /// `t1` is `?T`, `t2` is `T`. Reserved for callers.
    MoreGeneralType,
    /// `t1` is `T`, `t2` is `?T`. Reserved for callers.
    MoreSpecificType,
    /// `t1` is nullable, `t2` is not.
    ExtraNullable,
    /// `t2` is nullable, `t1` is not.
    LostNullable,
    /// `null` against a union without `null`.
    NullToNotNullable,
    /// `t1` is `float`, `t2` is `int`.
    FloatInt,
    /// `t1` is `int`, `t2` is `float`.
    IntFloat,
    /// `t1` is `bool`, `t2` is `false`.
    BoolFalse,
    /// `t1` is `false`, `t2` is `bool`.
    FalseBool,
    /// `t1` is not an array, `t2` is.
    TypeAndArray,
    /// `t1` is an array, `t2` is not.
    ArrayAndType,
    /// Both are arrays with incompatible elements.
    ArraysTypeMismatch(Box<CompatibleResult>),
    /// `t1` is a class, `t2` an interface.
    ClassAndInterface,
    /// `t1` is an interface, `t2` a class.
    InterfaceAndClass,
    /// `t1` extends `t2`.
    ClassAndParent,
    /// `t2` extends `t1`.
    ParentAndClass,
    /// `t1` is a class, `t2` is not.
    ClassAndNotClass,
    /// `t1` is not a class, `t2` is.
    NotClassAndClass,
    /// Some member of `t2` matches no member of `t1`.
    UnionNotInOtherUnion,
}

impl Relation {
    pub fn tag(&self) -> &'static str {
        match self {
            Relation::MoreGeneralType => "MoreGeneralType",
            Relation::MoreSpecificType => "MoreSpecificType",
            Relation::ExtraNullable => "ExtraNullable",
            Relation::LostNullable => "LostNullable",
            Relation::NullToNotNullable => "NullToNotNullable",
            Relation::FloatInt => "FloatInt",
            Relation::IntFloat => "IntFloat",
            Relation::BoolFalse => "BoolFalse",
            Relation::FalseBool => "FalseBool",
            Relation::TypeAndArray => "TypeAndArray",
            Relation::ArrayAndType => "ArrayAndType",
            Relation::ArraysTypeMismatch(_) => "ArraysTypeMismatch",
            Relation::ClassAndInterface => "ClassAndInterface",
            Relation::InterfaceAndClass => "InterfaceAndClass",
            Relation::ClassAndParent => "ClassAndParent",
            Relation::ParentAndClass => "ParentAndClass",
            Relation::ClassAndNotClass => "ClassAndNotClass",
            Relation::NotClassAndClass => "NotClassAndClass",
            Relation::UnionNotInOtherUnion => "UnionNotInOtherUnion",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relation::MoreGeneralType => f.write_str("the first type is more general"),
            Relation::MoreSpecificType => f.write_str("the first type is more specific"),
            Relation::ExtraNullable => f.write_str("nullable type used as a non-nullable one"),
            Relation::LostNullable => f.write_str("non-nullable type used as a nullable one"),
            Relation::NullToNotNullable => f.write_str("null used as a non-nullable type"),
            Relation::FloatInt => f.write_str("float used as int"),
            Relation::IntFloat => f.write_str("int used as float"),
            Relation::BoolFalse => f.write_str("bool used as false"),
            Relation::FalseBool => f.write_str("false used as bool"),
            Relation::TypeAndArray => f.write_str("non-array type used as an array"),
            Relation::ArrayAndType => f.write_str("array used as a non-array type"),
            Relation::ArraysTypeMismatch(inner) => write!(f, "array element types differ ({inner})"),
            Relation::ClassAndInterface => f.write_str("class checked against an interface"),
            Relation::InterfaceAndClass => f.write_str("interface checked against a class"),
            Relation::ClassAndParent => f.write_str("class checked against its parent"),
            Relation::ParentAndClass => f.write_str("parent class checked against a subclass"),
            Relation::ClassAndNotClass => f.write_str("class used as a non-class type"),
            Relation::NotClassAndClass => f.write_str("non-class type used as a class"),
            Relation::UnionNotInOtherUnion => {
                f.write_str("some union members match nothing in the other union")
            }
        }
    }
}

/// Outcome of a compatibility check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompatibleResult {
    pub t1: Map,
    pub t2: Map,
    pub compatible: bool,
    pub relation: Option<Relation>,
}

impl CompatibleResult {
    fn verdict(compatible: bool, relation: Option<Relation>) -> Self {
        CompatibleResult {
            t1: Map::empty(),
            t2: Map::empty(),
            compatible,
            relation,
        }
    }

    fn ok() -> Self {
        Self::verdict(true, None)
    }

    fn fail() -> Self {
        Self::verdict(false, None)
    }

    fn ok_with(relation: Relation) -> Self {
        Self::verdict(true, Some(relation))
    }

    fn fail_with(relation: Relation) -> Self {
        Self::verdict(false, Some(relation))
    }

    fn for_maps(mut self, t1: &Map, t2: &Map) -> Self {
        self.t1 = t1.clone();
        self.t2 = t2.clone();
        self
    }
}

impl fmt::Display for CompatibleResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.compatible {
            write!(f, "{} and {} are compatible", self.t1, self.t2)?;
        } else {
            write!(f, "{} is not compatible with {}", self.t2, self.t1)?;
        }
        if let Some(relation) = &self.relation {
            write!(f, ": {relation}")?;
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CompatibleConfig {
    /// Unions larger than this are reported compatible without checking.
    pub max_union_size: usize,
    /// Unions must match as sets, modulo one nullability difference.
    pub union_strict: bool,
}

impl Default for CompatibleConfig {
    fn default() -> Self {
        CompatibleConfig {
            max_union_size: 4,
            union_strict: false,
        }
    }
}

/// Compatibility checker over an optional class hierarchy.
///
/// Without a hierarchy, or when a class is not found in it, distinct class
/// names are assumed compatible.
#[derive(Clone, Copy)]
pub struct Checker<'h> {
    config: CompatibleConfig,
    classes: Option<&'h dyn ClassHierarchy>,
}

impl fmt::Debug for Checker<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Checker")
            .field("config", &self.config)
            .field("classes", &self.classes.is_some())
            .finish()
    }
}

impl Default for Checker<'_> {
    fn default() -> Self {
        Checker {
            config: CompatibleConfig::default(),
            classes: None,
        }
    }
}

/// `T[]` spelling of a lazy array, applied per dimension.
fn array_form(typ: &str) -> String {
    let mut elem = typ.to_owned();
    let mut dims = 0;
    while lazy_tag(&elem) == Some(LazyTag::ArrayOf) {
        elem = unwrap_array_of(&elem);
        dims += 1;
    }
    elem.push_str(&"[]".repeat(dims));
    elem
}

fn is_class_like(typ: &str) -> bool {
    typ == "object" || is_class(typ)
}

impl<'h> Checker<'h> {
    pub fn new(config: CompatibleConfig, classes: &'h dyn ClassHierarchy) -> Self {
        Checker {
            config,
            classes: Some(classes),
        }
    }

    pub fn without_hierarchy(config: CompatibleConfig) -> Self {
        Checker {
            config,
            classes: None,
        }
    }

    pub fn config(&self) -> CompatibleConfig {
        self.config
    }

    /// Check two type sets.
    pub fn check(&self, t1: &Map, t2: &Map) -> CompatibleResult {
        self.check_sets(t1, t2).for_maps(t1, t2)
    }

    /// Check two single type strings in `T[]` or storage form.
    pub fn check_type(&self, t1: &str, t2: &str) -> CompatibleResult {
        let (m1, m2) = (Map::new(t1), Map::new(t2));
        self.compatible_type(&array_form(t1), &array_form(t2))
            .for_maps(&m1, &m2)
    }

    fn check_sets(&self, t1: &Map, t2: &Map) -> CompatibleResult {
        if t1.is_empty() || t2.is_empty() {
            return CompatibleResult::ok();
        }

        let s1: Vec<String> = t1.iter().map(array_form).collect();
        let s2: Vec<String> = t2.iter().map(array_form).collect();

        match (s1.as_slice(), s2.as_slice()) {
            ([a], [b]) => self.compatible_type(a, b),
            ([one], many) => self.one_with_many(one, &s1, many, Side::First),
            (many, [one]) => self.one_with_many(one, &s2, many, Side::Second),
            _ => self.many_with_many(&s1, &s2),
        }
    }

    fn one_with_many(
        &self,
        one: &str,
        ones: &[String],
        many: &[String],
        side: Side,
    ) -> CompatibleResult {
        if many.len() > self.config.max_union_size {
            tracing::debug!(size = many.len(), "union too large to compare");
            return CompatibleResult::ok();
        }
        if one == "mixed" || many.iter().any(|t| t == "mixed") {
            return CompatibleResult::ok();
        }

        if !self.config.union_strict {
            let matched = many.iter().any(|t| match side {
                Side::First => self.compatible_type(one, t).compatible,
                Side::Second => self.compatible_type(t, one).compatible,
            });
            return if matched {
                CompatibleResult::ok()
            } else {
                CompatibleResult::fail()
            };
        }

        let many_nullable = many.iter().any(|t| t == "null");
        if one == "null" {
            return if many_nullable {
                CompatibleResult::ok()
            } else {
                CompatibleResult::fail_with(Relation::NullToNotNullable)
            };
        }
        let (t1_nullable, t2_nullable) = match side {
            Side::First => (has_null(ones), many_nullable),
            Side::Second => (many_nullable, has_null(ones)),
        };
        if t1_nullable && !t2_nullable {
            return CompatibleResult::fail_with(Relation::ExtraNullable);
        }
        if !t1_nullable && t2_nullable {
            return CompatibleResult::fail_with(Relation::LostNullable);
        }
        CompatibleResult::fail()
    }

    fn many_with_many(&self, t1: &[String], t2: &[String]) -> CompatibleResult {
        let max = self.config.max_union_size;
        if t1.len() > max || t2.len() > max {
            tracing::debug!(t1 = t1.len(), t2 = t2.len(), "union too large to compare");
            return CompatibleResult::ok();
        }

        if self.config.union_strict {
            match (has_null(t1), has_null(t2)) {
                (true, false) => return CompatibleResult::fail_with(Relation::ExtraNullable),
                (false, true) => return CompatibleResult::fail_with(Relation::LostNullable),
                _ => {}
            }
            // Both sides come sorted from `Map::iter`.
            return if t1 == t2 {
                CompatibleResult::ok()
            } else {
                CompatibleResult::fail()
            };
        }

        let covered = t2
            .iter()
            .all(|b| t1.iter().any(|a| self.compatible_type(a, b).compatible));
        if covered {
            CompatibleResult::ok()
        } else {
            CompatibleResult::fail_with(Relation::UnionNotInOtherUnion)
        }
    }

    fn compatible_type(&self, t1: &str, t2: &str) -> CompatibleResult {
        if t1 == "mixed" || t2 == "mixed" {
            return CompatibleResult::ok();
        }
        let t1 = alias(t1).unwrap_or(t1);
        let t2 = alias(t2).unwrap_or(t2);

        if is_pod(t1) && is_pod(t2) {
            return compatible_pod(t1, t2);
        }

        if (t1 == "iterable" && is_class(t2)) || (t2 == "iterable" && is_class(t1)) {
            return CompatibleResult::ok();
        }
        match (is_class_like(t1), is_class_like(t2)) {
            (true, true) => return self.compatible_class(t1, t2),
            (true, false) => return CompatibleResult::fail_with(Relation::ClassAndNotClass),
            (false, true) => return CompatibleResult::fail_with(Relation::NotClassAndClass),
            (false, false) => {}
        }

        match (is_array(t1), is_array(t2)) {
            (true, true) => {
                let (e1, e2) = (array_element_type(t1), array_element_type(t2));
                let inner = verity_stack::ensure_sufficient_stack(|| self.compatible_type(e1, e2));
                if inner.compatible {
                    return CompatibleResult::ok();
                }
                let inner = inner.for_maps(&Map::new(e1), &Map::new(e2));
                return CompatibleResult::fail_with(Relation::ArraysTypeMismatch(Box::new(inner)));
            }
            (true, false) if t2 == "iterable" => return CompatibleResult::ok(),
            (true, false) => return CompatibleResult::fail_with(Relation::ArrayAndType),
            (false, true) if t1 == "iterable" => return CompatibleResult::ok(),
            (false, true) => return CompatibleResult::fail_with(Relation::TypeAndArray),
            (false, false) => {}
        }

        if (t1 == "iterable") != (t2 == "iterable") {
            return CompatibleResult::fail();
        }
        CompatibleResult::ok()
    }

    fn compatible_class(&self, t1: &str, t2: &str) -> CompatibleResult {
        if t1 == t2 || t1 == "object" || t2 == "object" {
            return CompatibleResult::ok();
        }
        let Some(classes) = self.classes else {
            return CompatibleResult::ok();
        };
        let (Some(c1), Some(c2)) = (classes.class_data(t1), classes.class_data(t2)) else {
            return CompatibleResult::ok();
        };

        if c1.is_interface {
            let implements = implements(classes, c2, &c1.name);
            return CompatibleResult::verdict(implements, Some(Relation::InterfaceAndClass));
        }
        if c2.is_interface {
            let implements = implements(classes, c1, &c2.name);
            return CompatibleResult::verdict(implements, Some(Relation::ClassAndInterface));
        }

        if extends(classes, c1, &c2.name) {
            CompatibleResult::ok_with(Relation::ClassAndParent)
        } else if extends(classes, c2, &c1.name) {
            CompatibleResult::ok_with(Relation::ParentAndClass)
        } else {
            CompatibleResult::fail()
        }
    }
}

#[derive(Copy, Clone)]
enum Side {
    /// The singleton is `t1`.
    First,
    /// The singleton is `t2`.
    Second,
}

fn has_null(types: &[String]) -> bool {
    types.iter().any(|t| t == "null")
}

fn compatible_pod(t1: &str, t2: &str) -> CompatibleResult {
    match (t1, t2) {
        ("int", "float") => CompatibleResult::fail_with(Relation::IntFloat),
        ("float", "int") => CompatibleResult::fail_with(Relation::FloatInt),
        ("bool", "bool" | "true") | ("true", "bool") => CompatibleResult::ok(),
        ("bool", "false") => CompatibleResult::fail_with(Relation::BoolFalse),
        ("false", "bool") => CompatibleResult::fail_with(Relation::FalseBool),
        ("bool", _) | (_, "bool") => CompatibleResult::fail(),
        _ if t1 == t2 => CompatibleResult::ok(),
        _ => CompatibleResult::fail(),
    }
}

/// Whether `class` is `parent` or inherits from it. A parent missing from
/// the hierarchy counts as a match.
fn extends(classes: &dyn ClassHierarchy, class: &ClassData, parent: &str) -> bool {
    let mut seen = FxHashSet::default();
    let mut current = class;
    loop {
        if current.name == parent {
            return true;
        }
        if !seen.insert(current.name.as_str()) {
            return false;
        }
        let Some(next) = current.parent.as_deref() else {
            return false;
        };
        match classes.class_data(next) {
            Some(data) => current = data,
            None => return true,
        }
    }
}

/// Whether `class` implements `iface` through its own interfaces, its
/// parents, or interfaces extended by those.
fn implements(classes: &dyn ClassHierarchy, class: &ClassData, iface: &str) -> bool {
    let mut seen = FxHashSet::default();
    let mut queue = vec![class];
    while let Some(data) = queue.pop() {
        if !seen.insert(data.name.as_str()) {
            continue;
        }
        for name in &data.interfaces {
            if name == iface {
                return true;
            }
            if let Some(parent_iface) = classes.class_data(name) {
                queue.push(parent_iface);
            }
        }
        if let Some(parent) = data.parent.as_deref().and_then(|p| classes.class_data(p)) {
            queue.push(parent);
        }
    }
    false
}

/// Check two single types without class hierarchy data.
pub fn compatible_type(t1: &str, t2: &str) -> CompatibleResult {
    Checker::default().check_type(t1, t2)
}
