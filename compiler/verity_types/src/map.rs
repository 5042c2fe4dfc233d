//! Type Map: a union of type strings with precision tracking.
//!
//! Array depth is folded into the lazy `array_of` encoding, so `int[]` is
//! stored as `wrap_array_of("int")`. A map is either mutable, where
//! [`Map::union`] may update the backing set in place, or immutable, where
//! every update allocates. Maps shared between threads or stored in
//! long-lived metadata should be made immutable first.

use std::fmt;
use std::sync::{Arc, OnceLock};

use bitflags::bitflags;
use rustc_hash::FxHashSet;

use crate::lazy::{format_type, lazy_tag, unwrap_array_of, wrap_array_of, LazyTag};
use crate::predicates::{array_element_type, is_array};
use crate::{Normalizer, Type};

bitflags! {
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
    pub struct MapFlags: u8 {
        /// Updates copy instead of mutating the shared set.
        const IMMUTABLE = 1 << 0;
        /// Every type comes from a definite source such as a literal.
        /// A precise map contains no lazy types.
        const PRECISE = 1 << 1;
    }
}

type TypeSet = FxHashSet<String>;

#[derive(Clone)]
#[cfg_attr(
    feature = "cache",
    derive(serde::Serialize, serde::Deserialize),
    serde(from = "MapRepr", into = "MapRepr")
)]
pub struct Map {
    flags: MapFlags,
    types: Option<Arc<TypeSet>>,
}

/// Normalizes a type string for storage: `T[]` suffixes become nested
/// `array_of` encodings.
fn storage_form(s: &str) -> String {
    if is_array(s) {
        wrap_array_of(&storage_form(array_element_type(s)))
    } else {
        s.to_owned()
    }
}

impl Map {
    /// Empty, mutable, imprecise map.
    pub fn empty() -> Self {
        Map::default()
    }

    /// Parses a `|`-separated list such as `int|\Foo[]`. Empty parts are
    /// skipped.
    pub fn new(s: &str) -> Self {
        let set: TypeSet = s
            .split('|')
            .filter(|part| !part.is_empty())
            .map(storage_form)
            .collect();
        Map::from_set(set, MapFlags::empty())
    }

    pub fn new_precise(s: &str) -> Self {
        let mut m = Map::new(s);
        m.flags |= MapFlags::PRECISE;
        m
    }

    pub fn from_types(types: &[Type]) -> Self {
        let set: TypeSet = types.iter().map(Type::to_lazy_string).collect();
        Map::from_set(set, MapFlags::empty())
    }

    /// Normalizes `types` and builds a map from the result.
    pub fn from_types_normalized(normalizer: &Normalizer<'_>, mut types: Vec<Type>) -> Self {
        normalizer.normalize_types(&mut types);
        Map::from_types(&types)
    }

    /// Builds from raw storage strings, which are taken as-is.
    pub fn from_strings<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: TypeSet = types.into_iter().map(Into::into).collect();
        Map::from_set(set, MapFlags::empty())
    }

    fn from_set(set: TypeSet, flags: MapFlags) -> Self {
        let types = if set.is_empty() {
            None
        } else {
            Some(Arc::new(set))
        };
        Map { flags, types }
    }

    /// Union of all `maps`.
    pub fn merge<'a>(maps: impl IntoIterator<Item = &'a Map>) -> Self {
        maps.into_iter().fold(Map::empty(), |acc, m| acc.union(m))
    }

    pub fn flags(&self) -> MapFlags {
        self.flags
    }

    /// Whether the types are definite enough for typecheck-like analysis.
    /// Adding an imprecise type makes the whole map imprecise.
    pub fn is_precise(&self) -> bool {
        self.flags.contains(MapFlags::PRECISE)
    }

    pub fn mark_as_imprecise(&mut self) {
        self.flags.remove(MapFlags::PRECISE);
    }

    pub fn is_immutable(&self) -> bool {
        self.flags.contains(MapFlags::IMMUTABLE)
    }

    /// `true` guarantees the map holds no lazy types; `false` carries no
    /// information.
    pub fn is_resolved(&self) -> bool {
        self.is_precise()
    }

    /// Immutable view sharing the same backing set.
    pub fn immutable(&self) -> Self {
        Map {
            flags: self.flags | MapFlags::IMMUTABLE,
            types: self.types.clone(),
        }
    }

    /// Mutable copy with its own backing set.
    pub fn clone_mutable(&self) -> Self {
        Map {
            flags: self.flags.difference(MapFlags::IMMUTABLE),
            types: self.types.as_deref().map(|set| Arc::new(set.clone())),
        }
    }

    pub fn len(&self) -> usize {
        self.types.as_ref().map_or(0, |set| set.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn set(&self) -> impl Iterator<Item = &String> {
        self.types.iter().flat_map(|set| set.iter())
    }

    fn only(&self) -> Option<&str> {
        match &self.types {
            Some(set) if set.len() == 1 => set.iter().next().map(String::as_str),
            _ => None,
        }
    }

    /// Union of `self` and `other`.
    ///
    /// An empty side yields the other side unchanged. A mutable `self` is
    /// updated in place and becomes imprecise. An immutable `self` is copied
    /// into a new mutable map that stays precise only if both inputs were.
    #[must_use]
    pub fn union(mut self, other: &Map) -> Map {
        if self.is_empty() {
            return other.clone();
        }
        let Some(theirs) = other.types.as_deref() else {
            return self;
        };

        if !self.is_immutable() {
            self.mark_as_imprecise();
            if let Some(ours) = self.types.as_mut() {
                Arc::make_mut(ours).extend(theirs.iter().cloned());
            }
            return self;
        }

        let mut set = TypeSet::default();
        set.reserve(self.len() + theirs.len());
        set.extend(self.set().cloned());
        set.extend(theirs.iter().cloned());
        let flags = if self.is_precise() && other.is_precise() {
            MapFlags::PRECISE
        } else {
            MapFlags::empty()
        };
        Map::from_set(set, flags)
    }

    pub fn contains(&self, typ: &str) -> bool {
        self.types.as_ref().is_some_and(|set| set.contains(typ))
    }

    /// Exactly one type, equal to `typ` (a storage string).
    pub fn is(&self, typ: &str) -> bool {
        self.only() == Some(typ)
    }

    /// Exactly one type, and it is a lazy array.
    pub fn is_lazy_array(&self) -> bool {
        self.only()
            .is_some_and(|t| lazy_tag(t) == Some(LazyTag::ArrayOf))
    }

    pub fn is_lazy_array_of(&self, elem: &str) -> bool {
        self.is(&wrap_array_of(elem))
    }

    /// Exactly one type, and it uses the `T[]` spelling.
    pub fn is_array(&self) -> bool {
        self.only().is_some_and(is_array)
    }

    /// Types in lexicographic order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let mut keys: Vec<&str> = self.set().map(String::as_str).collect();
        keys.sort_unstable();
        keys.into_iter()
    }

    /// Whether `pred` holds for any type, tried in sorted order.
    pub fn find(&self, mut pred: impl FnMut(&str) -> bool) -> bool {
        self.iter().any(|t| pred(t))
    }

    /// New imprecise map with `f` applied to every type.
    pub fn map(&self, f: impl FnMut(&str) -> String) -> Map {
        let set: TypeSet = self.set().map(String::as_str).map(f).collect();
        Map::from_set(set, MapFlags::empty())
    }

    /// New imprecise map with the types for which `pred` holds.
    pub fn filter(&self, mut pred: impl FnMut(&str) -> bool) -> Map {
        let set: TypeSet = self.set().filter(|t| pred(t)).cloned().collect();
        Map::from_set(set, MapFlags::empty())
    }

    /// Element type of a lazy array map: `T[]` gives `T`, `T[][]` gives
    /// `T[]`. Members that are not arrays are skipped; a map with no array
    /// member gives `mixed`.
    pub fn lazy_array_elem_type(&self) -> Map {
        let set: TypeSet = self
            .set()
            .filter(|t| lazy_tag(t) == Some(LazyTag::ArrayOf))
            .map(|t| unwrap_array_of(t))
            .collect();
        if set.is_empty() {
            return mixed().clone();
        }
        Map::from_set(set, self.flags.difference(MapFlags::IMMUTABLE))
    }
}

impl Default for Map {
    fn default() -> Self {
        Map {
            flags: MapFlags::empty(),
            types: None,
        }
    }
}

impl PartialEq for Map {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.set().all(|t| other.contains(t))
    }
}

impl Eq for Map {}

/// Sorted, `|`-joined, with lazy types rendered by
/// [`format_type`](crate::format_type).
impl fmt::Display for Map {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<String> = self.set().map(|t| format_type(t)).collect();
        types.sort_unstable();
        f.write_str(&types.join("|"))
    }
}

impl fmt::Debug for Map {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Map({self}, {:?})", self.flags)
    }
}

impl From<&str> for Map {
    fn from(s: &str) -> Self {
        Map::new(s)
    }
}

macro_rules! shared_map {
    ($(#[$meta:meta])* $name:ident, $ctor:ident, $text:literal) => {
        $(#[$meta])*
        pub fn $name() -> &'static Map {
            static MAP: OnceLock<Map> = OnceLock::new();
            MAP.get_or_init(|| Map::$ctor($text).immutable())
        }
    };
}

shared_map!(
    /// Shared immutable `mixed`.
    mixed, new, "mixed"
);
shared_map!(void, new, "void");
shared_map!(null, new, "null");
shared_map!(precise_int, new_precise, "int");
shared_map!(precise_float, new_precise, "float");
shared_map!(precise_bool, new_precise, "bool");
shared_map!(precise_string, new_precise, "string");

#[cfg(feature = "cache")]
#[derive(serde::Serialize, serde::Deserialize)]
struct MapRepr {
    flags: u8,
    types: Vec<String>,
}

#[cfg(feature = "cache")]
impl From<Map> for MapRepr {
    fn from(m: Map) -> Self {
        MapRepr {
            flags: m.flags.bits(),
            types: m.iter().map(str::to_owned).collect(),
        }
    }
}

#[cfg(feature = "cache")]
impl From<MapRepr> for Map {
    fn from(repr: MapRepr) -> Self {
        Map::from_set(
            repr.types.into_iter().collect(),
            MapFlags::from_bits_truncate(repr.flags),
        )
    }
}

#[cfg(test)]
mod tests;
