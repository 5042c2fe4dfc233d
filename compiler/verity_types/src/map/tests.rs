use pretty_assertions::assert_eq;
use rayon::prelude::*;

use super::*;

#[test]
fn parse_and_display() {
    let m = Map::new("int|\\Foo[]|null");
    assert_eq!(m.len(), 3);
    assert!(m.contains("int"));
    assert!(m.contains(&wrap_array_of("\\Foo")));
    assert!(!m.contains("\\Foo[]"));
    assert_eq!(m.to_string(), "\\Foo[]|int|null");
}

#[test]
fn nested_arrays_wrap_per_dimension() {
    let m = Map::new("int[][]");
    assert!(m.is(&wrap_array_of(&wrap_array_of("int"))));
    assert_eq!(m.to_string(), "int[][]");
    assert_eq!(m, Map::from_types(&[Type::array_of("int", 2)]));
}

#[test]
fn empty_parts_are_skipped() {
    assert!(Map::new("").is_empty());
    assert_eq!(Map::new("|int||"), Map::new("int"));
    assert_eq!(Map::new("").to_string(), "");
}

#[test]
fn display_is_order_independent() {
    let a = Map::new("string|int|\\A|null|float");
    let b = Map::new("null|float|\\A|int|string");
    assert_eq!(a.to_string(), b.to_string());
    assert_eq!(a, b);
}

#[test]
fn single_lazy_element_is_formatted() {
    let m = Map::from_strings([crate::lazy::wrap_global("x")]);
    assert_eq!(m.to_string(), "global_$x");
}

#[test]
fn equality_is_set_equality() {
    assert_eq!(Map::new("a|b"), Map::new("b|a"));
    assert_ne!(Map::new("a|b"), Map::new("a"));
    assert_ne!(Map::new("a|b"), Map::new("a|c"));
    assert_eq!(Map::new("a"), Map::new("a").immutable());
}

#[test]
fn union_with_empty_returns_other() {
    let int = precise_int().clone();
    let got = Map::empty().union(&int);
    assert!(got.is_precise());
    assert!(got.is_immutable());

    let got = int.clone().union(&Map::empty());
    assert_eq!(got.flags(), int.flags());
}

#[test]
fn mutable_union_is_imprecise() {
    let m = Map::new_precise("int").union(&Map::new_precise("float"));
    assert_eq!(m.to_string(), "float|int");
    assert!(!m.is_precise());
    assert!(!m.is_immutable());
}

#[test]
fn immutable_union_keeps_precision() {
    let m = precise_int().clone().union(precise_float());
    assert_eq!(m.to_string(), "float|int");
    assert!(m.is_precise());
    assert!(!m.is_immutable());

    let m = precise_int().clone().union(&Map::new("float"));
    assert!(!m.is_precise());
}

#[test]
fn immutable_union_does_not_touch_receiver() {
    let base = Map::new("int").immutable();
    let alias = base.clone();
    let grown = base.union(&Map::new("string"));
    assert_eq!(grown.len(), 2);
    assert_eq!(alias.to_string(), "int");
    assert_eq!(precise_int().to_string(), "int");
}

#[test]
fn mutable_union_copies_shared_set() {
    let a = Map::new("int");
    let b = a.clone();
    let grown = a.union(&Map::new("string"));
    assert_eq!(grown.len(), 2);
    assert_eq!(b.len(), 1);
}

#[test]
fn union_is_commutative_and_idempotent() {
    let a = Map::new("int|\\A");
    let b = Map::new("null|\\A");
    assert_eq!(a.clone().union(&b), b.clone().union(&a));
    assert_eq!(a.clone().union(&a), a);
}

#[test]
fn merge_many() {
    let maps = [Map::new("int"), Map::empty(), Map::new("float|int"), Map::new("null")];
    assert_eq!(Map::merge(&maps).to_string(), "float|int|null");
    assert!(Map::merge(std::iter::empty()).is_empty());
}

#[test]
fn membership() {
    let m = Map::new("\\Foo");
    assert!(m.is("\\Foo"));
    assert!(!Map::new("\\Foo|null").is("\\Foo"));
    assert!(!Map::empty().contains("\\Foo"));
}

#[test]
fn array_checks() {
    assert!(Map::new("int[]").is_lazy_array());
    assert!(Map::new("int[]").is_lazy_array_of("int"));
    assert!(!Map::new("int[]").is_lazy_array_of("float"));
    assert!(!Map::new("int[]|null").is_lazy_array());
    assert!(!Map::new("int[]").is_array());
    assert!(Map::from_strings(["int[]"]).is_array());
}

#[test]
fn sorted_iteration() {
    let m = Map::new("c|a|b");
    assert_eq!(m.iter().collect::<Vec<_>>(), ["a", "b", "c"]);

    let mut seen = Vec::new();
    assert!(m.find(|t| {
        seen.push(t.to_owned());
        t == "b"
    }));
    assert_eq!(seen, ["a", "b"]);
    assert!(!m.find(|t| t == "z"));
}

#[test]
fn map_and_filter_are_imprecise() {
    let m = Map::new_precise("int|string");
    let upper = m.map(str::to_uppercase);
    assert_eq!(upper.to_string(), "INT|STRING");
    assert!(!upper.is_precise());

    let only_int = m.filter(|t| t == "int");
    assert_eq!(only_int.to_string(), "int");
    assert!(!only_int.is_precise());
}

#[test]
fn lazy_array_elem_type() {
    assert_eq!(Map::new("int[]|\\A[][]").lazy_array_elem_type(), Map::new("int|\\A[]"));
    assert_eq!(Map::empty().lazy_array_elem_type(), *mixed());
}

#[test]
fn lazy_array_elem_type_skips_scalars() {
    assert_eq!(Map::new("int|string[]").lazy_array_elem_type(), Map::new("string"));
    assert_eq!(Map::new("null|\\A[][]").lazy_array_elem_type(), Map::new("\\A[]"));
    assert_eq!(Map::new("int|\\A").lazy_array_elem_type(), *mixed());
    assert!(!Map::new("int|string[]")
        .lazy_array_elem_type()
        .iter()
        .any(str::is_empty));
}

#[test]
fn precision_flags() {
    let mut m = Map::new_precise("int");
    assert!(m.is_precise());
    assert!(m.is_resolved());
    m.mark_as_imprecise();
    assert!(!m.is_precise());
    assert!(!m.is_resolved());
}

#[test]
fn clone_mutable_detaches() {
    let shared = null().clone_mutable();
    assert!(!shared.is_immutable());
    let grown = shared.union(&Map::new("int"));
    assert_eq!(grown.to_string(), "int|null");
    assert_eq!(null().to_string(), "null");
}

#[test]
fn shared_constants() {
    assert!(mixed().is("mixed"));
    assert!(void().is("void"));
    assert!(precise_bool().is_precise());
    assert!(precise_string().is_immutable());
    assert!(!mixed().is_precise());
}

#[test]
fn concurrent_reads_of_immutable_map() {
    let m = Map::new("int|string|\\A|\\B[]").immutable();
    let rendered: Vec<String> = (0..64)
        .into_par_iter()
        .map(|i| {
            let local = m.clone().union(&Map::new(&format!("\\T{}", i % 4)));
            assert_eq!(local.len(), 5);
            m.to_string()
        })
        .collect();
    assert!(rendered.iter().all(|s| s == "\\A|\\B[]|int|string"));
    assert_eq!(m.len(), 4);
}

#[cfg(feature = "cache")]
#[test]
fn persist_round_trip() {
    let m = Map::new_precise("int|\\Foo[]").immutable();
    let bytes = bincode::serialize(&m).unwrap();
    let back: Map = bincode::deserialize(&bytes).unwrap();
    assert_eq!(back, m);
    assert_eq!(back.flags(), m.flags());
    assert_eq!(back.to_string(), "\\Foo[]|int");
}
