use pretty_assertions::assert_eq;
use proptest::prelude::*;

use super::*;

#[test]
fn base_method_param_format() {
    let s = wrap_base_method_param(124, "FooClass", "barMethod");
    assert_eq!(format_type(&s), "param(FooClass)::barMethod[124]");
    assert_eq!(
        unwrap_base_method_param(&s),
        (124, "FooClass".to_owned(), "barMethod".to_owned())
    );
}

#[test]
fn long_array_of() {
    let elem = "a".repeat(124);
    let s = wrap_array_of(&elem);
    assert_eq!(lazy_tag(&s), Some(LazyTag::ArrayOf));
    assert_eq!(&s[1..5], "7c00");
    assert_eq!(unwrap_array_of(&s), elem);
    assert_eq!(format_type(&s), format!("{elem}[]"));
}

#[test]
fn wire_layout() {
    assert_eq!(wrap_function_call("\\f"), "\u{5}0200\\f");
    assert_eq!(wrap_base_method_param(255, "A", "b"), "\u{b}ff0100A0100b");
}

#[test]
fn formats() {
    let cases = [
        (wrap_global("x"), "global_$x"),
        (wrap_constant("\\FOO"), "constant(\\FOO)"),
        (wrap_array_of("int"), "int[]"),
        (wrap_elem_of("\\Foo"), "elem(\\Foo)"),
        (wrap_elem_of_key("\\Foo", "k"), "elem(\\Foo)[k]"),
        (wrap_function_call("\\f"), "\\f()"),
        (wrap_instance_method_call("\\Foo", "m"), "(\\Foo)->m()"),
        (wrap_instance_property_fetch("\\Foo", "p"), "(\\Foo)->p"),
        (wrap_static_method_call("\\Foo", "m"), "\\Foo::m()"),
        (wrap_static_property_fetch("\\Foo", "p"), "\\Foo::$p"),
        (wrap_class_const_fetch("\\Foo", "K"), "\\Foo::K"),
    ];
    for (encoded, want) in cases {
        assert_eq!(format_type(&encoded), want);
    }
}

#[test]
fn nested_format() {
    let inner = wrap_static_method_call("\\Foo", "get");
    let outer = wrap_instance_property_fetch(&inner, "items");
    let arr = wrap_array_of(&outer);
    assert_eq!(format_type(&arr), "(\\Foo::get())->items[]");
}

#[test]
fn resolved_names_format_unchanged() {
    assert_eq!(format_type("\\Foo"), "\\Foo");
    assert_eq!(format_type("int[]"), "int[]");
    assert_eq!(format_type(""), "");
}

#[test]
fn static_property_gets_dollar_once() {
    let with = wrap_static_property_fetch("\\A", "$x");
    let without = wrap_static_property_fetch("\\A", "x");
    assert_eq!(with, without);
    assert_eq!(unwrap_static_property_fetch(&with).1, "$x");
}

#[test]
fn elem_of_array_collapses() {
    let arr = wrap_array_of("\\Foo");
    assert_eq!(wrap_elem_of(&arr), "\\Foo");
    assert_eq!(wrap_elem_of_key(&arr, "k"), "\\Foo");

    let nested = wrap_array_of(&wrap_array_of("int"));
    assert_eq!(wrap_elem_of(&nested), wrap_array_of("int"));
}

#[test]
fn elem_of_keeps_non_array_operand() {
    let s = wrap_elem_of("\\Foo");
    assert_eq!(lazy_tag(&s), Some(LazyTag::ElemOf));
    assert_eq!(unwrap_elem_of(&s), "\\Foo");
    assert_eq!(format_type(&s), "elem(\\Foo)");

    let global = wrap_global("list");
    assert_eq!(unwrap_elem_of(&wrap_elem_of(&global)), global);
}

#[test]
fn elem_of_array_of_is_its_element() {
    for elem in ["int", "\\Foo", "mixed"] {
        assert_eq!(wrap_elem_of(&wrap_array_of(elem)), elem);
        assert_eq!(wrap_elem_of_key(&wrap_array_of(elem), "id"), elem);
    }
    let call = wrap_static_method_call("\\Repo", "all");
    assert_eq!(wrap_elem_of(&wrap_array_of(&call)), call);
}

#[test]
fn oversized_leading_field_encodes_as_mixed() {
    let long = "A".repeat(70_000);
    assert_eq!(wrap_static_method_call(&long, "m"), "mixed");
    assert_eq!(wrap_elem_of_key(&long, "k"), "mixed");
    assert_eq!(wrap_base_method_param(1, &long, "m"), "mixed");
    let lazy = LazyType::InstanceMethodCall {
        expr: long.clone(),
        method: "m".to_owned(),
    };
    assert_eq!(lazy.encode(), "mixed");

    // A field of exactly u16::MAX bytes still fits.
    let max = "A".repeat(usize::from(u16::MAX));
    let s = wrap_static_method_call(&max, "m");
    assert_eq!(unwrap_static_method_call(&s), (max, "m".to_owned()));
}

#[test]
fn oversized_last_field_round_trips() {
    let long = "a".repeat(70_000);
    assert_eq!(unwrap_function_call(&wrap_function_call(&long)), long);
    let s = wrap_static_method_call("\\A", &long);
    assert_eq!(unwrap_static_method_call(&s), ("\\A".to_owned(), long));
}

#[test]
fn array2_drops_key() {
    assert_eq!(wrap_array2("int", "string"), wrap_array_of("string"));
}

#[test]
fn unwrap_wrong_kind_is_default() {
    let s = wrap_global("x");
    assert_eq!(unwrap_constant(&s), "");
    assert_eq!(unwrap_static_method_call(&s), (String::new(), String::new()));
    assert_eq!(unwrap_function_call("\\Foo"), "");
}

#[test]
fn decode_errors() {
    assert_eq!(LazyType::decode(""), Err(DecodeError::Empty));
    assert_eq!(LazyType::decode("int"), Err(DecodeError::NotLazy(b'i')));
    assert_eq!(
        LazyType::decode("\u{0}02"),
        Err(DecodeError::Truncated { at: 1 })
    );
    assert_eq!(
        LazyType::decode("\u{0}zz00"),
        Err(DecodeError::BadHex { at: 1 })
    );
    assert_eq!(
        LazyType::decode("\u{0}0900Ab0000"),
        Err(DecodeError::Truncated { at: 5 })
    );
}

#[test]
fn undecodable_formats_as_panic_marker() {
    let got = format_type("\u{0}zz");
    assert_eq!(got, "panic!(orig='\u{0}zz', hex='007a7a')");
}

#[test]
fn decode_matches_encode() {
    let lazy = LazyType::ElemOfKey {
        expr: wrap_global("arr"),
        key: "id".to_owned(),
    };
    let s = lazy.encode();
    assert_eq!(LazyType::decode(&s), Ok(lazy));
}

#[test]
fn tag_names() {
    assert_eq!(format!("{:?}", LazyTag::ArrayOf), "LazyTag::array_of");
    assert_eq!(LazyTag::from_byte(LAZY_TAG_MAX), None);
    for b in 0..LAZY_TAG_MAX {
        assert_eq!(LazyTag::from_byte(b).map(|t| t as u8), Some(b));
    }
}

fn any_lazy() -> impl Strategy<Value = LazyType> {
    let s = || "[a-zA-Z0-9_\\\\$]{0,40}";
    prop_oneof![
        (s(), s()).prop_map(|(class, method)| LazyType::StaticMethodCall { class, method }),
        (s(), s()).prop_map(|(expr, method)| LazyType::InstanceMethodCall { expr, method }),
        (s(), s()).prop_map(|(class, constant)| LazyType::ClassConstFetch { class, constant }),
        (s(), s()).prop_map(|(expr, prop)| LazyType::InstancePropertyFetch { expr, prop }),
        (s(), s()).prop_map(|(class, prop)| LazyType::StaticPropertyFetch { class, prop }),
        (s(), s()).prop_map(|(expr, key)| LazyType::ElemOfKey { expr, key }),
        s().prop_map(|expr| LazyType::ElemOf { expr }),
        s().prop_map(|name| LazyType::FunctionCall { name }),
        s().prop_map(|elem| LazyType::ArrayOf { elem }),
        s().prop_map(|name| LazyType::Global { name }),
        s().prop_map(|name| LazyType::Constant { name }),
        (any::<u8>(), s(), s()).prop_map(|(index, class, method)| {
            LazyType::BaseMethodParam {
                index,
                class,
                method,
            }
        }),
    ]
}

proptest! {
    #[test]
    fn encoded_types_never_split_on_union_separator(lazy in any_lazy()) {
        let s = lazy.encode();
        prop_assert!(!s.contains('|'));
        prop_assert!(is_lazy(&s));
        prop_assert_eq!(LazyType::decode(&s), Ok(lazy));
    }

    #[test]
    fn base_method_param_index_survives(index in prop::sample::select(vec![0u8, 1, 127, 254, 255])) {
        let s = wrap_base_method_param(index, "\\A", "m");
        prop_assert_eq!(unwrap_base_method_param(&s).0, index);
    }

    #[test]
    fn unicode_fields_survive(a in "\\PC{0,12}", b in "\\PC{0,12}") {
        let s = wrap_elem_of_key(&wrap_global(&a), &b);
        let (expr, key) = unwrap_elem_of_key(&s);
        prop_assert_eq!(unwrap_global(&expr), a);
        prop_assert_eq!(key, b);
    }
}
