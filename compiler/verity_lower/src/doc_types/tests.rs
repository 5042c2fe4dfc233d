use pretty_assertions::assert_eq;
use verity_doc::{parse_comment, TypeParser};

use super::*;

fn resolve(name: &str) -> Option<String> {
    match name {
        "Foo" => Some("\\App\\Foo".to_owned()),
        _ => None,
    }
}

fn doc_types(raw: &str, actual: &[&str]) -> DocTypes {
    let comment = parse_comment(&mut TypeParser::new(), raw);
    DocTypes::from_comment(&comment, actual, &Normalizer::new(Some(&resolve), false))
}

fn param(out: &DocTypes, name: &str) -> Param {
    match out.params.get(name) {
        Some(p) => p.clone(),
        None => panic!("no @param {name} in {:?}", out.params.keys().collect::<Vec<_>>()),
    }
}

#[test]
fn params_and_return() {
    let out = doc_types(
        "/**
          * Sums things.
          *
          * @param int $a first
          * @param ?Foo $b [optional] second
          * @param array $c
          * @return int|float
          */",
        &["a", "b", "c"],
    );

    assert_eq!(out.params.len(), 3);
    assert_eq!(param(&out, "a"), Param { optional: false, typ: Map::new("int") });
    assert_eq!(
        param(&out, "b"),
        Param {
            optional: true,
            typ: Map::new("\\App\\Foo|null"),
        }
    );
    assert_eq!(param(&out, "c").typ, Map::new("mixed[]"));
    assert_eq!(out.return_type, Map::new("int|float"));
    assert!(out.return_type.is_immutable());
    assert_eq!(out.warnings, Vec::<DocWarning>::new());
    assert!(!out.inherit);
}

#[test]
fn return_is_immutable_even_when_absent() {
    let out = doc_types("/** @param int $a */", &["a"]);
    assert!(out.return_type.is_empty());
    assert!(out.return_type.is_immutable());
}

#[test]
fn params_without_variable_bind_by_position() {
    let out = doc_types(
        "/**
          * @param $first int
          * @param string
          * @param float
          */",
        &["x", "y", "z"],
    );
    assert_eq!(param(&out, "first").typ, Map::new("int"));
    // The named tag still takes up the first position.
    assert_eq!(param(&out, "y").typ, Map::new("string"));
    assert_eq!(param(&out, "z").typ, Map::new("float"));
    assert!(!out.params.contains_key("x"));
}

#[test]
fn positional_param_past_the_signature_keeps_empty_name() {
    let out = doc_types("/** @param int */", &[]);
    assert_eq!(param(&out, "").typ, Map::new("int"));
}

#[test]
fn deprecation() {
    let out = doc_types(
        "/**
          * @see ignored
          * @deprecated since 2.0
          * @see bar()
          * @see baz()
          * @removed in 3.0
          */",
        &[],
    );
    assert_eq!(
        out.deprecation,
        DeprecationInfo {
            deprecated: true,
            removed: true,
            reason: "since 2.0".to_owned(),
            removed_reason: "in 3.0".to_owned(),
            replacement: "bar() or baz()".to_owned(),
        }
    );
    assert_eq!(
        out.deprecation.to_string(),
        "since 2.0, use bar() or baz() instead, removed: in 3.0"
    );
}

#[test]
fn deprecation_display() {
    let bare = DeprecationInfo {
        deprecated: true,
        ..DeprecationInfo::default()
    };
    assert_eq!(bare.to_string(), "");

    let replacement_only = DeprecationInfo {
        deprecated: true,
        replacement: "f()".to_owned(),
        ..DeprecationInfo::default()
    };
    assert_eq!(replacement_only.to_string(), "use f() instead");
}

#[test]
fn shapes_and_closures_are_merged() {
    let out = doc_types(
        "/**
          * @param shape(a: Foo) $s
          * @param callable(int):void $cb
          * @return tuple(string)
          */",
        &[],
    );
    assert_eq!(out.shapes.len(), 2);
    assert_eq!(
        out.shapes["\\shape$a:\\App\\Foo$"].props[0].types,
        vec![verity_types::Type::new("\\App\\Foo")]
    );
    assert!(out.shapes.contains_key("\\shape$0:string$"));
    assert_eq!(out.return_type, Map::new("\\shape$0:string$"));

    assert_eq!(out.closures.len(), 1);
    assert_eq!(param(&out, "cb").typ, Map::new("\\Closure$(int):void"));
}

#[test]
fn warnings_carry_their_tag_and_line() {
    let out = doc_types(
        "/**
          * @param integer $a
          * @return []int
          */",
        &[],
    );
    assert_eq!(
        out.warnings,
        vec![
            DocWarning {
                line: 2,
                tag: "param".to_owned(),
                message: "Use int type instead of integer".to_owned(),
            },
            DocWarning {
                line: 3,
                tag: "return".to_owned(),
                message: "Array syntax is T[], not []T".to_owned(),
            },
        ]
    );
    // The alias is still applied by normalization.
    assert_eq!(param(&out, "a").typ, Map::new("int"));
    assert_eq!(out.return_type, Map::new("int[]"));
}

#[test]
fn other_tags_are_ignored() {
    let out = doc_types(
        "/**
          * @var int $x
          * @throws Exception
          */",
        &["x"],
    );
    assert!(out.params.is_empty());
    assert!(out.return_type.is_empty());
    assert_eq!(out.deprecation, DeprecationInfo::default());
}

#[test]
fn inherit() {
    assert!(doc_types("/** {@inheritdoc} */", &[]).inherit);
    assert!(doc_types("/**\n * @inheritDoc\n */", &[]).inherit);
}

#[test]
fn empty_comment() {
    let comment = parse_comment(&mut TypeParser::new(), "");
    let out = DocTypes::from_comment(&comment, &["a"], &Normalizer::default());
    assert_eq!(out, DocTypes::default());
}

#[test]
fn kphp_types() {
    let comment = parse_comment(&mut TypeParser::new(), "/** @param future $f */");
    let out = DocTypes::from_comment(&comment, &[], &Normalizer::new(None, true));
    assert_eq!(param(&out, "f").typ, Map::new("mixed"));
}
