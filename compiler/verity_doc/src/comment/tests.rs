use pretty_assertions::assert_eq;

use super::*;

fn type_var(
    p: &mut TypeParser,
    line: usize,
    name: &str,
    var_is_first: bool,
    var: &str,
    ty: &str,
    rest: &str,
) -> CommentPart {
    CommentPart::TypeVar(TypeVarPart {
        line,
        name: name.to_owned(),
        var_is_first,
        var: var.to_owned(),
        ty: p.parse(ty),
        rest: rest.to_owned(),
    })
}

#[test]
fn tags_with_types() {
    let mut p = TypeParser::new();
    let want = vec![
        type_var(&mut p, 4, "param", true, "$param", "int  Here goes the description", "Here goes the description"),
        type_var(&mut p, 5, "param", false, "$arr", "array<int, string> $arr  Array of int to string", "Array of int to string"),
        type_var(
            &mut p,
            6,
            "param",
            false,
            "$arr_nested",
            "array<int, array<string, stdclass> > $arr_nested  Array of nested arrays",
            "Array of nested arrays",
        ),
        type_var(
            &mut p,
            7,
            "param",
            true,
            "$arr_nested",
            "array<int, array<string, stdclass> >  Array of nested arrays",
            "Array of nested arrays",
        ),
        type_var(&mut p, 8, "var", false, "", "int", ""),
        type_var(&mut p, 9, "var", false, "$foo1", "array<int> $foo1  var comment", "var comment"),
        type_var(&mut p, 10, "var", true, "$foo2", "array<int,string>", ""),
        type_var(&mut p, 11, "var", false, "", "array< int, string >", ""),
        type_var(&mut p, 12, "var", false, "", "array<int, array<string, stdclass>\t>", ""),
        CommentPart::Type(TypePart {
            line: 13,
            name: "return".to_owned(),
            ty: p.parse("int   some    result"),
            rest: "some    result".to_owned(),
        }),
        CommentPart::Raw(RawPart {
            line: 14,
            name: "unknown".to_owned(),
            params: vec!["a".to_owned(), "b".to_owned(), "c".to_owned()],
            params_text: "a b c".to_owned(),
        }),
        type_var(&mut p, 15, "property-read", false, "$readonly", "int $readonly", ""),
    ];

    let raw = "/**
	 * Some description
	 *
	 * @param   $param int  Here goes the description
	 * @param  array<int, string> $arr  Array of int to string
	 * @param  array<int, array<string, stdclass> > $arr_nested  Array of nested arrays
	 * @param  $arr_nested array<int, array<string, stdclass> >  Array of nested arrays
	 * @var int
	 * @var  array<int> $foo1  var comment
	 * @var $foo2  array<int,string>
	 * @var array< int, string >
	 * @var array<int, array<string, stdclass>\t>
	 * @return int   some    result
	 * @unknown a b c
	 * @property-read int $readonly
	*/";
    let got = parse_comment(&mut p, raw);

    assert_eq!(got.parsed.len(), want.len());
    for (have, want) in got.parsed.iter().zip(&want) {
        assert_eq!(have, want);
    }
    assert!(!got.inherit);
}

#[test]
fn whole_generic_is_the_type() {
    let mut p = TypeParser::new();
    let got = parse_comment(&mut p, "/** @var array<int, array<string, stdclass> > $x */");
    let CommentPart::TypeVar(part) = &got.parsed[0] else {
        panic!("expected a typed var, got {:?}", got.parsed[0]);
    };
    assert_eq!(part.ty.expr.value, "array<int, array<string, stdclass> >");
    assert_eq!(part.var, "$x");
}

#[test]
fn plain_block_comment_is_ignored() {
    let mut p = TypeParser::new();
    let got = parse_comment(&mut p, "/* @param int $x */");
    assert!(got.parsed.is_empty());
}

#[test]
fn single_line_comment() {
    let mut p = TypeParser::new();
    let got = parse_comment(&mut p, "/** @return ?Foo */");
    assert_eq!(got.parsed.len(), 1);
    assert_eq!(got.parsed[0].line(), 1);
    assert_eq!(got.parsed[0].name(), "return");
    let CommentPart::Type(part) = &got.parsed[0] else {
        panic!("expected a type part");
    };
    assert_eq!(part.ty.expr.value, "?Foo");
    assert_eq!(part.rest, "");
}

#[test]
fn inheritdoc_detection() {
    let mut p = TypeParser::new();
    assert!(parse_comment(&mut p, "/** {@inheritDoc} */").inherit);
    assert!(parse_comment(&mut p, "/**\n * @inheritdoc\n */").inherit);
    assert!(!parse_comment(&mut p, "/** @see Foo::bar() */").inherit);
}

#[test]
fn raw_parts_keep_params() {
    let mut p = TypeParser::new();
    let got = parse_comment(&mut p, "/**\n * @deprecated  use   bar() instead\n * @removed\n */");
    let CommentPart::Raw(deprecated) = &got.parsed[0] else {
        panic!("expected a raw part");
    };
    assert_eq!(deprecated.params_text, "use   bar() instead");
    assert_eq!(deprecated.params, ["use", "bar()", "instead"]);
    assert!(deprecated.contains_param("bar()"));
    let CommentPart::Raw(removed) = &got.parsed[1] else {
        panic!("expected a raw part");
    };
    assert_eq!(removed.line, 3);
    assert_eq!(removed.params_text, "");
    assert!(removed.params.is_empty());
}

#[test]
fn typed_var_without_type() {
    let mut p = TypeParser::new();
    let got = parse_comment(&mut p, "/** @param $x */");
    let CommentPart::TypeVar(part) = &got.parsed[0] else {
        panic!("expected a typed var");
    };
    assert!(part.var_is_first);
    assert_eq!(part.var, "$x");
    assert_eq!(part.ty.expr.kind_name(), "Invalid");
}
