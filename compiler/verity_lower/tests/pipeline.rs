//! Doc comment in, compatibility verdict out.

use pretty_assertions::assert_eq;
use verity_doc::{parse_comment, TypeParser};
use verity_lower::{init_tracing, DocTypes};
use verity_types::{
    Checker, ClassData, CompatibleConfig, InMemoryClasses, Map, Normalizer, Relation,
};

fn resolve(name: &str) -> Option<String> {
    match name {
        "Base" | "Child" | "Bag" | "Countable" => Some(format!("\\App\\{name}")),
        _ => None,
    }
}

fn classes() -> InMemoryClasses {
    [
        ClassData::class("\\App\\Base"),
        ClassData::class("\\App\\Child").with_parent("\\App\\Base"),
        ClassData::interface("\\App\\Countable"),
        ClassData::class("\\App\\Bag").with_interface("\\App\\Countable"),
        ClassData::class("\\App\\Other"),
    ]
    .into_iter()
    .collect()
}

const DOC: &str = "/**
 * Stores items.
 *
 * @param Base $owner
 * @param int[] $ids
 * @param Countable $items [optional]
 * @param shape(id: int, tags: string[]) $meta
 * @return ?int
 * @deprecated use the bulk API
 * @see store_all()
 */";

fn doc_types() -> DocTypes {
    init_tracing();
    let comment = parse_comment(&mut TypeParser::new(), DOC);
    let normalizer = Normalizer::new(Some(&resolve), false);
    DocTypes::from_comment(&comment, &["owner", "ids", "items", "meta"], &normalizer)
}

fn param_type(doc: &DocTypes, name: &str) -> Map {
    match doc.params.get(name) {
        Some(p) => p.typ.clone(),
        None => panic!("missing @param {name}"),
    }
}

#[test]
fn extracted_types() {
    let doc = doc_types();
    assert_eq!(param_type(&doc, "owner"), Map::new("\\App\\Base"));
    assert_eq!(param_type(&doc, "ids"), Map::new("int[]"));
    assert_eq!(param_type(&doc, "ids").to_string(), "int[]");
    assert!(doc.params["items"].optional);
    assert_eq!(doc.return_type, Map::new("int|null"));
    assert!(doc.return_type.is_immutable());
    assert_eq!(doc.shapes.len(), 1);
    assert!(doc.warnings.is_empty());
    assert_eq!(
        doc.deprecation.to_string(),
        "use the bulk API, use store_all() instead"
    );
}

#[test]
fn subclass_argument() {
    let doc = doc_types();
    let classes = classes();
    let checker = Checker::new(CompatibleConfig::default(), &classes);

    let res = checker.check(&param_type(&doc, "owner"), &Map::new("\\App\\Child"));
    assert!(res.compatible);
    assert_eq!(res.relation, Some(Relation::ParentAndClass));

    let res = checker.check(&param_type(&doc, "owner"), &Map::new("\\App\\Other"));
    assert!(!res.compatible);
    assert_eq!(
        res.to_string(),
        "\\App\\Other is not compatible with \\App\\Base"
    );
}

#[test]
fn interface_argument() {
    let doc = doc_types();
    let classes = classes();
    let checker = Checker::new(CompatibleConfig::default(), &classes);

    let res = checker.check(&param_type(&doc, "items"), &Map::new("\\App\\Bag"));
    assert!(res.compatible);
    assert_eq!(res.relation, Some(Relation::InterfaceAndClass));

    let res = checker.check(&param_type(&doc, "items"), &Map::new("\\App\\Base"));
    assert!(!res.compatible);
    assert_eq!(res.relation, Some(Relation::InterfaceAndClass));
}

#[test]
fn array_argument() {
    let doc = doc_types();
    let checker = Checker::default();

    assert!(checker.check(&param_type(&doc, "ids"), &Map::new("int[]")).compatible);

    let res = checker.check(&param_type(&doc, "ids"), &Map::new("string[]"));
    assert!(!res.compatible);
    let Some(Relation::ArraysTypeMismatch(inner)) = &res.relation else {
        panic!("unexpected relation {:?}", res.relation);
    };
    assert_eq!(inner.t1, Map::new("int"));
    assert_eq!(inner.t2, Map::new("string"));

    let res = checker.check(&param_type(&doc, "ids"), &Map::new("int"));
    assert_eq!(res.relation, Some(Relation::ArrayAndType));
}

#[test]
fn nullable_return() {
    let doc = doc_types();

    let loose = Checker::default();
    assert!(loose.check(&doc.return_type, &Map::new("int")).compatible);

    let strict = Checker::without_hierarchy(CompatibleConfig {
        union_strict: true,
        ..CompatibleConfig::default()
    });
    let res = strict.check(&doc.return_type, &Map::new("int"));
    assert!(!res.compatible);
    assert_eq!(res.relation, Some(Relation::ExtraNullable));
    assert!(strict.check(&doc.return_type, &Map::new("null|int")).compatible);
}

#[test]
fn shape_argument() {
    let doc = doc_types();
    let meta = param_type(&doc, "meta");
    let Some(name) = meta.iter().next().map(str::to_owned) else {
        panic!("empty shape type");
    };
    assert_eq!(name, "\\shape$id:int,tags:string[]$");
    assert!(doc.shapes.contains_key(&name));

    let checker = Checker::default();
    assert!(checker.check(&meta, &Map::new(&name)).compatible);
    // Shapes are not class types, so nothing is checked against them.
    let res = checker.check(&meta, &Map::new("int"));
    assert!(res.compatible);
    assert_eq!(res.relation, None);
}
