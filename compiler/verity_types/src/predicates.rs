//! Classification of resolved type names.
//!
//! Class names are fully qualified and start with `\`. Shapes and closures
//! get synthesized names under the reserved `\shape$` and `\Closure`
//! prefixes so they travel through the same string sets as classes.

pub fn is_class(s: &str) -> bool {
    s.starts_with('\\') && !is_shape(s) && !is_array(s) && !is_closure(s)
}

pub fn is_shape(s: &str) -> bool {
    s.starts_with("\\shape$")
}

pub fn is_closure(s: &str) -> bool {
    s.starts_with("\\Closure")
}

pub fn is_anon_class(s: &str) -> bool {
    s.starts_with("\\anon$")
}

/// Closures declared in doc comments carry no source position, so their
/// names never contain a `.` (file names do).
pub fn is_closure_from_phpdoc(s: &str) -> bool {
    is_closure(s) && !s.contains('.')
}

/// `T[]` spelling, not the lazy array encoding.
pub fn is_array(s: &str) -> bool {
    s.ends_with("[]")
}

pub fn array_element_type(s: &str) -> &str {
    s.strip_suffix("[]").unwrap_or(s)
}

/// Built-in type keywords that never need class-name resolution.
pub fn is_trivial(s: &str) -> bool {
    matches!(
        s,
        "bool"
            | "callable"
            | "float"
            | "int"
            | "mixed"
            | "object"
            | "resource"
            | "string"
            | "void"
            | "iterable"
            | "never"
            | "null"
            | "true"
            | "false"
    )
}

/// Plain-old-data types, after alias expansion.
pub fn is_pod(s: &str) -> bool {
    matches!(
        alias(s).unwrap_or(s),
        "bool" | "float" | "int" | "string" | "void" | "null" | "true" | "false"
    )
}

pub fn is_alias(s: &str) -> bool {
    alias(s).is_some()
}

/// Canonical spelling of a legacy type keyword (`integer` -> `int`).
pub fn alias(s: &str) -> Option<&'static str> {
    match s {
        "integer" | "long" => Some("int"),
        "boolean" => Some("bool"),
        "real" | "double" => Some("float"),
        "callback" => Some("callable"),
        _ => None,
    }
}

/// KPHP-only type keywords, meaningful when the KPHP dialect is enabled.
pub fn is_kphp_special(s: &str) -> bool {
    matches!(s, "any" | "kmixed" | "future" | "future_queue")
}
