//! Canonicalization of lowered doc-comment types.

use crate::predicates::{alias, is_trivial};
use crate::Type;

/// Expands a bare class name (as written in source) to its fully qualified
/// form, taking the current namespace and `use` imports into account.
pub trait ClassResolver {
    fn resolve_class(&self, name: &str) -> Option<String>;
}

impl<F> ClassResolver for F
where
    F: Fn(&str) -> Option<String>,
{
    fn resolve_class(&self, name: &str) -> Option<String> {
        self(name)
    }
}

/// Rewrites type names into the spelling the rest of the analysis expects:
/// canonical scalar names, `mixed[]` for `array`, `static` for `$this`, and
/// fully qualified class names.
#[derive(Clone, Copy, Default)]
pub struct Normalizer<'r> {
    resolver: Option<&'r dyn ClassResolver>,
    kphp: bool,
}

impl<'r> Normalizer<'r> {
    pub fn new(resolver: Option<&'r dyn ClassResolver>, kphp: bool) -> Self {
        Normalizer { resolver, kphp }
    }

    pub fn resolver(&self) -> Option<&'r dyn ClassResolver> {
        self.resolver
    }

    pub fn kphp(&self) -> bool {
        self.kphp
    }

    pub fn normalize_types(&self, types: &mut [Type]) {
        for ty in types {
            self.normalize_type(ty);
        }
    }

    pub fn normalize_type(&self, ty: &mut Type) {
        if ty.elem.is_empty() || is_trivial(&ty.elem) {
            return;
        }
        if let Some(canonical) = alias(&ty.elem) {
            ty.elem = canonical.to_owned();
            return;
        }
        if self.kphp && matches!(ty.elem.as_str(), "any" | "kmixed" | "future") {
            // `mixed` already covers objects.
            ty.elem = "mixed".to_owned();
            return;
        }

        let refined = match ty.elem.as_str() {
            "class-string"
            | "interface-string"
            | "trait-string"
            | "callable-string"
            | "numeric-string"
            | "literal-string"
            | "lowercase-string"
            | "non-empty-string"
            | "non-empty-lowercase-string"
            | "html-escaped-string"
            | "array-key" => Some("string"),
            "positive-int" => Some("int"),
            "numeric" => Some("float"),
            _ => None,
        };
        if let Some(scalar) = refined {
            ty.elem = scalar.to_owned();
            return;
        }

        match ty.elem.as_str() {
            "array" => {
                ty.dims += 1;
                ty.elem = "mixed".to_owned();
            }
            "$this" => ty.elem = "static".to_owned(),
            // Kept for late static binding.
            "static" => {}
            name if name.starts_with('\\') => {}
            name => {
                let Some(resolver) = self.resolver else {
                    return;
                };
                match resolver.resolve_class(name) {
                    Some(fqn) => ty.elem = fqn,
                    None => tracing::warn!(name, "can't expand type name"),
                }
            }
        }
    }
}

impl std::fmt::Debug for Normalizer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Normalizer")
            .field("resolver", &self.resolver.is_some())
            .field("kphp", &self.kphp)
            .finish()
    }
}
