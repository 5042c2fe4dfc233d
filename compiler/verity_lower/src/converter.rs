//! Lowering of type expressions into concrete types.
//!
//! Lowering never fails. Constructs without a type-level meaning (`!T`,
//! `A&B`, bare integers) lower to nothing, unrecognized generics are erased
//! to their head, and style problems are reported as warnings next to the
//! best-effort result.
//!
//! Names are kept as written except inside shapes, whose property types are
//! expanded to fully qualified names right away; everything else is left to
//! the [`Normalizer`](verity_types::Normalizer).

use verity_doc::{Bracket, ExprKind, TypeExpr};
use verity_types::predicates::{alias, is_alias, is_kphp_special, is_trivial};
use verity_types::{
    ClassResolver, ClosureInfo, ClosureMap, DefaultShapeNamer, ShapeInfo, ShapeNamer, ShapeProp,
    ShapesMap, Type,
};

/// Result of lowering one type expression.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Lowered {
    /// Union members in source order. May contain duplicates.
    pub types: Vec<Type>,
    pub shapes: ShapesMap,
    pub closures: ClosureMap,
    pub warnings: Vec<String>,
}

/// Lowers parsed doc-comment types.
#[derive(Clone, Copy)]
pub struct Converter<'a> {
    resolver: Option<&'a dyn ClassResolver>,
    namer: &'a dyn ShapeNamer,
    kphp: bool,
}

impl std::fmt::Debug for Converter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("resolver", &self.resolver.is_some())
            .field("kphp", &self.kphp)
            .finish_non_exhaustive()
    }
}

impl<'a> Converter<'a> {
    /// Converter using [`DefaultShapeNamer`].
    pub fn new(resolver: Option<&'a dyn ClassResolver>, kphp: bool) -> Self {
        Converter {
            resolver,
            namer: &DefaultShapeNamer,
            kphp,
        }
    }

    #[must_use]
    pub fn with_namer(mut self, namer: &'a dyn ShapeNamer) -> Self {
        self.namer = namer;
        self
    }

    /// Lower `expr`. A `?` anywhere outside shape properties and callable
    /// signatures adds one `null` to the result.
    #[tracing::instrument(level = "trace", skip_all, fields(ty = %expr.value))]
    pub fn lower(&self, expr: &TypeExpr) -> Lowered {
        let mut state = Lowering {
            conv: self,
            nullable: false,
            out: Lowered::default(),
        };
        let mut types = state.lower_expr(expr);
        if state.nullable {
            state.append_null(&mut types);
        }
        state.out.types = types;
        state.out
    }
}

struct Lowering<'c, 'a> {
    conv: &'c Converter<'a>,
    /// A `?T` was lowered and its `null` is still pending.
    nullable: bool,
    out: Lowered,
}

impl Lowering<'_, '_> {
    fn warn(&mut self, msg: String) {
        self.out.warnings.push(msg);
    }

    fn append_null(&mut self, types: &mut Vec<Type>) {
        if types.iter().any(|t| t.elem == "null" && t.dims == 0) {
            self.warn("Repeated nullable doesn't make sense".to_owned());
        } else {
            types.push(Type::new("null"));
        }
    }

    fn lower_expr(&mut self, e: &TypeExpr) -> Vec<Type> {
        verity_stack::ensure_sufficient_stack(|| self.lower_kind(e))
    }

    fn lower_kind(&mut self, e: &TypeExpr) -> Vec<Type> {
        match &e.kind {
            ExprKind::Invalid | ExprKind::Unknown(_) => {
                if e.value == "-" {
                    self.warn(
                        "Expected a type, found '-'; if you want to express 'any' type, use 'mixed'"
                            .to_owned(),
                    );
                    return vec![Type::new("mixed")];
                }
                Vec::new()
            }

            ExprKind::Paren(x) => self.lower_expr(x),

            ExprKind::Name => {
                if let Some(suggest) = alias(&e.value) {
                    self.warn(format!("Use {suggest} type instead of {}", e.value));
                }
                vec![Type::new(e.value.as_str())]
            }

            ExprKind::MemberType { .. } => vec![Type::new("mixed")],

            ExprKind::Generic {
                head,
                params,
                bracket,
            } => self.lower_generic(head, params, *bracket),

            ExprKind::Nullable(x) => {
                self.nullable = true;
                self.lower_expr(x)
            }

            ExprKind::Array { elem, prefix } => {
                if *prefix {
                    self.warn("Array syntax is T[], not []T".to_owned());
                }
                self.lower_array(elem)
            }

            ExprKind::Union(arms) => {
                let mut types = Vec::with_capacity(arms.len());
                for arm in arms {
                    types.extend(self.lower_expr(arm));
                }
                types
            }

            // Shape keys unwrap their `?` before getting here.
            ExprKind::Optional(_) => {
                self.warn("Nullable syntax is ?T, not T?".to_owned());
                Vec::new()
            }

            ExprKind::Literal => vec![Type::new("string")],

            ExprKind::TypedCallable { ret, params } => self.lower_callable(ret, params),

            ExprKind::Intersection(_)
            | ExprKind::Not(_)
            | ExprKind::Int
            | ExprKind::SpecialName
            | ExprKind::KeyVal { .. } => Vec::new(),
        }
    }

    fn lower_generic(
        &mut self,
        head: &TypeExpr,
        params: &[TypeExpr],
        bracket: Bracket,
    ) -> Vec<Type> {
        let name = head.value.as_str();
        if name.contains("callable") {
            self.warn(
                "Lost return type for callable(...), if the function returns nothing, specify void explicitly"
                    .to_owned(),
            );
        }

        let is_array = matches!(name, "array" | "list" | "iterable") || name.contains('-');
        if is_array {
            if bracket == Bracket::Brace {
                return self.lower_shape(params, true);
            }
            match params {
                [elem] | [_, elem] => return self.lower_array(elem),
                _ => {}
            }
        }
        match name {
            "shape" | "\\shape" => self.lower_shape(params, false),
            "tuple" | "\\tuple" => self.lower_tuple(params),
            _ => self.lower_expr(head),
        }
    }

    fn lower_array(&mut self, elem: &TypeExpr) -> Vec<Type> {
        let mut types = self.lower_expr(elem);
        if types.is_empty() {
            return vec![Type::array_of("mixed", 1)];
        }
        for t in &mut types {
            t.dims += 1;
        }
        types
    }

    /// Lower `e` with its own nullability: a `?` inside it adds `null` to
    /// this list only. Used for shape properties and callable signatures.
    fn lower_isolated(&mut self, e: &TypeExpr) -> Vec<Type> {
        let outer = std::mem::replace(&mut self.nullable, false);
        let mut types = self.lower_expr(e);
        if self.nullable {
            types.push(Type::new("null"));
        }
        self.nullable = outer;
        types
    }

    fn lower_callable(&mut self, ret: &TypeExpr, params: &[TypeExpr]) -> Vec<Type> {
        let mut name = String::from("\\Closure$(");
        for (i, p) in params.iter().enumerate() {
            if i > 0 {
                name.push(',');
            }
            name.push_str(&p.value);
        }
        name.push(')');

        let param_types: Vec<Vec<Type>> = params.iter().map(|p| self.lower_isolated(p)).collect();

        let return_type = if ret.value.is_empty() {
            vec![Type::new("void")]
        } else {
            name.push(':');
            name.push_str(&ret.value.replace('|', "/"));
            self.lower_isolated(ret)
        };

        self.out.closures.insert(
            name.clone(),
            ClosureInfo {
                name: name.clone(),
                return_type,
                param_types,
            },
        );
        vec![Type::new(name)]
    }

    /// `shape(k: T, ...)`, or `array{k: T, U}` when `positional` is set.
    fn lower_shape(&mut self, params: &[TypeExpr], positional: bool) -> Vec<Type> {
        let mut props = Vec::with_capacity(params.len());
        for (i, p) in params.iter().enumerate() {
            if p.is_open_marker() {
                continue;
            }
            match &p.kind {
                ExprKind::KeyVal { key, val } => {
                    let key = match &key.kind {
                        ExprKind::Optional(inner) => inner,
                        _ => key,
                    };
                    if !matches!(key.kind, ExprKind::Name | ExprKind::Int) {
                        self.warn(format!("Invalid shape key: {}", key.value));
                        continue;
                    }
                    props.push(self.shape_prop(key.value.clone(), val));
                }
                _ if positional => props.push(self.shape_prop(i.to_string(), p)),
                _ => {
                    self.warn(format!(
                        "Shape param #{}: want key:type, found {}",
                        i + 1,
                        p.value
                    ));
                }
            }
        }
        self.register_shape(props)
    }

    /// `tuple(T, U)` is a shape keyed by position. Open markers are skipped
    /// but still take up a position.
    fn lower_tuple(&mut self, params: &[TypeExpr]) -> Vec<Type> {
        let mut props = Vec::with_capacity(params.len());
        for (i, p) in params.iter().enumerate() {
            if p.is_open_marker() {
                continue;
            }
            props.push(self.shape_prop(i.to_string(), p));
        }
        self.register_shape(props)
    }

    fn shape_prop(&mut self, key: String, val: &TypeExpr) -> ShapeProp {
        let mut types = self.lower_isolated(val);
        for t in &mut types {
            if let Some(fqn) = self.resolve(&t.elem) {
                t.elem = fqn;
            }
        }
        ShapeProp { key, types }
    }

    fn resolve(&self, name: &str) -> Option<String> {
        if is_alias(name) || is_trivial(name) || name == "array" {
            return None;
        }
        if self.conv.kphp && is_kphp_special(name) {
            return None;
        }
        self.conv.resolver?.resolve_class(name)
    }

    fn register_shape(&mut self, props: Vec<ShapeProp>) -> Vec<Type> {
        let name = self.conv.namer.shape_name(&props);
        self.out.shapes.insert(
            name.clone(),
            ShapeInfo {
                name: name.clone(),
                props,
            },
        );
        vec![Type::new(name)]
    }
}
