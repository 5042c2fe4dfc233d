//! Parsed doc-comment type expressions.
//!
//! Every node carries its [`Span`] and the matching slice of the parser
//! input (`value`), plus a [`ExprKind`] holding only the children that kind
//! needs. Trees are plain owned values: they outlive the parser that built
//! them and `Clone` deep-copies the children.

use std::fmt;

use crate::Span;

/// A parsed type together with the text it was parsed from.
///
/// `source` may extend past the expression: doc comments put a variable
/// name and a description after the type (`int $x the counter`), and the
/// parser stops at the first token that cannot continue the type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedType {
    pub source: String,
    pub expr: TypeExpr,
}

impl ParsedType {
    /// Unparsed text following the type expression, with surrounding
    /// whitespace removed.
    pub fn rest(&self) -> &str {
        self.source
            .get(self.expr.span.end as usize..)
            .unwrap_or("")
            .trim()
    }
}

/// Bracket style used by a generic argument list.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Bracket {
    /// `T<A, B>`
    Angle,
    /// `T(A, B)`
    Paren,
    /// `T{A, B}`
    Brace,
}

impl Bracket {
    pub const fn open(self) -> char {
        match self {
            Bracket::Angle => '<',
            Bracket::Paren => '(',
            Bracket::Brace => '{',
        }
    }

    pub const fn close(self) -> char {
        match self {
            Bracket::Angle => '>',
            Bracket::Paren => ')',
            Bracket::Brace => '}',
        }
    }
}

/// Surface-syntax variant of a node, for kinds that have more than one.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ExprShape {
    Default,
    /// `[]T` instead of `T[]`.
    ArrayPrefix,
    /// `T(A)` instead of `T<A>`.
    GenericParen,
    /// `T{A}` instead of `T<A>`.
    GenericBrace,
}

/// Type expression node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeExpr {
    pub span: Span,
    /// `source[span]`, never synthesized.
    pub value: String,
    pub kind: ExprKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExprKind {
    /// Unparseable fragment, possibly zero-width.
    Invalid,
    /// Garbage prefix followed by a valid expression (`-foo`).
    Unknown(Box<TypeExpr>),
    /// `int`, `\Foo\Bar`, `$this`
    Name,
    /// `*` or `...`
    SpecialName,
    /// `0`, `42`
    Int,
    /// `'foo'`, `"bar"`
    Literal,
    /// `key: T`
    KeyVal { key: Box<TypeExpr>, val: Box<TypeExpr> },
    /// `C::X`
    MemberType {
        class: Box<TypeExpr>,
        member: Box<TypeExpr>,
    },
    /// `T[]`, or `[]T` when `prefix` is set.
    Array { elem: Box<TypeExpr>, prefix: bool },
    /// `(T)`
    Paren(Box<TypeExpr>),
    /// `?T`
    Nullable(Box<TypeExpr>),
    /// `k?`, only meaningful as a shape key.
    Optional(Box<TypeExpr>),
    /// `!T`
    Not(Box<TypeExpr>),
    /// `A|B|C`, always flattened.
    Union(Vec<TypeExpr>),
    /// `A&B&C`, always flattened.
    Intersection(Vec<TypeExpr>),
    /// `T<A, B>`, `T(A, B)`, `T{A, B}`
    Generic {
        head: Box<TypeExpr>,
        params: Vec<TypeExpr>,
        bracket: Bracket,
    },
    /// `callable(A, B): R`
    TypedCallable {
        ret: Box<TypeExpr>,
        params: Vec<TypeExpr>,
    },
}

impl TypeExpr {
    /// Kind name used in debug dumps and test snapshots.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            ExprKind::Invalid => "Invalid",
            ExprKind::Unknown(_) => "Unknown",
            ExprKind::Name => "Name",
            ExprKind::SpecialName => "SpecialName",
            ExprKind::Int => "Int",
            ExprKind::Literal => "Literal",
            ExprKind::KeyVal { .. } => "KeyVal",
            ExprKind::MemberType { .. } => "MemberType",
            ExprKind::Array { .. } => "Array",
            ExprKind::Paren(_) => "Paren",
            ExprKind::Nullable(_) => "Nullable",
            ExprKind::Optional(_) => "Optional",
            ExprKind::Not(_) => "Not",
            ExprKind::Union(_) => "Union",
            ExprKind::Intersection(_) => "Inter",
            ExprKind::Generic { .. } => "Generic",
            ExprKind::TypedCallable { .. } => "TypedCallable",
        }
    }

    pub fn shape(&self) -> ExprShape {
        match &self.kind {
            ExprKind::Array { prefix: true, .. } => ExprShape::ArrayPrefix,
            ExprKind::Generic {
                bracket: Bracket::Paren,
                ..
            } => ExprShape::GenericParen,
            ExprKind::Generic {
                bracket: Bracket::Brace,
                ..
            } => ExprShape::GenericBrace,
            _ => ExprShape::Default,
        }
    }

    /// Children in source order.
    ///
    /// `Generic` yields its head first; `TypedCallable` yields its return
    /// type first, then the parameters.
    pub fn args(&self) -> Vec<&TypeExpr> {
        match &self.kind {
            ExprKind::Invalid
            | ExprKind::Name
            | ExprKind::SpecialName
            | ExprKind::Int
            | ExprKind::Literal => Vec::new(),
            ExprKind::Unknown(x)
            | ExprKind::Paren(x)
            | ExprKind::Nullable(x)
            | ExprKind::Optional(x)
            | ExprKind::Not(x)
            | ExprKind::Array { elem: x, .. } => vec![x.as_ref()],
            ExprKind::KeyVal { key, val } => vec![key.as_ref(), val.as_ref()],
            ExprKind::MemberType { class, member } => vec![class.as_ref(), member.as_ref()],
            ExprKind::Union(xs) | ExprKind::Intersection(xs) => xs.iter().collect(),
            ExprKind::Generic { head, params, .. } => {
                std::iter::once(head.as_ref()).chain(params).collect()
            }
            ExprKind::TypedCallable { ret, params } => {
                std::iter::once(ret.as_ref()).chain(params).collect()
            }
        }
    }

    /// `*` or `...`, used as "other keys allowed" inside shapes and tuples.
    pub fn is_open_marker(&self) -> bool {
        matches!(self.kind, ExprKind::SpecialName) && (self.value == "*" || self.value == "...")
    }

    /// Copy of the tree with every `Paren` node replaced by its child.
    ///
    /// Spans and values of the remaining nodes are kept as they were.
    #[must_use]
    pub fn strip_parens(&self) -> TypeExpr {
        verity_stack::ensure_sufficient_stack(|| {
            let strip = |x: &TypeExpr| Box::new(x.strip_parens());
            let kind = match &self.kind {
                ExprKind::Paren(x) => return x.strip_parens(),
                ExprKind::Invalid => ExprKind::Invalid,
                ExprKind::Name => ExprKind::Name,
                ExprKind::SpecialName => ExprKind::SpecialName,
                ExprKind::Int => ExprKind::Int,
                ExprKind::Literal => ExprKind::Literal,
                ExprKind::Unknown(x) => ExprKind::Unknown(strip(x)),
                ExprKind::Nullable(x) => ExprKind::Nullable(strip(x)),
                ExprKind::Optional(x) => ExprKind::Optional(strip(x)),
                ExprKind::Not(x) => ExprKind::Not(strip(x)),
                ExprKind::Array { elem, prefix } => ExprKind::Array {
                    elem: strip(elem),
                    prefix: *prefix,
                },
                ExprKind::KeyVal { key, val } => ExprKind::KeyVal {
                    key: strip(key),
                    val: strip(val),
                },
                ExprKind::MemberType { class, member } => ExprKind::MemberType {
                    class: strip(class),
                    member: strip(member),
                },
                ExprKind::Union(xs) => ExprKind::Union(xs.iter().map(Self::strip_parens).collect()),
                ExprKind::Intersection(xs) => {
                    ExprKind::Intersection(xs.iter().map(Self::strip_parens).collect())
                }
                ExprKind::Generic {
                    head,
                    params,
                    bracket,
                } => ExprKind::Generic {
                    head: strip(head),
                    params: params.iter().map(Self::strip_parens).collect(),
                    bracket: *bracket,
                },
                ExprKind::TypedCallable { ret, params } => ExprKind::TypedCallable {
                    ret: strip(ret),
                    params: params.iter().map(Self::strip_parens).collect(),
                },
            };
            TypeExpr {
                span: self.span,
                value: self.value.clone(),
                kind,
            }
        })
    }

    fn unparen(&self) -> &TypeExpr {
        match &self.kind {
            ExprKind::Paren(x) => x.unparen(),
            _ => self,
        }
    }

    /// Binding level used by the canonical printer.
    ///
    /// A child whose level is below what its parent position requires is
    /// printed in parentheses.
    fn level(&self) -> u8 {
        match &self.kind {
            ExprKind::KeyVal { .. } => 1,
            ExprKind::Union(_) => 2,
            // The return type swallows every operator tighter than `|`.
            ExprKind::MemberType { .. } | ExprKind::TypedCallable { .. } => 3,
            ExprKind::Intersection(_) => 4,
            ExprKind::Array { prefix: false, .. } | ExprKind::Optional(_) => 5,
            ExprKind::Array { prefix: true, .. }
            | ExprKind::Nullable(_)
            | ExprKind::Not(_)
            | ExprKind::Generic { .. } => 6,
            ExprKind::Paren(x) => x.level(),
            ExprKind::Invalid
            | ExprKind::Unknown(_)
            | ExprKind::Name
            | ExprKind::SpecialName
            | ExprKind::Int
            | ExprKind::Literal => 7,
        }
    }

    fn write_canonical(&self, min_level: u8, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let ExprKind::Paren(x) = &self.kind {
            return x.write_canonical(min_level, f);
        }
        if self.level() < min_level {
            f.write_str("(")?;
            self.write_canonical(0, f)?;
            return f.write_str(")");
        }

        match &self.kind {
            ExprKind::Invalid
            | ExprKind::Unknown(_)
            | ExprKind::Name
            | ExprKind::SpecialName
            | ExprKind::Int
            | ExprKind::Literal => f.write_str(&self.value),
            ExprKind::KeyVal { key, val } => {
                key.write_canonical(1, f)?;
                f.write_str(":")?;
                val.write_canonical(2, f)
            }
            ExprKind::MemberType { class, member } => {
                let class_min = if matches!(class.unparen().kind, ExprKind::TypedCallable { .. }) {
                    4
                } else {
                    3
                };
                class.write_canonical(class_min, f)?;
                f.write_str("::")?;
                member.write_canonical(4, f)
            }
            ExprKind::Array {
                elem,
                prefix: false,
            } => {
                elem.write_canonical(5, f)?;
                f.write_str("[]")
            }
            ExprKind::Array { elem, prefix: true } => {
                f.write_str("[]")?;
                elem.write_canonical(6, f)
            }
            ExprKind::Optional(x) => {
                x.write_canonical(5, f)?;
                f.write_str("?")
            }
            ExprKind::Nullable(x) => {
                f.write_str("?")?;
                x.write_canonical(6, f)
            }
            ExprKind::Not(x) => {
                f.write_str("!")?;
                x.write_canonical(6, f)
            }
            ExprKind::Union(xs) => write_joined(xs, "|", 3, f),
            ExprKind::Intersection(xs) => write_joined(xs, "&", 5, f),
            ExprKind::Generic {
                head,
                params,
                bracket,
            } => {
                head.write_canonical(7, f)?;
                write!(f, "{}", bracket.open())?;
                write_joined(params, ",", 0, f)?;
                write!(f, "{}", bracket.close())
            }
            ExprKind::TypedCallable { ret, params } => {
                f.write_str("callable(")?;
                write_joined(params, ",", 0, f)?;
                f.write_str("):")?;
                ret.write_canonical(3, f)
            }
            ExprKind::Paren(_) => Ok(()),
        }
    }
}

fn write_joined(
    items: &[TypeExpr],
    sep: &str,
    min_level: u8,
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        item.write_canonical(min_level, f)?;
    }
    Ok(())
}

/// Canonical rendering: no whitespace, redundant parentheses dropped.
///
/// Re-parsing the output of a valid expression yields the same tree up to
/// `Paren` nodes (compare with [`TypeExpr::strip_parens`]).
impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        verity_stack::ensure_sufficient_stack(|| self.write_canonical(0, f))
    }
}
