//! Operator-precedence parser for doc-comment types.
//!
//! The scanner works directly on bytes; there is no token stream. Nodes are
//! collected into an index-addressed arena owned by [`TypeParser`] and turned
//! into an owned [`TypeExpr`] tree once the whole input has been consumed.
//! The arena is cleared, not freed, between calls, so one parser per thread
//! amortizes its allocations over every comment it sees.
//!
//! Binding power, loosest first:
//!
//! | op          | kind        | prec |
//! |-------------|-------------|------|
//! | `k:v`       | KeyVal      | 1    |
//! | `a\|b`      | Union       | 2    |
//! | `C::X`      | MemberType  | 3    |
//! | `a&b`       | Intersection| 4    |
//! | `T[]`, `k?` | Array, Optional | 5 |
//! | `T<..>`, `T(..)`, `T{..}` | Generic | 6 |
//!
//! Prefix `?`, `!` and `[]` parse their operand at precedence 5, so
//! `?x[]` is an array of nullable `x` while `?A<B>` is a nullable generic.

use smallvec::SmallVec;

use crate::expr::{Bracket, ExprKind, ParsedType, TypeExpr};
use crate::Span;

/// Reusable type-expression parser.
///
/// `parse` takes `&mut self`; threads that parse concurrently each own a
/// parser.
#[derive(Default)]
pub struct TypeParser {
    nodes: Vec<Node>,
}

impl TypeParser {
    pub fn new() -> Self {
        TypeParser {
            nodes: Vec::with_capacity(16),
        }
    }

    /// Parse `source` into a type expression.
    ///
    /// Never fails: malformed input yields `Invalid`/`Unknown` nodes. Leading
    /// whitespace is skipped. Parsing stops at the first byte that cannot
    /// continue the expression, so `source` may carry trailing text.
    #[tracing::instrument(level = "trace", skip_all, fields(len = source.len()))]
    pub fn parse(&mut self, source: &str) -> ParsedType {
        self.nodes.clear();
        let mut cursor = Cursor {
            src: source.as_bytes(),
            pos: 0,
            in_group: false,
            nodes: &mut self.nodes,
        };
        cursor.skip_ws();
        let root = cursor.parse_expr(0);
        let expr = build(&self.nodes, root, source.as_bytes());
        ParsedType {
            source: source.to_owned(),
            expr,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct NodeId(usize);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum NodeKind {
    Invalid,
    Unknown,
    Name,
    SpecialName,
    Int,
    Literal,
    KeyVal,
    MemberType,
    Array,
    PrefixArray,
    Paren,
    Nullable,
    Optional,
    Not,
    Union,
    Intersection,
    Generic(Bracket),
    TypedCallable,
}

struct Node {
    kind: NodeKind,
    start: usize,
    end: usize,
    args: SmallVec<[NodeId; 4]>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Infix {
    KeyVal,
    Union,
    MemberType,
    Intersection,
    Array,
    Optional,
    Generic(Bracket),
}

impl Infix {
    const fn prec(self) -> u8 {
        match self {
            Infix::KeyVal => 1,
            Infix::Union => 2,
            Infix::MemberType => 3,
            Infix::Intersection => 4,
            Infix::Array | Infix::Optional => 5,
            Infix::Generic(_) => 6,
        }
    }
}

struct Cursor<'a> {
    src: &'a [u8],
    pos: usize,
    /// Inside `(..)`, `<..>` or `{..}`: whitespace never ends the expression.
    in_group: bool,
    nodes: &'a mut Vec<Node>,
}

impl Cursor<'_> {
    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn starts_with(&self, s: &[u8]) -> bool {
        self.src.get(self.pos..).is_some_and(|rest| rest.starts_with(s))
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn push(&mut self, kind: NodeKind, start: usize, end: usize, args: &[NodeId]) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            start,
            end,
            args: SmallVec::from_slice(args),
        });
        id
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn end_of(&self, id: NodeId) -> usize {
        self.nodes[id.0].end
    }

    fn parse_expr(&mut self, prec: u8) -> NodeId {
        verity_stack::ensure_sufficient_stack(|| {
            let mut left = self.parse_prefix(prec);
            loop {
                let save = self.pos;
                let Some(op) = self.peek_infix(self.node(left).kind) else {
                    self.pos = save;
                    break;
                };
                if op.prec() <= prec {
                    self.pos = save;
                    break;
                }
                left = self.parse_infix(left, op);
            }
            left
        })
    }

    /// Find the operator that continues the expression, leaving the cursor
    /// on it. Whitespace before it is skipped only where an operator may
    /// follow a space; the caller rewinds on `None`.
    fn peek_infix(&mut self, left: NodeKind) -> Option<Infix> {
        if self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
            self.skip_ws();
            if !self.in_group && !self.spaced_op_allowed() {
                return None;
            }
        }
        let op = match self.peek()? {
            b':' if self.peek_at(1) == Some(b':') => Infix::MemberType,
            b':' => Infix::KeyVal,
            b'|' => Infix::Union,
            b'&' => Infix::Intersection,
            b'[' => Infix::Array,
            b'?' => Infix::Optional,
            b'<' if left == NodeKind::Name => Infix::Generic(Bracket::Angle),
            b'(' if left == NodeKind::Name => Infix::Generic(Bracket::Paren),
            b'{' if left == NodeKind::Name => Infix::Generic(Bracket::Brace),
            _ => return None,
        };
        Some(op)
    }

    /// Top-level operators that may be preceded by whitespace: `|`, `&`,
    /// `{` and an array suffix whose `[` is followed by `]`.
    fn spaced_op_allowed(&self) -> bool {
        match self.peek() {
            Some(b'|' | b'&' | b'{') => true,
            Some(b'[') => {
                let mut i = self.pos + 1;
                while self.src.get(i).is_some_and(u8::is_ascii_whitespace) {
                    i += 1;
                }
                self.src.get(i) == Some(&b']')
            }
            _ => false,
        }
    }

    fn parse_infix(&mut self, left: NodeId, op: Infix) -> NodeId {
        let start = self.node(left).start;
        match op {
            Infix::Union | Infix::Intersection => {
                let kind = if op == Infix::Union {
                    NodeKind::Union
                } else {
                    NodeKind::Intersection
                };
                self.pos += 1;
                self.skip_ws();
                let right = self.parse_expr(op.prec());
                let end = self.end_of(right).max(self.end_of(left));
                if self.node(left).kind == kind {
                    let node = &mut self.nodes[left.0];
                    node.args.push(right);
                    node.end = end;
                    left
                } else {
                    self.push(kind, start, end, &[left, right])
                }
            }
            Infix::MemberType | Infix::KeyVal => {
                let (kind, width) = if op == Infix::MemberType {
                    (NodeKind::MemberType, 2)
                } else {
                    (NodeKind::KeyVal, 1)
                };
                self.pos += width;
                self.skip_ws();
                let right = self.parse_expr(op.prec());
                let end = self.end_of(right);
                self.push(kind, start, end, &[left, right])
            }
            Infix::Array => {
                self.pos += 1;
                let save = self.pos;
                self.skip_ws();
                if self.peek() == Some(b']') {
                    self.pos += 1;
                } else {
                    self.pos = save;
                }
                self.push(NodeKind::Array, start, self.pos, &[left])
            }
            Infix::Optional => {
                self.pos += 1;
                self.push(NodeKind::Optional, start, self.pos, &[left])
            }
            Infix::Generic(bracket) => self.parse_generic(left, bracket),
        }
    }

    fn parse_generic(&mut self, head: NodeId, bracket: Bracket) -> NodeId {
        let start = self.node(head).start;
        self.pos += 1;
        let was_in_group = std::mem::replace(&mut self.in_group, true);

        let mut args: SmallVec<[NodeId; 4]> = SmallVec::new();
        args.push(head);
        let closer = match bracket {
            Bracket::Angle => b'>',
            Bracket::Paren => b')',
            Bracket::Brace => b'}',
        };
        loop {
            self.skip_ws();
            let Some(c) = self.peek() else { break };
            if c == closer {
                self.pos += 1;
                break;
            }
            let before = self.pos;
            let arg = self.parse_expr(0);
            if self.pos == before {
                break;
            }
            args.push(arg);
            self.skip_ws();
            if self.peek() == Some(b',') {
                self.pos += 1;
            }
        }
        self.in_group = was_in_group;

        if bracket == Bracket::Paren && self.value_is(head, b"callable") {
            if let Some(ret) = self.parse_callable_ret() {
                args[0] = ret;
                let end = self.end_of(ret);
                return self.push(NodeKind::TypedCallable, start, end, &args);
            }
        }
        self.push(NodeKind::Generic(bracket), start, self.pos, &args)
    }

    /// `: R` after `callable(...)`; rewinds and returns `None` when absent.
    fn parse_callable_ret(&mut self) -> Option<NodeId> {
        let save = self.pos;
        self.skip_ws();
        if self.peek() == Some(b':') && self.peek_at(1) != Some(b':') {
            self.pos += 1;
            self.skip_ws();
            return Some(self.parse_expr(Infix::Union.prec()));
        }
        self.pos = save;
        None
    }

    fn value_is(&self, id: NodeId, text: &[u8]) -> bool {
        let node = self.node(id);
        self.src.get(node.start..node.end) == Some(text)
    }

    fn parse_prefix(&mut self, prec: u8) -> NodeId {
        let start = self.pos;
        let Some(c) = self.peek() else {
            return self.push(NodeKind::Invalid, start, start, &[]);
        };
        match c {
            b'?' | b'!' => {
                let kind = if c == b'?' {
                    NodeKind::Nullable
                } else {
                    NodeKind::Not
                };
                self.pos += 1;
                let x = self.parse_expr(Infix::Array.prec());
                let end = self.end_of(x);
                self.push(kind, start, end, &[x])
            }
            b'[' => {
                self.pos += 1;
                self.skip_ws();
                if self.peek() == Some(b']') {
                    self.pos += 1;
                }
                let save = self.pos;
                self.skip_ws();
                if self.peek().is_none() {
                    self.pos = save;
                }
                let elem = self.parse_expr(Infix::Array.prec());
                let end = self.end_of(elem);
                self.push(NodeKind::PrefixArray, start, end, &[elem])
            }
            b'(' => {
                self.pos += 1;
                let was_in_group = std::mem::replace(&mut self.in_group, true);
                self.skip_ws();
                let x = self.parse_expr(0);
                self.skip_ws();
                if self.peek() == Some(b')') {
                    self.pos += 1;
                }
                self.in_group = was_in_group;
                self.push(NodeKind::Paren, start, self.pos, &[x])
            }
            b'*' => {
                self.pos += 1;
                self.push(NodeKind::SpecialName, start, self.pos, &[])
            }
            b'.' if self.starts_with(b"...") => {
                self.pos += 3;
                self.push(NodeKind::SpecialName, start, self.pos, &[])
            }
            b'0'..=b'9' => {
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.pos += 1;
                }
                self.push(NodeKind::Int, start, self.pos, &[])
            }
            b'\'' | b'"' => {
                self.pos += 1;
                while let Some(q) = self.peek() {
                    self.pos += 1;
                    if q == c {
                        break;
                    }
                }
                self.push(NodeKind::Literal, start, self.pos, &[])
            }
            b')' | b']' | b'>' | b'}' => self.push(NodeKind::Invalid, start, start, &[]),
            c if is_name_start(c) => {
                self.pos += 1;
                while self.peek().is_some_and(is_name_char) {
                    self.pos += 1;
                }
                self.push(NodeKind::Name, start, self.pos, &[])
            }
            _ => self.recover(start, prec),
        }
    }

    /// Skip garbage until either an operator/closer (yielding `Invalid`) or
    /// the start of something parseable (yielding `Unknown` around it).
    fn recover(&mut self, start: usize, prec: u8) -> NodeId {
        self.pos += 1;
        loop {
            let Some(c) = self.peek() else { break };
            if matches!(c, b'|' | b'&' | b':' | b')' | b']' | b'>' | b'}') {
                break;
            }
            if self.at_primary_start() {
                let x = self.parse_expr(prec);
                let end = self.end_of(x);
                return self.push(NodeKind::Unknown, start, end, &[x]);
            }
            self.pos += 1;
        }
        self.push(NodeKind::Invalid, start, self.pos, &[])
    }

    fn at_primary_start(&self) -> bool {
        match self.peek() {
            Some(b'?' | b'!' | b'(' | b'[' | b'*' | b'\'' | b'"' | b'0'..=b'9') => true,
            Some(b'.') => self.starts_with(b"..."),
            Some(c) => is_name_start(c),
            None => false,
        }
    }
}

fn is_name_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_' || c == b'\\' || c == b'$' || c >= 0x80
}

fn is_name_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_' || c == b'\\' || c == b'-' || c >= 0x80
}

fn offset(pos: usize) -> u32 {
    u32::try_from(pos).unwrap_or(u32::MAX)
}

/// Materialize the arena subtree rooted at `id` as an owned tree.
fn build(nodes: &[Node], id: NodeId, src: &[u8]) -> TypeExpr {
    verity_stack::ensure_sufficient_stack(|| {
        let node = &nodes[id.0];
        let child = |i: usize| Box::new(build(nodes, node.args[i], src));
        let rest = |from: usize| -> Vec<TypeExpr> {
            node.args[from..]
                .iter()
                .map(|&a| build(nodes, a, src))
                .collect()
        };
        let kind = match node.kind {
            NodeKind::Invalid => ExprKind::Invalid,
            NodeKind::Name => ExprKind::Name,
            NodeKind::SpecialName => ExprKind::SpecialName,
            NodeKind::Int => ExprKind::Int,
            NodeKind::Literal => ExprKind::Literal,
            NodeKind::Unknown => ExprKind::Unknown(child(0)),
            NodeKind::Paren => ExprKind::Paren(child(0)),
            NodeKind::Nullable => ExprKind::Nullable(child(0)),
            NodeKind::Optional => ExprKind::Optional(child(0)),
            NodeKind::Not => ExprKind::Not(child(0)),
            NodeKind::Array => ExprKind::Array {
                elem: child(0),
                prefix: false,
            },
            NodeKind::PrefixArray => ExprKind::Array {
                elem: child(0),
                prefix: true,
            },
            NodeKind::KeyVal => ExprKind::KeyVal {
                key: child(0),
                val: child(1),
            },
            NodeKind::MemberType => ExprKind::MemberType {
                class: child(0),
                member: child(1),
            },
            NodeKind::Union => ExprKind::Union(rest(0)),
            NodeKind::Intersection => ExprKind::Intersection(rest(0)),
            NodeKind::Generic(bracket) => ExprKind::Generic {
                head: child(0),
                params: rest(1),
                bracket,
            },
            NodeKind::TypedCallable => ExprKind::TypedCallable {
                ret: child(0),
                params: rest(1),
            },
        };
        let value = src
            .get(node.start..node.end)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .unwrap_or_default();
        TypeExpr {
            span: Span::new(offset(node.start), offset(node.end)),
            value,
            kind,
        }
    })
}
