//! Doc-comment parsing for verity.
//!
//! Two layers live here:
//!
//! - [`TypeParser`]: an operator-precedence parser for the type mini-language
//!   used inside doc comments (`?int`, `array<string, Foo>`, `shape(a: int)`,
//!   `callable(int):void`, ...). It never fails; malformed fragments become
//!   [`ExprKind::Invalid`] or [`ExprKind::Unknown`] nodes so the rest of the
//!   annotation stays usable.
//! - [`parse_comment`]: splits a `/** ... */` comment into tagged parts
//!   (`@param`, `@var`, `@return`, everything else kept raw).
//!
//! Neither layer knows anything about classes or resolved types; lowering a
//! [`TypeExpr`] into concrete types is done by `verity_lower`.

mod comment;
mod expr;
mod parser;
mod span;

pub use comment::{
    is_doc_comment, parse_comment, Comment, CommentPart, RawPart, TypePart, TypeVarPart,
};
pub use expr::{Bracket, ExprKind, ExprShape, ParsedType, TypeExpr};
pub use parser::TypeParser;
pub use span::{Span, SpanError};
