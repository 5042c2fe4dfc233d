//! Doc-comment tag extraction.
//!
//! Only lines that start with `@` (after the comment decoration is removed)
//! become parts. Tags that carry a type are parsed with the shared
//! [`TypeParser`]; everything else is kept as whitespace-split text.

use crate::{ParsedType, TypeParser};

/// A `/** ... */` comment split into tagged parts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Comment {
    pub raw: String,
    pub parsed: Vec<CommentPart>,
    /// `{@inheritdoc}` or `@inheritdoc` was found.
    pub inherit: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommentPart {
    /// `@param`, `@var`, `@property`, `@property-read`, `@property-write`
    TypeVar(TypeVarPart),
    /// `@return`
    Type(TypePart),
    /// Any other tag.
    Raw(RawPart),
}

impl CommentPart {
    /// 1-based line inside the comment.
    pub fn line(&self) -> usize {
        match self {
            CommentPart::TypeVar(p) => p.line,
            CommentPart::Type(p) => p.line,
            CommentPart::Raw(p) => p.line,
        }
    }

    /// Tag name without the `@`.
    pub fn name(&self) -> &str {
        match self {
            CommentPart::TypeVar(p) => &p.name,
            CommentPart::Type(p) => &p.name,
            CommentPart::Raw(p) => &p.name,
        }
    }
}

/// `@param int $x rest` or `@param $x int rest`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeVarPart {
    pub line: usize,
    pub name: String,
    /// The variable was written before the type.
    pub var_is_first: bool,
    /// Variable name including `$`, empty when absent.
    pub var: String,
    pub ty: ParsedType,
    pub rest: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypePart {
    pub line: usize,
    pub name: String,
    pub ty: ParsedType,
    pub rest: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawPart {
    pub line: usize,
    pub name: String,
    /// `{"a", "b"}` for `@tag a  b`.
    pub params: Vec<String>,
    /// `"a  b"` for `@tag a  b`.
    pub params_text: String,
}

impl RawPart {
    pub fn contains_param(&self, name: &str) -> bool {
        self.params.iter().any(|p| p == name)
    }
}

/// Whether `text` is a doc comment rather than a plain block comment.
pub fn is_doc_comment(text: &str) -> bool {
    text.starts_with("/**")
}

/// Split a doc comment into parts. Anything that is not a doc comment
/// yields an empty part list.
#[tracing::instrument(level = "trace", skip_all)]
pub fn parse_comment(parser: &mut TypeParser, raw: &str) -> Comment {
    let mut parsed = Vec::new();
    if is_doc_comment(raw) {
        for (i, line) in raw.split('\n').enumerate() {
            if let Some(part) = parse_line(parser, i + 1, line) {
                parsed.push(part);
            }
        }
    }

    let inherit = raw.to_lowercase().contains("{@inheritdoc}")
        || parsed
            .iter()
            .any(|p| p.name().eq_ignore_ascii_case("inheritdoc"));

    Comment {
        raw: raw.to_owned(),
        parsed,
        inherit,
    }
}

fn parse_line(parser: &mut TypeParser, line: usize, text: &str) -> Option<CommentPart> {
    let text = text.trim();
    let text = text.strip_prefix("/**").unwrap_or(text);
    let text = text.strip_prefix('*').unwrap_or(text);
    let text = text.strip_suffix("*/").unwrap_or(text);
    let text = text.trim();
    if !text.starts_with('@') {
        return None;
    }

    let (tag, params_text) = match text.find(|c: char| c.is_ascii_whitespace()) {
        Some(pos) => (&text[..pos], text[pos..].trim()),
        None => (text, ""),
    };
    let name = tag.trim_start_matches('@').to_owned();

    let part = match name.as_str() {
        "param" | "var" | "property" | "property-read" | "property-write" => {
            CommentPart::TypeVar(parse_type_var(parser, line, name, params_text))
        }
        "return" => {
            let ty = parser.parse(params_text);
            let rest = ty.rest().to_owned();
            CommentPart::Type(TypePart {
                line,
                name,
                ty,
                rest,
            })
        }
        _ => CommentPart::Raw(RawPart {
            line,
            name,
            params: params_text
                .split_ascii_whitespace()
                .map(str::to_owned)
                .collect(),
            params_text: params_text.to_owned(),
        }),
    };
    Some(part)
}

fn parse_type_var(parser: &mut TypeParser, line: usize, name: String, text: &str) -> TypeVarPart {
    if text.starts_with('$') {
        let (var, after) = split_word(text);
        let ty = parser.parse(after);
        let rest = ty.rest().to_owned();
        return TypeVarPart {
            line,
            name,
            var_is_first: true,
            var: var.to_owned(),
            ty,
            rest,
        };
    }

    let ty = parser.parse(text);
    let after = ty.rest();
    let (var, rest) = if after.starts_with('$') {
        split_word(after)
    } else {
        ("", after)
    };
    TypeVarPart {
        line,
        name,
        var_is_first: false,
        var: var.to_owned(),
        rest: rest.to_owned(),
        ty,
    }
}

/// First whitespace-delimited word and the trimmed remainder.
fn split_word(text: &str) -> (&str, &str) {
    match text.find(|c: char| c.is_ascii_whitespace()) {
        Some(pos) => (&text[..pos], text[pos..].trim()),
        None => (text, ""),
    }
}

#[cfg(test)]
mod tests;
