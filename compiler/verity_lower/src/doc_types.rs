//! Function-level type facts extracted from a doc comment.

use std::fmt;

use rustc_hash::FxHashMap;
use verity_doc::{Comment, CommentPart, ParsedType, RawPart};
use verity_types::{ClosureMap, Map, Normalizer, ShapesMap};

use crate::{Converter, Lowered};

/// A `@param` entry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Param {
    /// The description contains `[optional]`.
    pub optional: bool,
    pub typ: Map,
}

/// Parameters keyed by variable name without `$`.
pub type ParamsMap = FxHashMap<String, Param>;

/// `@deprecated`, `@removed` and the `@see` replacements that follow them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeprecationInfo {
    pub deprecated: bool,
    pub removed: bool,
    pub reason: String,
    pub removed_reason: String,
    /// `@see` targets joined with `" or "`.
    pub replacement: String,
}

/// Renders the parenthesized detail of a "call to deprecated function"
/// report: `reason, use X instead`.
impl fmt::Display for DeprecationInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sep = "";
        if !self.reason.is_empty() {
            f.write_str(&self.reason)?;
            sep = ", ";
        }
        if !self.replacement.is_empty() {
            write!(f, "{sep}use {} instead", self.replacement)?;
            sep = ", ";
        }
        if self.removed {
            write!(f, "{sep}removed")?;
            if !self.removed_reason.is_empty() {
                write!(f, ": {}", self.removed_reason)?;
            }
        }
        Ok(())
    }
}

/// A lowering warning tied to the tag it came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocWarning {
    /// 1-based line inside the comment.
    pub line: usize,
    pub tag: String,
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DocTypes {
    /// Always immutable.
    pub return_type: Map,
    pub params: ParamsMap,
    pub deprecation: DeprecationInfo,
    pub inherit: bool,
    pub shapes: ShapesMap,
    pub closures: ClosureMap,
    pub warnings: Vec<DocWarning>,
}

impl DocTypes {
    /// Collect the types of `comment`.
    ///
    /// `actual_params` are the declared parameter names in order; a
    /// `@param` without a `$var` binds to the declared parameter at its
    /// position among the `@param` tags.
    #[tracing::instrument(level = "trace", skip_all, fields(tags = comment.parsed.len()))]
    pub fn from_comment(
        comment: &Comment,
        actual_params: &[&str],
        normalizer: &Normalizer<'_>,
    ) -> Self {
        let mut out = DocTypes::default();
        if comment.raw.is_empty() {
            return out;
        }

        let conv = Converter::new(normalizer.resolver(), normalizer.kphp());
        let mut cur_param = 0;

        for part in &comment.parsed {
            match part {
                CommentPart::Raw(raw) => out.deprecation.apply(raw),

                CommentPart::Type(p) if p.name == "return" => {
                    let types = out.lower(&conv, p.line, &p.name, &p.ty);
                    out.return_type = Map::from_types_normalized(normalizer, types);
                }

                CommentPart::TypeVar(p) if p.name == "param" => {
                    let mut var = p.var.as_str();
                    if !var.starts_with('$') {
                        if let Some(actual) = actual_params.get(cur_param) {
                            var = *actual;
                        }
                    }
                    cur_param += 1;

                    let types = out.lower(&conv, p.line, &p.name, &p.ty);
                    let param = Param {
                        optional: p.rest.contains("[optional]"),
                        typ: Map::from_types_normalized(normalizer, types),
                    };
                    out.params
                        .insert(var.trim_start_matches('$').to_owned(), param);
                }

                CommentPart::Type(_) | CommentPart::TypeVar(_) => {}
            }
        }

        out.return_type = out.return_type.immutable();
        out.inherit = comment.inherit;
        out
    }

    fn lower(
        &mut self,
        conv: &Converter<'_>,
        line: usize,
        tag: &str,
        ty: &ParsedType,
    ) -> Vec<verity_types::Type> {
        let Lowered {
            types,
            shapes,
            closures,
            warnings,
        } = conv.lower(&ty.expr);
        self.shapes.extend(shapes);
        self.closures.extend(closures);
        self.warnings
            .extend(warnings.into_iter().map(|message| DocWarning {
                line,
                tag: tag.to_owned(),
                message,
            }));
        types
    }
}

impl DeprecationInfo {
    fn apply(&mut self, part: &RawPart) {
        match part.name.as_str() {
            "deprecated" => {
                self.deprecated = true;
                self.reason.clone_from(&part.params_text);
            }
            "removed" => {
                self.removed = true;
                self.removed_reason.clone_from(&part.params_text);
            }
            "see" if self.deprecated => {
                if !self.replacement.is_empty() {
                    self.replacement.push_str(" or ");
                }
                self.replacement.push_str(&part.params_text);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests;
