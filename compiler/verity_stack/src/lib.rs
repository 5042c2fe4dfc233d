//! Stack growth for recursion over doc-comment type trees.
//!
//! Every stage of the doc-type pipeline walks a tree whose depth is chosen by
//! whoever wrote the comment. `@param array<array<array<...int>>> $x` or
//! `@return ((((int))))` nests one tree level per bracket, and a generated
//! or hostile file can repeat that thousands of times. The linter analyses
//! files on worker threads with ordinary stack sizes, so each recursive
//! stage guards its entry point:
//!
//! | Stage | Recursion |
//! |-------|-----------|
//! | `verity_doc` parser | one precedence-climbing call per nested operand |
//! | `verity_doc` tree building | arena node to owned `TypeExpr` |
//! | `TypeExpr` display and `strip_parens` | one call per child node |
//! | `verity_lower` converter | one call per expression level |
//! | lazy type formatting | one call per nested `array_of` query |
//! | compatibility check | one call per array dimension of both sides |
//!
//! On wasm32 the guard is a plain call; the host owns the stack there.

/// Grow once less than this remains. One parser frame plus the lowering
/// frame for the same node fit well inside it.
const RED_ZONE: usize = 64 * 1024;

/// Size of each new stack segment.
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Run `f`, first moving to a fresh stack segment if the current one is
/// nearly exhausted.
///
/// ```text
/// fn lower(&self, e: &TypeExpr) -> Vec<Type> {
///     ensure_sufficient_stack(|| self.lower_kind(e))
/// }
/// ```
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
