//! Deterministic renderers over a [`crate::schema::ContentTree`].
//!
//! Both walk the tree depth-first in pre-order and never reorder siblings.
//! They are pure: no I/O, no shared state, same input → byte-identical
//! output.
//!
//! 1. [`table`]: one spreadsheet row per element, hierarchy shown by
//!    indenting the `Type` column.
//! 2. [`graph`]: an indented outline of topics and annotated leaf facts;
//!    paragraph bodies are left out.

pub mod graph;
pub mod table;

/// Two spaces per nesting level.
pub(crate) fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}

/// Upper-case the first character and lower-case the rest
/// (`"sub_topic"` → `"Sub_topic"`).
pub(crate) fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
