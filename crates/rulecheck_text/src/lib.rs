//! Text layer for the verification harness
//!
//! This crate provides the span and position primitives shared by the rest
//! of the workspace, plus the markup preprocessing pass that turns an
//! annotated fixture into plain source text and a key-to-span table.

mod line_index;
mod markup;
mod span;

pub use line_index::LineIndex;
pub use markup::{MarkupError, MarkupFixture};
pub use span::Span;
