//! Rule-independent diagnostic types
//!
//! This crate provides the diagnostic model shared by analyzers, fixers,
//! and the verification harness: the [`Diagnostic`] wire shape, attached
//! [`Fix`] edits, immutable [`RuleDescriptor`] metadata, and the
//! [`RuleRegistry`] built once at startup and passed by reference into
//! every harness invocation.

mod descriptor;
mod diagnostic;
mod registry;

pub use descriptor::RuleDescriptor;
pub use diagnostic::{Diagnostic, Edit, Fix, Location, Severity};
pub use registry::{DescriptorError, RuleRegistry};
