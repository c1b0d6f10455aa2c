//! rulecheck - verification harness for rule-based analyzers and fixers
//!
//! This crate verifies the behavior of an external analysis engine against
//! declarative fixtures:
//!
//! 1. Strip markup annotations from the fixture, keeping a key-to-span map
//! 2. Run the analyzer and compare produced diagnostics to expectations
//!    (order-independent, exact on rule id, span, and arguments)
//! 3. Optionally apply fixes to a fixed point within a bounded iteration
//!    budget and compare the final text to the declared fixed fixture
//!
//! The analyzed language is never parsed here; analyzers and fixers are
//! reached through the [`Analyzer`] and [`Fixer`] traits and treated as
//! opaque collaborators.

pub mod cache;
pub mod compare;
pub mod engine;
pub mod expect;
pub mod fixer;
pub mod suite;
pub mod verify;

#[cfg(test)]
mod test_utils;

pub use cache::AnalysisCache;
pub use compare::{compare, Comparison, ResolvedExpectation};
pub use engine::{Analyzer, Dialect, EngineError, Fixer};
pub use expect::{DiagnosticExpectation, ExpectedLocation};
pub use fixer::{apply_edits, EditFixer};
pub use suite::{CaseOutcome, Suite, SuiteError, SuiteReport};
pub use verify::{DiagnosticReport, HarnessError, Verifier};

pub use rulecheck_config::{ConfigError, OptionsOverlay};
pub use rulecheck_diagnostics::{
    DescriptorError, Diagnostic, Edit, Fix, Location, RuleDescriptor, RuleRegistry, Severity,
};
pub use rulecheck_text::{LineIndex, MarkupError, MarkupFixture, Span};
