//! Expected diagnostics
//!
//! An expectation names a rule, a location (a markup key or explicit
//! line/column coordinates), and the ordered message arguments the
//! produced diagnostic must carry.

use rulecheck_text::{LineIndex, MarkupFixture, Span};

/// Where an expected diagnostic must appear
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedLocation {
    /// A markup key declared in the fixture (`{|#K: ... |}`)
    Markup(u32),
    /// Explicit 1-indexed coordinates in the markup-free text
    Explicit {
        line: u32,
        column: u32,
        end_line: u32,
        end_column: u32,
    },
}

/// One expected diagnostic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticExpectation {
    pub rule_id: String,
    pub location: ExpectedLocation,
    pub arguments: Vec<String>,
}

impl DiagnosticExpectation {
    /// Expect a diagnostic at markup key 0; use `at_key` to re-anchor
    pub fn new(rule_id: impl Into<String>) -> Self {
        Self {
            rule_id: rule_id.into(),
            location: ExpectedLocation::Markup(0),
            arguments: Vec::new(),
        }
    }

    /// Anchor at a markup key
    pub fn at_key(mut self, key: u32) -> Self {
        self.location = ExpectedLocation::Markup(key);
        self
    }

    /// Anchor at an explicit single-line range
    pub fn at(self, line: u32, column: u32, end_column: u32) -> Self {
        self.spanning(line, column, line, end_column)
    }

    /// Anchor at an explicit possibly multi-line range
    pub fn spanning(mut self, line: u32, column: u32, end_line: u32, end_column: u32) -> Self {
        self.location = ExpectedLocation::Explicit {
            line,
            column,
            end_line,
            end_column,
        };
        self
    }

    pub fn with_arguments<I, S>(mut self, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments = arguments.into_iter().map(Into::into).collect();
        self
    }

    /// Resolve the expected location to a concrete span
    pub fn resolve(
        &self,
        fixture: &MarkupFixture,
        index: &LineIndex,
    ) -> Result<Span, ResolveError> {
        match self.location {
            ExpectedLocation::Markup(key) => fixture.span(key).ok_or(ResolveError::UnknownKey {
                key,
                declared: fixture.keys().to_vec(),
            }),
            ExpectedLocation::Explicit {
                line,
                column,
                end_line,
                end_column,
            } => {
                let start = index
                    .offset(line, column)
                    .ok_or(ResolveError::OutOfBounds { line, column })?;
                let end = index.offset(end_line, end_column).ok_or(ResolveError::OutOfBounds {
                    line: end_line,
                    column: end_column,
                })?;
                Ok(Span::new(start, end))
            }
        }
    }
}

/// Failure to turn an expected location into a span
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("markup key #{key} was never declared (declared keys: {declared:?})")]
    UnknownKey { key: u32, declared: Vec<u32> },
    #[error("location {line}:{column} is outside the fixture")]
    OutOfBounds { line: u32, column: u32 },
}
