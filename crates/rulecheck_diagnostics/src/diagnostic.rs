use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use rulecheck_text::{LineIndex, Span};

/// Severity level of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
}

/// A resolved position in source text, for rendering failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// 1-indexed line number
    pub line: u32,
    /// 1-indexed column number
    pub column: u32,
    /// Byte span
    pub span: Span,
}

impl Location {
    pub fn of(span: Span, index: &LineIndex) -> Self {
        let (line, column) = index.line_col(span.start);
        Self { line, column, span }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A text edit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edit {
    /// Byte offset start
    pub start: u32,
    /// Byte offset end
    pub end: u32,
    /// Replacement text
    pub replacement: String,
}

impl Edit {
    pub fn new(start: u32, end: u32, replacement: impl Into<String>) -> Self {
        Self {
            start,
            end,
            replacement: replacement.into(),
        }
    }

    /// Create an insertion at a position
    pub fn insert(pos: u32, text: impl Into<String>) -> Self {
        Self::new(pos, pos, text)
    }

    /// Create a deletion of a range
    pub fn delete(start: u32, end: u32) -> Self {
        Self::new(start, end, "")
    }
}

/// A suggested fix attached to a diagnostic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fix {
    /// Description of what this fix does
    pub message: String,
    /// Edits to apply
    pub edits: SmallVec<[Edit; 2]>,
}

impl Fix {
    pub fn new(message: impl Into<String>, edits: impl IntoIterator<Item = Edit>) -> Self {
        Self {
            message: message.into(),
            edits: edits.into_iter().collect(),
        }
    }
}

/// A diagnostic produced by an analyzer
///
/// Message arguments are carried positionally rather than preformatted:
/// the harness compares them element-wise against expectations, and the
/// registry renders them into the rule's message template on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Rule identifier (e.g. "CA1071")
    pub rule_id: String,
    /// Span in the analyzed text
    pub span: Span,
    /// Ordered message-format arguments
    pub arguments: Vec<String>,
    /// Severity level
    pub severity: Severity,
    /// Optional attached fix
    pub fix: Option<Fix>,
}

impl Diagnostic {
    pub fn new(rule_id: impl Into<String>, span: Span, severity: Severity) -> Self {
        Self {
            rule_id: rule_id.into(),
            span,
            arguments: Vec::new(),
            severity,
            fix: None,
        }
    }

    /// Create an error diagnostic
    pub fn error(rule_id: impl Into<String>, span: Span) -> Self {
        Self::new(rule_id, span, Severity::Error)
    }

    /// Create a warning diagnostic
    pub fn warning(rule_id: impl Into<String>, span: Span) -> Self {
        Self::new(rule_id, span, Severity::Warning)
    }

    /// Attach message arguments
    pub fn with_arguments<I, S>(mut self, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments = arguments.into_iter().map(Into::into).collect();
        self
    }

    /// Attach a fix
    pub fn with_fix(mut self, fix: Fix) -> Self {
        self.fix = Some(fix);
        self
    }

    pub fn is_fixable(&self) -> bool {
        self.fix.is_some()
    }
}
