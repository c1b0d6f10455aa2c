//! Diagnostic equality comparator
//!
//! The correctness oracle of the harness: a produced diagnostic matches an
//! expectation iff the (rule id, span, argument list) triple is equal.
//! Matching is order-independent, argument lists compare element-wise, and
//! there is deliberately no fuzzy fallback - anything less than exact
//! equality would hide regressions in the engine under test.

use rulecheck_diagnostics::Diagnostic;
use rulecheck_text::Span;

/// An expectation whose location has been resolved to a concrete span
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedExpectation {
    pub rule_id: String,
    pub span: Span,
    pub arguments: Vec<String>,
}

impl ResolvedExpectation {
    fn matches(&self, diagnostic: &Diagnostic) -> bool {
        self.rule_id == diagnostic.rule_id
            && self.span == diagnostic.span
            && self.arguments == diagnostic.arguments
    }
}

/// Outcome of comparing produced diagnostics against expectations
#[derive(Debug, Clone)]
pub struct Comparison {
    /// Number of expectation/diagnostic pairs that matched
    pub matched: usize,
    /// Expectations with no matching diagnostic
    pub missing: Vec<ResolvedExpectation>,
    /// Diagnostics with no matching expectation
    pub unexpected: Vec<Diagnostic>,
}

impl Comparison {
    pub fn is_match(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty()
    }
}

/// Compare as multisets: each diagnostic satisfies at most one expectation
pub fn compare(expected: &[ResolvedExpectation], actual: &[Diagnostic]) -> Comparison {
    let mut consumed = vec![false; actual.len()];
    let mut matched = 0;
    let mut missing = Vec::new();

    for expectation in expected {
        let found = actual.iter().enumerate().find(|(index, diagnostic)| {
            !consumed[*index] && expectation.matches(diagnostic)
        });
        match found {
            Some((index, _)) => {
                consumed[index] = true;
                matched += 1;
            }
            None => missing.push(expectation.clone()),
        }
    }

    let unexpected = actual
        .iter()
        .zip(&consumed)
        .filter(|(_, consumed)| !**consumed)
        .map(|(diagnostic, _)| diagnostic.clone())
        .collect();

    Comparison {
        matched,
        missing,
        unexpected,
    }
}
