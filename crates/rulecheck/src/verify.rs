//! Verification harness core
//!
//! Orchestrates one test case: markup-parse the fixture, resolve and
//! validate expectations, run the analyzer, compare diagnostic sets, and
//! optionally drive the fixer to a fixed point within a bounded iteration
//! budget. Any mismatch is a hard failure carried back to the caller with
//! enough structured detail to diagnose without re-running; nothing is
//! retried or swallowed.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, trace};

use rulecheck_config::{ConfigError, OptionsOverlay};
use rulecheck_diagnostics::{DescriptorError, Diagnostic, Location, RuleRegistry};
use rulecheck_text::{LineIndex, MarkupError, MarkupFixture, Span};

use crate::cache::AnalysisCache;
use crate::compare::{compare, ResolvedExpectation};
use crate::engine::{Analyzer, Dialect, Fixer};
use crate::expect::{DiagnosticExpectation, ResolveError};

/// One side of a mismatch, rendered for failure output
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticReport {
    pub rule_id: String,
    pub location: Location,
    pub arguments: Vec<String>,
    /// Message template instantiation, when the rule is registered
    pub message: Option<String>,
}

impl std::fmt::Display for DiagnosticReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {} {:?}", self.rule_id, self.location, self.arguments)?;
        if let Some(message) = &self.message {
            write!(f, " - {message}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error(
        "produced diagnostics do not match expectations\n{}",
        render_mismatch(.missing, .unexpected)
    )]
    Mismatch {
        missing: Vec<DiagnosticReport>,
        unexpected: Vec<DiagnosticReport>,
    },

    #[error(
        "fixed output diverges after {iterations} iteration(s)\n\
         --- expected ---\n{expected}\n--- actual ---\n{actual}"
    )]
    FixDivergence {
        expected: String,
        actual: String,
        iterations: u32,
    },

    #[error("markup key #{key} was never declared (declared keys: {declared:?})")]
    UnknownMarkupKey { key: u32, declared: Vec<u32> },

    #[error("expectation location {line}:{column} is outside the fixture")]
    InvalidLocation { line: u32, column: u32 },

    #[error("analyzer does not support dialect '{dialect}'")]
    UnsupportedDialect { dialect: Dialect },

    #[error("analyzer crashed: {detail}")]
    AnalyzerCrash { detail: String },

    #[error("run_code_fix called on a verifier without a fixer")]
    NoFixer,

    #[error(transparent)]
    Markup(#[from] MarkupError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
}

fn render_mismatch(missing: &[DiagnosticReport], unexpected: &[DiagnosticReport]) -> String {
    use std::fmt::Write;
    let mut out = String::new();
    for report in missing {
        let _ = writeln!(out, "  missing    {report}");
    }
    for report in unexpected {
        let _ = writeln!(out, "  unexpected {report}");
    }
    out
}

/// Harness for one analyzer/fixer pair
///
/// Borrows the immutable rule registry and the engines; per-case state
/// (overlay, fixture) never outlives a single run. The same verifier can
/// drive any number of cases.
pub struct Verifier<'a> {
    registry: &'a RuleRegistry,
    analyzer: &'a dyn Analyzer,
    fixer: Option<&'a dyn Fixer>,
    overlay: OptionsOverlay,
    cache: Option<&'a AnalysisCache>,
}

impl<'a> Verifier<'a> {
    pub fn new(registry: &'a RuleRegistry, analyzer: &'a dyn Analyzer) -> Self {
        Self {
            registry,
            analyzer,
            fixer: None,
            overlay: OptionsOverlay::new(),
            cache: None,
        }
    }

    pub fn with_fixer(mut self, fixer: &'a dyn Fixer) -> Self {
        self.fixer = Some(fixer);
        self
    }

    /// Attach a configuration overlay for subsequent runs
    pub fn with_overlay(mut self, overlay: OptionsOverlay) -> Self {
        self.overlay = overlay;
        self
    }

    pub fn with_cache(mut self, cache: &'a AnalysisCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn overlay(&self) -> &OptionsOverlay {
        &self.overlay
    }

    /// Run the analyzer and assert the produced diagnostics match
    pub fn run_analysis_only(
        &self,
        raw_fixture: &str,
        dialect: Dialect,
        expectations: &[DiagnosticExpectation],
    ) -> Result<(), HarnessError> {
        self.check_analysis(raw_fixture, dialect, expectations)?;
        Ok(())
    }

    /// Run analysis, then drive the fixer to the declared fixed output
    ///
    /// After the analysis assertion passes, repeatedly selects the first
    /// fixable diagnostic (lowest span start, ties broken by rule id),
    /// applies the fixer, and re-analyzes - until no fixable diagnostic
    /// remains, an application leaves the text unchanged, or the iteration
    /// budget runs out. The final text must equal `fixed_source` up to
    /// line-ending normalization.
    pub fn run_code_fix(
        &self,
        raw_fixture: &str,
        dialect: Dialect,
        expectations: &[DiagnosticExpectation],
        fixed_source: &str,
        max_iterations: u32,
    ) -> Result<(), HarnessError> {
        let fixer = self.fixer.ok_or(HarnessError::NoFixer)?;
        let (fixture, mut diagnostics) =
            self.check_analysis(raw_fixture, dialect, expectations)?;

        let mut current = fixture.source().to_string();
        let mut iterations = 0;
        while iterations < max_iterations {
            let Some(target) = select_fixable(&diagnostics) else {
                break;
            };
            trace!(rule = %target.rule_id, iteration = iterations + 1, "applying fix");
            let next = contain(|| fixer.apply_fix(&current, target))?;
            iterations += 1;
            if next == current {
                // Fixed point: the fixer declined, or a fix re-produced
                // the same text
                break;
            }
            current = next;
            diagnostics = self.analyze(&current, dialect)?;
        }

        if normalize_line_endings(&current) != normalize_line_endings(fixed_source) {
            return Err(HarnessError::FixDivergence {
                expected: fixed_source.to_string(),
                actual: current,
                iterations,
            });
        }
        debug!(iterations, "code fix verified");
        Ok(())
    }

    /// Map a markup key to its concrete span in the stripped fixture
    pub fn resolve_markup_location(
        &self,
        raw_fixture: &str,
        key: u32,
    ) -> Result<Span, HarnessError> {
        let fixture = MarkupFixture::parse(raw_fixture)?;
        fixture.span(key).ok_or_else(|| HarnessError::UnknownMarkupKey {
            key,
            declared: fixture.keys().to_vec(),
        })
    }

    /// Shared analysis step: parse, resolve, analyze, compare
    fn check_analysis(
        &self,
        raw_fixture: &str,
        dialect: Dialect,
        expectations: &[DiagnosticExpectation],
    ) -> Result<(MarkupFixture, Vec<Diagnostic>), HarnessError> {
        if !self.analyzer.supports(dialect) {
            return Err(HarnessError::UnsupportedDialect { dialect });
        }

        let fixture = MarkupFixture::parse(raw_fixture)?;
        let index = LineIndex::new(fixture.source());

        let mut resolved = Vec::with_capacity(expectations.len());
        for expectation in expectations {
            self.registry
                .validate_arguments(&expectation.rule_id, &expectation.arguments)?;
            let span = expectation.resolve(&fixture, &index).map_err(|err| match err {
                ResolveError::UnknownKey { key, declared } => {
                    HarnessError::UnknownMarkupKey { key, declared }
                }
                ResolveError::OutOfBounds { line, column } => {
                    HarnessError::InvalidLocation { line, column }
                }
            })?;
            resolved.push(ResolvedExpectation {
                rule_id: expectation.rule_id.clone(),
                span,
                arguments: expectation.arguments.clone(),
            });
        }

        debug!(
            dialect = %dialect,
            expectations = resolved.len(),
            "running analysis"
        );
        let diagnostics = self.analyze(fixture.source(), dialect)?;

        let comparison = compare(&resolved, &diagnostics);
        if !comparison.is_match() {
            return Err(HarnessError::Mismatch {
                missing: comparison
                    .missing
                    .iter()
                    .map(|expectation| self.report_expectation(expectation, &index))
                    .collect(),
                unexpected: comparison
                    .unexpected
                    .iter()
                    .map(|diagnostic| self.report_diagnostic(diagnostic, &index))
                    .collect(),
            });
        }
        Ok((fixture, diagnostics))
    }

    /// Invoke the analyzer with crash containment and memoization
    fn analyze(&self, source: &str, dialect: Dialect) -> Result<Vec<Diagnostic>, HarnessError> {
        if let Some(cache) = self.cache {
            if let Some(hit) = cache.get(source, dialect, &self.overlay) {
                return Ok(hit);
            }
        }
        let diagnostics = contain(|| self.analyzer.analyze(source, dialect, &self.overlay))?;
        if let Some(cache) = self.cache {
            cache.insert(source, dialect, &self.overlay, diagnostics.clone());
        }
        Ok(diagnostics)
    }

    fn report_expectation(
        &self,
        expectation: &ResolvedExpectation,
        index: &LineIndex,
    ) -> DiagnosticReport {
        DiagnosticReport {
            rule_id: expectation.rule_id.clone(),
            location: Location::of(expectation.span, index),
            arguments: expectation.arguments.clone(),
            message: self
                .registry
                .get(&expectation.rule_id)
                .map(|descriptor| descriptor.render_message(&expectation.arguments)),
        }
    }

    fn report_diagnostic(&self, diagnostic: &Diagnostic, index: &LineIndex) -> DiagnosticReport {
        DiagnosticReport {
            rule_id: diagnostic.rule_id.clone(),
            location: Location::of(diagnostic.span, index),
            arguments: diagnostic.arguments.clone(),
            message: self
                .registry
                .get(&diagnostic.rule_id)
                .map(|descriptor| descriptor.render_message(&diagnostic.arguments)),
        }
    }
}

/// Run an engine call with panic containment
///
/// Both an `Err` return and a panic surface as an analyzer crash; neither
/// is ever conflated with an empty diagnostic set.
fn contain<T>(
    call: impl FnOnce() -> Result<T, crate::engine::EngineError>,
) -> Result<T, HarnessError> {
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(HarnessError::AnalyzerCrash { detail: err.to_string() }),
        Err(payload) => Err(HarnessError::AnalyzerCrash { detail: panic_detail(payload) }),
    }
}

fn panic_detail(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Pick the diagnostic the next fix iteration targets
///
/// Prefers diagnostics carrying an attached fix; engines that fix without
/// attaching edits get the first diagnostic overall and may decline by
/// returning the text unchanged.
fn select_fixable(diagnostics: &[Diagnostic]) -> Option<&Diagnostic> {
    let ordered = |a: &&Diagnostic, b: &&Diagnostic| {
        a.span
            .start
            .cmp(&b.span.start)
            .then_with(|| a.rule_id.cmp(&b.rule_id))
    };
    diagnostics
        .iter()
        .filter(|diagnostic| diagnostic.is_fixable())
        .min_by(ordered)
        .or_else(|| diagnostics.iter().min_by(ordered))
}

fn normalize_line_endings(text: &str) -> std::borrow::Cow<'_, str> {
    if text.contains('\r') {
        std::borrow::Cow::Owned(text.replace("\r\n", "\n"))
    } else {
        std::borrow::Cow::Borrowed(text)
    }
}
