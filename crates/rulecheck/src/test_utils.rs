//! Shared helpers for in-crate tests: a small stable of engines with
//! known behavior, the descriptor table they report against, and
//! panic-style assertion wrappers.

use std::sync::atomic::{AtomicUsize, Ordering};

use rulecheck_config::OptionsOverlay;
use rulecheck_diagnostics::{
    Diagnostic, Edit, Fix, RuleDescriptor, RuleRegistry, Severity,
};
use rulecheck_text::Span;

use crate::engine::{Analyzer, Dialect, EngineError};
use crate::expect::DiagnosticExpectation;
use crate::fixer::EditFixer;
use crate::verify::Verifier;

pub static BANNED_TODO: RuleDescriptor = RuleDescriptor::new(
    "RC0001",
    "banned-todo",
    "Flags leftover TODO markers",
    Severity::Warning,
    "Remove banned token '{0}'",
);

pub static LEGACY_CALL: RuleDescriptor = RuleDescriptor::new(
    "RC0002",
    "legacy-call",
    "Flags calls into the legacy API",
    Severity::Warning,
    "Replace legacy call '{0}'",
);

pub static INTERIM_CALL: RuleDescriptor = RuleDescriptor::new(
    "RC0003",
    "interim-call",
    "Flags calls into the interim API",
    Severity::Warning,
    "Replace interim call '{0}'",
);

pub static SURFACE_VISIBILITY: RuleDescriptor = RuleDescriptor::new(
    "CA2210",
    "surface-visibility",
    "Flags declarations on configured accessibility surfaces",
    Severity::Warning,
    "Declaration is {0}",
)
.with_options(&["api_surface"]);

pub static CTOR_PARAM_MISMATCH: RuleDescriptor = RuleDescriptor::new(
    "CA1071",
    "parameter-name-mismatch",
    "Constructor parameters should match property names",
    Severity::Warning,
    "Parameter '{1}' of constructor on type '{0}' should match property '{2}'",
);

pub fn test_registry() -> RuleRegistry {
    RuleRegistry::new(&[
        &BANNED_TODO,
        &LEGACY_CALL,
        &INTERIM_CALL,
        &SURFACE_VISIBILITY,
        &CTOR_PARAM_MISMATCH,
    ])
    .unwrap()
}

/// One substring-matching rule for [`PatternAnalyzer`]
pub struct PatternRule {
    pub rule_id: &'static str,
    pub pattern: &'static str,
    /// When set, diagnostics carry a fix replacing the match
    pub replacement: Option<&'static str>,
    pub severity: Severity,
}

/// Table-driven engine: flags every occurrence of each rule's pattern
///
/// Each diagnostic carries the matched text as its single argument. Rules
/// can be disabled per run through the `enabled` overlay option.
pub struct PatternAnalyzer {
    rules: Vec<PatternRule>,
    reverse_order: bool,
    csharp_only: bool,
}

impl PatternAnalyzer {
    pub fn new(rules: Vec<PatternRule>) -> Self {
        Self {
            rules,
            reverse_order: false,
            csharp_only: false,
        }
    }

    /// Emit diagnostics in reverse source order
    pub fn reversed(mut self) -> Self {
        self.reverse_order = true;
        self
    }

    /// Refuse Visual Basic fixtures
    pub fn csharp_only(mut self) -> Self {
        self.csharp_only = true;
        self
    }
}

impl Analyzer for PatternAnalyzer {
    fn analyze(
        &self,
        source: &str,
        _dialect: Dialect,
        overlay: &OptionsOverlay,
    ) -> Result<Vec<Diagnostic>, EngineError> {
        let mut diagnostics = Vec::new();
        for rule in &self.rules {
            if !overlay.bool_option(rule.rule_id, "enabled", true) {
                continue;
            }
            let mut search_from = 0;
            while let Some(found) = source[search_from..].find(rule.pattern) {
                let start = search_from + found;
                let end = start + rule.pattern.len();
                let span = Span::new(start as u32, end as u32);
                let mut diagnostic = Diagnostic::new(rule.rule_id, span, rule.severity)
                    .with_arguments([rule.pattern]);
                if let Some(replacement) = rule.replacement {
                    diagnostic = diagnostic.with_fix(Fix::new(
                        format!("replace with `{replacement}`"),
                        [Edit::new(span.start, span.end, replacement)],
                    ));
                }
                diagnostics.push(diagnostic);
                search_from = end;
            }
        }
        if self.reverse_order {
            diagnostics.reverse();
        }
        Ok(diagnostics)
    }

    fn supports(&self, dialect: Dialect) -> bool {
        !self.csharp_only || dialect == Dialect::CSharp
    }
}

/// Wraps an analyzer and counts how often it actually runs
pub struct CountingAnalyzer<A> {
    inner: A,
    calls: AtomicUsize,
}

impl<A> CountingAnalyzer<A> {
    pub fn new(inner: A) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl<A: Analyzer> Analyzer for CountingAnalyzer<A> {
    fn analyze(
        &self,
        source: &str,
        dialect: Dialect,
        overlay: &OptionsOverlay,
    ) -> Result<Vec<Diagnostic>, EngineError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.inner.analyze(source, dialect, overlay)
    }

    fn supports(&self, dialect: Dialect) -> bool {
        self.inner.supports(dialect)
    }
}

/// Engine that panics inside analysis
pub struct PanickingAnalyzer;

impl Analyzer for PanickingAnalyzer {
    fn analyze(
        &self,
        _source: &str,
        _dialect: Dialect,
        _overlay: &OptionsOverlay,
    ) -> Result<Vec<Diagnostic>, EngineError> {
        panic!("semantic model exploded");
    }
}

/// Engine that reports failure through its error channel
pub struct FailingAnalyzer;

impl Analyzer for FailingAnalyzer {
    fn analyze(
        &self,
        _source: &str,
        _dialect: Dialect,
        _overlay: &OptionsOverlay,
    ) -> Result<Vec<Diagnostic>, EngineError> {
        Err(EngineError::Analysis("metadata reference missing".to_string()))
    }
}

/// Flags declarations whose accessibility is on the configured surface
///
/// Resolves `api_surface` through the overlay (rule-scoped key first),
/// defaulting to `public` only. The diagnostic spans the accessibility
/// keyword and carries it as the single argument.
pub struct ApiSurfaceAnalyzer;

const SURFACE_RULE_ID: &str = "CA2210";
const ACCESSIBILITIES: [&str; 3] = ["public", "internal", "private"];

impl Analyzer for ApiSurfaceAnalyzer {
    fn analyze(
        &self,
        source: &str,
        _dialect: Dialect,
        overlay: &OptionsOverlay,
    ) -> Result<Vec<Diagnostic>, EngineError> {
        let surfaces = overlay
            .list_option(SURFACE_RULE_ID, "api_surface")
            .unwrap_or_else(|| vec!["public".to_string()]);

        let mut diagnostics = Vec::new();
        let mut offset = 0;
        for line in source.split_inclusive('\n') {
            let trimmed = line.trim_start();
            let indent = line.len() - trimmed.len();
            for keyword in ACCESSIBILITIES {
                let follows = trimmed.as_bytes().get(keyword.len());
                if trimmed.starts_with(keyword) && follows == Some(&b' ') {
                    if surfaces.iter().any(|surface| surface == keyword) {
                        let start = (offset + indent) as u32;
                        let span = Span::new(start, start + keyword.len() as u32);
                        diagnostics.push(
                            Diagnostic::new(SURFACE_RULE_ID, span, Severity::Warning)
                                .with_arguments([keyword]),
                        );
                    }
                    break;
                }
            }
            offset += line.len();
        }
        Ok(diagnostics)
    }
}

/// Checks that an annotated constructor's parameter matches the declared
/// property name, reporting (type, parameter, property) when it does not
///
/// Deliberately naive string scanning - just enough engine to exercise
/// the harness end to end. The attached fix renames the parameter to the
/// camel-cased property name.
pub struct CtorParamAnalyzer;

impl Analyzer for CtorParamAnalyzer {
    fn analyze(
        &self,
        source: &str,
        _dialect: Dialect,
        _overlay: &OptionsOverlay,
    ) -> Result<Vec<Diagnostic>, EngineError> {
        Ok(check_ctor(source).into_iter().collect())
    }
}

fn check_ctor(source: &str) -> Option<Diagnostic> {
    let class_at = source.find("class ")?;
    let class_name = identifier_at(source, class_at + "class ".len())?;

    let marker_at = source.find("[JsonConstructor]")?;
    let ctor_open = format!("{class_name}(");
    let open = marker_at + source[marker_at..].find(&ctor_open)? + ctor_open.len() - 1;
    let close = open + source[open..].find(')')?;
    let parameters = &source[open + 1..close];
    let parameter = parameters.split_whitespace().last()?;
    let parameter_at = open + 1 + parameters.rfind(parameter)?;

    let property = property_name(source)?;
    let expected = lower_first(property);
    if parameter == expected {
        return None;
    }

    let span = Span::new(parameter_at as u32, (parameter_at + parameter.len()) as u32);
    Some(
        Diagnostic::new("CA1071", span, Severity::Warning)
            .with_arguments([class_name, parameter, property])
            .with_fix(Fix::new(
                format!("rename to '{expected}'"),
                [Edit::new(span.start, span.end, expected)],
            )),
    )
}

fn identifier_at(source: &str, at: usize) -> Option<&str> {
    let rest = &source[at..];
    let end = rest
        .find(|c: char| !c.is_alphanumeric() && c != '_')
        .unwrap_or(rest.len());
    (end > 0).then(|| &rest[..end])
}

fn property_name(source: &str) -> Option<&str> {
    let accessor_at = source.find("{ get")?;
    let head = source[..accessor_at].trim_end();
    head.rsplit(char::is_whitespace).next()
}

fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Assert a fixture produces exactly the expected diagnostics
pub fn assert_analysis(
    analyzer: &dyn Analyzer,
    fixture: &str,
    expectations: &[DiagnosticExpectation],
) {
    let registry = test_registry();
    let verifier = Verifier::new(&registry, analyzer);
    if let Err(err) = verifier.run_analysis_only(fixture, Dialect::CSharp, expectations) {
        panic!("analysis verification failed: {err}");
    }
}

/// Assert a fixture's attached fixes converge to the expected text
pub fn assert_fix(
    analyzer: &dyn Analyzer,
    fixture: &str,
    expectations: &[DiagnosticExpectation],
    fixed: &str,
    max_iterations: u32,
) {
    let registry = test_registry();
    let verifier = Verifier::new(&registry, analyzer).with_fixer(&EditFixer);
    if let Err(err) =
        verifier.run_code_fix(fixture, Dialect::CSharp, expectations, fixed, max_iterations)
    {
        panic!("code fix verification failed: {err}");
    }
}
