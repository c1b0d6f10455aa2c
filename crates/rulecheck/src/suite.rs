//! Corpus suite runner
//!
//! A corpus is a directory of verification cases. Each case is a TOML
//! manifest (`<name>.case.toml`) naming a source fixture, its dialect,
//! the expected diagnostics, and optionally an expected fixed file, an
//! inline configuration overlay, and a fix iteration budget.
//!
//! Discovery runs on its own thread feeding manifest paths through a
//! channel; verification fans out across a thread pool. Every case runs
//! against its own private fixture and overlay, so the only shared state
//! is the immutable registry and the internally synchronized analysis
//! cache.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crossbeam_channel::{unbounded, Sender};
use dashmap::DashSet;
use memmap2::Mmap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use rulecheck_config::OptionsOverlay;
use rulecheck_diagnostics::RuleRegistry;

use crate::cache::AnalysisCache;
use crate::engine::{Analyzer, Dialect, Fixer};
use crate::expect::DiagnosticExpectation;
use crate::verify::Verifier;

const MANIFEST_SUFFIX: &str = ".case.toml";

#[derive(Debug, Error)]
pub enum SuiteError {
    #[error("corpus directory {0:?} does not exist")]
    MissingCorpus(PathBuf),
}

/// Manifest schema for one case
#[derive(Debug, Deserialize)]
struct CaseManifest {
    /// Source fixture path, relative to the manifest
    source: PathBuf,
    dialect: String,
    /// Expected fixed file; presence turns the case into a code-fix run
    #[serde(default)]
    fixed: Option<PathBuf>,
    /// Inline configuration overlay text
    #[serde(default)]
    options: Option<String>,
    #[serde(default = "default_iterations")]
    max_iterations: u32,
    #[serde(default)]
    expect: Vec<ManifestExpectation>,
}

fn default_iterations() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
struct ManifestExpectation {
    rule: String,
    /// Markup key anchor; mutually exclusive with explicit coordinates
    #[serde(default)]
    key: Option<u32>,
    #[serde(default)]
    line: Option<u32>,
    #[serde(default)]
    column: Option<u32>,
    #[serde(default)]
    end_line: Option<u32>,
    #[serde(default)]
    end_column: Option<u32>,
    #[serde(default)]
    args: Vec<String>,
}

impl ManifestExpectation {
    fn into_expectation(self) -> Result<DiagnosticExpectation, String> {
        let expectation = DiagnosticExpectation::new(&self.rule).with_arguments(self.args.clone());
        if let Some(key) = self.key {
            return Ok(expectation.at_key(key));
        }
        match (self.line, self.column, self.end_column) {
            (Some(line), Some(column), Some(end_column)) => Ok(expectation.spanning(
                line,
                column,
                self.end_line.unwrap_or(line),
                end_column,
            )),
            _ => Err(format!(
                "expectation for rule '{}' needs either `key` or `line`/`column`/`end_column`",
                self.rule
            )),
        }
    }
}

/// Result of one case
#[derive(Debug, Clone, Serialize)]
pub struct CaseOutcome {
    pub name: String,
    pub manifest: PathBuf,
    /// Rendered failure, `None` when the case passed
    pub failure: Option<String>,
}

impl CaseOutcome {
    pub fn passed(&self) -> bool {
        self.failure.is_none()
    }
}

/// Aggregated result of a suite run
#[derive(Debug, Serialize)]
pub struct SuiteReport {
    pub outcomes: Vec<CaseOutcome>,
}

impl SuiteReport {
    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.passed()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &CaseOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.passed())
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Runs every case under a corpus directory against one analyzer/fixer
/// pair
pub struct Suite<'a> {
    registry: &'a RuleRegistry,
    analyzer: &'a dyn Analyzer,
    fixer: Option<&'a dyn Fixer>,
    cache: AnalysisCache,
}

impl<'a> Suite<'a> {
    pub fn new(registry: &'a RuleRegistry, analyzer: &'a dyn Analyzer) -> Self {
        Self {
            registry,
            analyzer,
            fixer: None,
            cache: AnalysisCache::new(),
        }
    }

    pub fn with_fixer(mut self, fixer: &'a dyn Fixer) -> Self {
        self.fixer = Some(fixer);
        self
    }

    /// Discover and verify every case under `corpus`
    pub fn run(&self, corpus: &Path) -> Result<SuiteReport, SuiteError> {
        if !corpus.is_dir() {
            return Err(SuiteError::MissingCorpus(corpus.to_path_buf()));
        }

        let (tx, rx) = unbounded::<PathBuf>();
        let seen = Arc::new(DashSet::new());
        let root = corpus.to_path_buf();
        let discovery_seen = seen.clone();
        let discovery = std::thread::spawn(move || {
            discover(&tx, &discovery_seen, &root, true);
        });
        let _ = discovery.join();

        let mut manifests: Vec<PathBuf> = rx.into_iter().collect();
        manifests.sort();
        debug!(cases = manifests.len(), corpus = %corpus.display(), "running suite");

        let mut outcomes: Vec<CaseOutcome> = manifests
            .par_iter()
            .map(|manifest| self.run_case(manifest))
            .collect();
        outcomes.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(SuiteReport { outcomes })
    }

    fn run_case(&self, manifest_path: &Path) -> CaseOutcome {
        let name = case_name(manifest_path);
        let failure = self.verify_case(manifest_path).err();
        if let Some(detail) = &failure {
            debug!(case = %name, detail = %detail, "case failed");
        }
        CaseOutcome {
            name,
            manifest: manifest_path.to_path_buf(),
            failure,
        }
    }

    fn verify_case(&self, manifest_path: &Path) -> Result<(), String> {
        let manifest_text = read_file_fast(manifest_path)
            .map_err(|err| format!("cannot read manifest: {err}"))?;
        let manifest: CaseManifest =
            toml::from_str(&manifest_text).map_err(|err| format!("invalid manifest: {err}"))?;

        let dialect: Dialect = manifest.dialect.parse()?;
        let dir = manifest_path.parent().unwrap_or_else(|| Path::new("."));
        let source = read_file_fast(&dir.join(&manifest.source))
            .map_err(|err| format!("cannot read fixture {:?}: {err}", manifest.source))?;

        let overlay = match &manifest.options {
            Some(text) => OptionsOverlay::parse(text).map_err(|err| err.to_string())?,
            None => OptionsOverlay::new(),
        };
        let expectations = manifest
            .expect
            .into_iter()
            .map(ManifestExpectation::into_expectation)
            .collect::<Result<Vec<_>, String>>()?;

        let mut verifier = Verifier::new(self.registry, self.analyzer)
            .with_overlay(overlay)
            .with_cache(&self.cache);
        if let Some(fixer) = self.fixer {
            verifier = verifier.with_fixer(fixer);
        }

        match &manifest.fixed {
            Some(fixed_path) => {
                let fixed = read_file_fast(&dir.join(fixed_path))
                    .map_err(|err| format!("cannot read fixed file {fixed_path:?}: {err}"))?;
                verifier
                    .run_code_fix(&source, dialect, &expectations, &fixed, manifest.max_iterations)
                    .map_err(|err| err.to_string())
            }
            None => verifier
                .run_analysis_only(&source, dialect, &expectations)
                .map_err(|err| err.to_string()),
        }
    }
}

/// Recursive corpus walk, emitting case manifests into the pipeline
///
/// Hidden directories and build output are skipped; the seen-set keeps
/// re-entered directories from producing duplicate cases.
fn discover(tx: &Sender<PathBuf>, seen: &DashSet<PathBuf>, dir: &Path, is_root: bool) {
    if !is_root {
        if let Some(name) = dir.file_name().and_then(|name| name.to_str()) {
            if name.starts_with('.') || name == "target" {
                return;
            }
        }
    }

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(dir = %dir.display(), %err, "cannot read corpus directory");
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            discover(tx, seen, &path, false);
        } else if is_case_manifest(&path) && seen.insert(path.clone()) {
            let _ = tx.send(path);
        }
    }
}

fn is_case_manifest(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(MANIFEST_SUFFIX))
}

fn case_name(manifest_path: &Path) -> String {
    let file_name = manifest_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("<unnamed>");
    file_name
        .strip_suffix(MANIFEST_SUFFIX)
        .unwrap_or(file_name)
        .to_string()
}

/// Read a corpus file, memory-mapping anything above 4KiB
fn read_file_fast(path: &Path) -> std::io::Result<String> {
    let file = File::open(path)?;
    let len = file.metadata()?.len() as usize;

    // For small files a regular read beats the fixed mmap overhead
    if len < 4096 {
        return std::fs::read_to_string(path);
    }

    // SAFETY: the mapping is read-only and copied to an owned String
    // before the file handle is dropped
    let mmap = unsafe { Mmap::map(&file)? };
    std::str::from_utf8(&mmap)
        .map(str::to_string)
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{test_registry, PatternAnalyzer, PatternRule};
    use crate::EditFixer;
    use rulecheck_diagnostics::Severity;
    use std::fs;

    fn banned_todo_analyzer() -> PatternAnalyzer {
        PatternAnalyzer::new(vec![PatternRule {
            rule_id: "RC0001",
            pattern: "TODO",
            replacement: Some("DONE"),
            severity: Severity::Warning,
        }])
    }

    fn write(path: &Path, content: &str) {
        fs::write(path, content).unwrap();
    }

    #[test]
    fn runs_every_discovered_case() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        // Passing analysis case, in a nested directory
        fs::create_dir(root.join("nested")).unwrap();
        write(
            &root.join("nested/flagged.cs"),
            "class A { } // {|#0:TODO|}\n",
        );
        write(
            &root.join("nested/flagged.case.toml"),
            r#"
source = "flagged.cs"
dialect = "csharp"

[[expect]]
rule = "RC0001"
key = 0
args = ["TODO"]
"#,
        );

        // Passing code-fix case
        write(&root.join("fixable.cs"), "// {|#0:TODO|}\n");
        write(&root.join("fixable.fixed.cs"), "// DONE\n");
        write(
            &root.join("fixable.case.toml"),
            r#"
source = "fixable.cs"
dialect = "csharp"
fixed = "fixable.fixed.cs"

[[expect]]
rule = "RC0001"
key = 0
args = ["TODO"]
"#,
        );

        // Failing case: expects nothing but the rule fires
        write(&root.join("broken.cs"), "// TODO\n");
        write(
            &root.join("broken.case.toml"),
            "source = \"broken.cs\"\ndialect = \"csharp\"\n",
        );

        // Hidden directories are not walked
        fs::create_dir(root.join(".skip")).unwrap();
        write(
            &root.join(".skip/ghost.case.toml"),
            "source = \"missing.cs\"\ndialect = \"csharp\"\n",
        );

        let registry = test_registry();
        let analyzer = banned_todo_analyzer();
        let suite = Suite::new(&registry, &analyzer).with_fixer(&EditFixer);
        let report = suite.run(root).unwrap();

        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.passed(), 2);
        assert_eq!(report.failed(), 1);
        assert!(!report.is_success());

        let names: Vec<&str> = report.outcomes.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["broken", "fixable", "flagged"]);

        let failure = report.failures().next().unwrap();
        assert_eq!(failure.name, "broken");
        assert!(failure.failure.as_deref().unwrap().contains("unexpected"));
    }

    #[test]
    fn manifest_errors_fail_only_their_case() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        write(&root.join("bad.case.toml"), "this is not toml = = =\n");

        write(&root.join("good.cs"), "class A { }\n");
        write(
            &root.join("good.case.toml"),
            "source = \"good.cs\"\ndialect = \"csharp\"\n",
        );

        let registry = test_registry();
        let analyzer = banned_todo_analyzer();
        let suite = Suite::new(&registry, &analyzer);
        let report = suite.run(root).unwrap();

        assert_eq!(report.passed(), 1);
        assert_eq!(report.failed(), 1);
    }

    #[test]
    fn expectation_without_anchor_is_a_case_error() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        write(&root.join("anchorless.cs"), "class A { }\n");
        write(
            &root.join("anchorless.case.toml"),
            r#"
source = "anchorless.cs"
dialect = "csharp"

[[expect]]
rule = "RC0001"
args = ["TODO"]
"#,
        );

        let registry = test_registry();
        let analyzer = banned_todo_analyzer();
        let report = Suite::new(&registry, &analyzer).run(root).unwrap();
        let failure = report.failures().next().unwrap();
        assert!(failure.failure.as_deref().unwrap().contains("needs either"));
    }

    #[test]
    fn missing_corpus_is_a_suite_error() {
        let registry = test_registry();
        let analyzer = banned_todo_analyzer();
        let suite = Suite::new(&registry, &analyzer);
        assert!(matches!(
            suite.run(Path::new("/nonexistent/corpus")),
            Err(SuiteError::MissingCorpus(_))
        ));
    }

    #[test]
    fn report_serializes_to_json() {
        let report = SuiteReport {
            outcomes: vec![CaseOutcome {
                name: "sample".to_string(),
                manifest: PathBuf::from("sample.case.toml"),
                failure: None,
            }],
        };
        let json = report.to_json();
        assert!(json.contains("\"sample\""));
    }
}
