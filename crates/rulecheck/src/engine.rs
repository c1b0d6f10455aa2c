//! Engine traits - the seam between the harness and the analysis engine
//!
//! The harness never inspects the analyzed language itself. Everything it
//! knows about a fixture's semantics arrives through these two traits.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use rulecheck_config::OptionsOverlay;
use rulecheck_diagnostics::Diagnostic;

/// Language dialect a fixture is written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    CSharp,
    VisualBasic,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::CSharp => "csharp",
            Dialect::VisualBasic => "visualbasic",
        }
    }

    /// Conventional source file extension for the dialect
    pub fn file_extension(&self) -> &'static str {
        match self {
            Dialect::CSharp => "cs",
            Dialect::VisualBasic => "vb",
        }
    }
}

impl std::str::FromStr for Dialect {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "csharp" | "cs" => Ok(Dialect::CSharp),
            "visualbasic" | "vb" => Ok(Dialect::VisualBasic),
            other => Err(format!("unknown dialect '{other}'")),
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by an engine through its `Result` channel
///
/// Engine panics are contained separately by the harness; both surface as
/// an analyzer crash, never as an empty diagnostic set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("analysis failed: {0}")]
    Analysis(String),
    #[error("fix application failed: {0}")]
    Fix(String),
}

/// An analysis engine: consumes source text, produces diagnostics
pub trait Analyzer: Send + Sync {
    /// Analyze markup-free source text under a configuration overlay
    fn analyze(
        &self,
        source: &str,
        dialect: Dialect,
        overlay: &OptionsOverlay,
    ) -> Result<Vec<Diagnostic>, EngineError>;

    /// Whether the engine understands a dialect
    ///
    /// The harness checks this before handing a fixture over; a fixture in
    /// an unsupported dialect fails without the engine being invoked.
    fn supports(&self, _dialect: Dialect) -> bool {
        true
    }
}

/// A fix engine: consumes source text plus one diagnostic, produces
/// rewritten text
///
/// Implementations must be deterministic for a given (source, diagnostic)
/// pair and must return the input unchanged when no applicable fix exists.
pub trait Fixer: Send + Sync {
    fn apply_fix(&self, source: &str, diagnostic: &Diagnostic) -> Result<String, EngineError>;
}
