//! Edit application
//!
//! Edits are applied back-to-front after sorting by start offset
//! descending; an edit overlapping one already applied is skipped rather
//! than corrupting offsets.

use rulecheck_diagnostics::{Diagnostic, Edit};

use crate::engine::{EngineError, Fixer};

/// Apply a batch of edits to source text
pub fn apply_edits(source: &str, edits: &[Edit]) -> String {
    let mut edits: Vec<&Edit> = edits.iter().collect();
    edits.sort_by(|a, b| b.start.cmp(&a.start));

    let mut content = source.to_string();
    let mut last_start = content.len();
    for edit in edits {
        let start = edit.start as usize;
        let end = edit.end as usize;
        if start <= end && end <= last_start {
            content.replace_range(start..end, &edit.replacement);
            last_start = start;
        }
    }
    content
}

/// A fixer that applies the fix attached to the diagnostic itself
///
/// The usual companion of engines that emit edit-carrying diagnostics. A
/// diagnostic without an attached fix is left alone: the input text is
/// returned unchanged, which the verifier's fix loop treats as a fixed
/// point.
pub struct EditFixer;

impl Fixer for EditFixer {
    fn apply_fix(&self, source: &str, diagnostic: &Diagnostic) -> Result<String, EngineError> {
        match &diagnostic.fix {
            Some(fix) => Ok(apply_edits(source, &fix.edits)),
            None => Ok(source.to_string()),
        }
    }
}
