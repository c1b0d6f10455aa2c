//! Configuration overlays for analyzer runs
//!
//! An overlay simulates project-level settings: line-oriented `key = value`
//! text applied to a single run. Keys follow the `dotnet_code_quality`
//! convention, and a rule-scoped key (`dotnet_code_quality.<RULEID>.opt`)
//! always overrides the global form (`dotnet_code_quality.opt`) for that
//! rule, regardless of declaration order.

use rustc_hash::FxHashMap;
use thiserror::Error;

/// Key prefix shared by all analyzer options
pub const OPTION_PREFIX: &str = "dotnet_code_quality";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("line {line}: expected `key = value`, found {text:?}")]
    Malformed { line: usize, text: String },
}

/// An ordered key/value option mapping scoped to one verification run
///
/// Overlays have value semantics: [`OptionsOverlay::with_option`] returns
/// a new overlay and never mutates the receiver. Later assignments to the
/// same key replace earlier ones, as in a settings file read top to
/// bottom.
#[derive(Debug, Clone, Default)]
pub struct OptionsOverlay {
    values: FxHashMap<String, String>,
    keys: Vec<String>,
}

impl OptionsOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse overlay text
    ///
    /// One `key = value` pair per line; blank lines and `#`/`;` comments
    /// (full-line or trailing) are ignored. A non-blank line without `=`
    /// is a hard error.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut overlay = Self::new();
        for (number, raw_line) in text.lines().enumerate() {
            let line = strip_comment(raw_line).trim();
            if line.is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::Malformed {
                    line: number + 1,
                    text: raw_line.trim().to_string(),
                });
            };
            overlay.insert(key.trim(), value.trim());
        }
        Ok(overlay)
    }

    /// Return a copy of this overlay with one additional option set
    pub fn with_option(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.insert(&key.into(), &value.into());
        next
    }

    fn insert(&mut self, key: &str, value: &str) {
        if !self.values.contains_key(key) {
            self.keys.push(key.to_string());
        }
        self.values.insert(key.to_string(), value.to_string());
    }

    /// Raw lookup by full key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Resolve an option for a rule
    ///
    /// Consults `dotnet_code_quality.<rule_id>.<option>` first and falls
    /// back to `dotnet_code_quality.<option>`. Returns `None` when neither
    /// is set; the caller supplies the rule-defined default.
    pub fn lookup(&self, rule_id: &str, option: &str) -> Option<&str> {
        self.get(&format!("{OPTION_PREFIX}.{rule_id}.{option}"))
            .or_else(|| self.get(&format!("{OPTION_PREFIX}.{option}")))
    }

    /// Resolve a boolean option, with a rule-defined default
    pub fn bool_option(&self, rule_id: &str, option: &str, default: bool) -> bool {
        match self.lookup(rule_id, option) {
            Some(value) => value.eq_ignore_ascii_case("true"),
            None => default,
        }
    }

    /// Resolve a comma-separated list option
    pub fn list_option(&self, rule_id: &str, option: &str) -> Option<Vec<String>> {
        self.lookup(rule_id, option).map(|value| {
            value
                .split(',')
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect()
        })
    }

    /// Keys in first-assignment order, paired with their current values
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.keys
            .iter()
            .map(|key| (key.as_str(), self.values[key].as_str()))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find(['#', ';']) {
        Some(pos) => &line[..pos],
        None => line,
    }
}
