use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::RuleDescriptor;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error("rule '{rule_id}' registered more than once")]
    DuplicateRule { rule_id: String },
    #[error("rule '{rule_id}' is not registered")]
    UnknownRule { rule_id: String },
    #[error(
        "rule '{rule_id}' declares {expected} message argument(s), got {actual}: {arguments:?}"
    )]
    ArityMismatch {
        rule_id: String,
        expected: usize,
        actual: usize,
        arguments: Vec<String>,
    },
}

/// Immutable table of rule descriptors
///
/// Built once at startup from static descriptors and passed by reference
/// into every harness invocation. Read-only after construction, so it is
/// freely shared across threads without locking.
#[derive(Debug)]
pub struct RuleRegistry {
    rules: FxHashMap<&'static str, &'static RuleDescriptor>,
}

impl RuleRegistry {
    pub fn new(
        descriptors: &[&'static RuleDescriptor],
    ) -> Result<Self, DescriptorError> {
        let mut rules = FxHashMap::default();
        for descriptor in descriptors {
            if rules.insert(descriptor.id, *descriptor).is_some() {
                return Err(DescriptorError::DuplicateRule {
                    rule_id: descriptor.id.to_string(),
                });
            }
        }
        Ok(Self { rules })
    }

    pub fn get(&self, rule_id: &str) -> Option<&'static RuleDescriptor> {
        self.rules.get(rule_id).copied()
    }

    pub fn contains(&self, rule_id: &str) -> bool {
        self.rules.contains_key(rule_id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static RuleDescriptor> + '_ {
        self.rules.values().copied()
    }

    /// Check an argument list against the rule's declared placeholder arity
    pub fn validate_arguments(
        &self,
        rule_id: &str,
        arguments: &[String],
    ) -> Result<(), DescriptorError> {
        self.validated(rule_id, arguments).map(|_| ())
    }

    /// Render a rule's message template with concrete arguments
    pub fn render_message(
        &self,
        rule_id: &str,
        arguments: &[String],
    ) -> Result<String, DescriptorError> {
        Ok(self.validated(rule_id, arguments)?.render_message(arguments))
    }

    fn validated(
        &self,
        rule_id: &str,
        arguments: &[String],
    ) -> Result<&'static RuleDescriptor, DescriptorError> {
        let descriptor = self.get(rule_id).ok_or_else(|| DescriptorError::UnknownRule {
            rule_id: rule_id.to_string(),
        })?;
        let expected = descriptor.placeholder_count();
        if arguments.len() != expected {
            return Err(DescriptorError::ArityMismatch {
                rule_id: rule_id.to_string(),
                expected,
                actual: arguments.len(),
                arguments: arguments.to_vec(),
            });
        }
        Ok(descriptor)
    }
}
