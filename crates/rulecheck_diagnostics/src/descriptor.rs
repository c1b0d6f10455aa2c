use crate::Severity;

/// Immutable metadata for a single rule
///
/// Descriptors are defined once per rule as statics and shared by every
/// fixture exercising that rule. The message template uses positional
/// `{0}`-style placeholders; the declared placeholder arity is what
/// expectation argument lists are validated against.
#[derive(Debug)]
pub struct RuleDescriptor {
    /// Rule identifier (e.g. "CA1071")
    pub id: &'static str,
    /// Short kebab-case name (e.g. "parameter-name-mismatch")
    pub name: &'static str,
    /// Description of what the rule checks
    pub description: &'static str,
    /// Severity applied when no configuration overrides it
    pub default_severity: Severity,
    /// Message template with positional placeholders
    pub message_template: &'static str,
    /// Option names the rule understands in a configuration overlay
    pub options: &'static [&'static str],
}

impl RuleDescriptor {
    pub const fn new(
        id: &'static str,
        name: &'static str,
        description: &'static str,
        default_severity: Severity,
        message_template: &'static str,
    ) -> Self {
        Self {
            id,
            name,
            description,
            default_severity,
            message_template,
            options: &[],
        }
    }

    pub const fn with_options(mut self, options: &'static [&'static str]) -> Self {
        self.options = options;
        self
    }

    /// Number of arguments the message template requires
    ///
    /// Derived as highest placeholder index plus one, so `"{0} and {2}"`
    /// requires three arguments.
    pub fn placeholder_count(&self) -> usize {
        let mut count = 0;
        for (index, _) in each_placeholder(self.message_template) {
            count = count.max(index + 1);
        }
        count
    }

    /// Instantiate the message template with concrete arguments
    ///
    /// Placeholders referencing a missing argument render as-is; callers
    /// validate arity through the registry before rendering.
    pub fn render_message(&self, arguments: &[String]) -> String {
        let template = self.message_template;
        let mut message = String::with_capacity(template.len());
        let mut pos = 0;
        for (index, range) in each_placeholder(template) {
            message.push_str(&template[pos..range.0]);
            match arguments.get(index) {
                Some(argument) => message.push_str(argument),
                None => message.push_str(&template[range.0..range.1]),
            }
            pos = range.1;
        }
        message.push_str(&template[pos..]);
        message
    }
}

/// Iterate `{N}` placeholders as (index, (start, end)) pairs
fn each_placeholder(template: &str) -> impl Iterator<Item = (usize, (usize, usize))> + '_ {
    let bytes = template.as_bytes();
    let mut pos = 0;
    std::iter::from_fn(move || {
        while pos < bytes.len() {
            if bytes[pos] == b'{' {
                let digits_start = pos + 1;
                let mut cursor = digits_start;
                while cursor < bytes.len() && bytes[cursor].is_ascii_digit() {
                    cursor += 1;
                }
                if cursor > digits_start && bytes.get(cursor) == Some(&b'}') {
                    let index: usize = template[digits_start..cursor].parse().ok()?;
                    let range = (pos, cursor + 1);
                    pos = cursor + 1;
                    return Some((index, range));
                }
            }
            pos += 1;
        }
        None
    })
}
