//! Variable substitution for mapping-configuration templates

use std::collections::HashMap;

use regex::Regex;

/// Variable substitution context for configuration templates.
///
/// Placeholders use the `{{ name }}` syntax; whitespace inside the braces
/// is ignored. Referencing a variable that is not in the context is an
/// error, not a silent no-op, so a typoed placeholder cannot leak into
/// the rendered document.
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    vars: HashMap<String, String>,
}

impl TemplateContext {
    /// Create a new empty template context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable.
    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_string(), value.to_string());
        self
    }

    /// Set a variable.
    pub fn set(&mut self, key: &str, value: &str) {
        self.vars.insert(key.to_string(), value.to_string());
    }

    /// Get a variable value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(|value| value.as_str())
    }

    /// Substitute every placeholder in `template`.
    pub fn substitute(&self, template: &str) -> Result<String, String> {
        let placeholder = Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}")
            .expect("placeholder pattern is valid");

        let mut rendered = String::with_capacity(template.len());
        let mut last = 0;
        for captures in placeholder.captures_iter(template) {
            let matched = captures.get(0).expect("whole match always present");
            let name = &captures[1];
            let value = self
                .vars
                .get(name)
                .ok_or_else(|| format!("unknown placeholder '{{{{ {name} }}}}'"))?;
            rendered.push_str(&template[last..matched.start()]);
            rendered.push_str(value);
            last = matched.end();
        }
        rendered.push_str(&template[last..]);
        Ok(rendered)
    }
}
