//! Strict `{placeholder}` rendering.
//!
//! A placeholder is `{` followed by letters, digits, `_` or `.` and a closing
//! `}`. Every placeholder must have a value: a missing one is an error, never
//! a literal `{name}` in a message sent to a user. Braces that do not form a
//! placeholder are copied through.

use std::collections::BTreeMap;

use funnelbot_types::credentials::Credentials;
use funnelbot_types::error::ComposeError;

/// Values available to a template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateVars {
    values: BTreeMap<String, String>,
}

impl TemplateVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Expose credentials as `credential.username`, `credential.password`
    /// and `credential.url`.
    pub fn set_credentials(&mut self, credentials: &Credentials) -> &mut Self {
        self.set("credential.username", credentials.username.clone());
        self.set("credential.password", credentials.password.clone());
        self.set("credential.url", credentials.url.clone());
        self
    }

    /// Copy every value from `other`, overwriting on conflict.
    pub fn extend(&mut self, other: &TemplateVars) {
        for (k, v) in &other.values {
            self.values.insert(k.clone(), v.clone());
        }
    }
}

fn is_placeholder_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

/// Names of all placeholders in a template, in order of appearance.
pub fn placeholders(template: &str) -> Vec<&str> {
    let mut found = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let ident_len = after
            .char_indices()
            .find(|(_, c)| !is_placeholder_char(*c))
            .map_or(after.len(), |(i, _)| i);
        if ident_len > 0 && after[ident_len..].starts_with('}') {
            found.push(&after[..ident_len]);
            rest = &after[ident_len + 1..];
        } else {
            rest = after;
        }
    }
    found
}

/// Render `template`, replacing every placeholder with its value.
///
/// `template_id` only labels errors.
pub fn render(template_id: &str, template: &str, vars: &TemplateVars) -> Result<String, ComposeError> {
    let mut out = String::with_capacity(template.len() + 64);
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let ident_len = after
            .char_indices()
            .find(|(_, c)| !is_placeholder_char(*c))
            .map_or(after.len(), |(i, _)| i);

        if ident_len > 0 && after[ident_len..].starts_with('}') {
            let name = &after[..ident_len];
            let value = vars
                .get(name)
                .ok_or_else(|| ComposeError::UnresolvedPlaceholder {
                    template: template_id.to_string(),
                    placeholder: name.to_string(),
                })?;
            out.push_str(value);
            rest = &after[ident_len + 1..];
        } else {
            out.push('{');
            rest = after;
        }
    }
    out.push_str(rest);

    Ok(out)
}
