use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LoadError;

const PLACEHOLDERS: &[&str] = &[
    "value",
    "previous",
    "sensor_id",
    "trigger",
    "actuator_id",
    "validator_id",
];

/// A text template with `{placeholder}` substitution.
///
/// Only the names in `PLACEHOLDERS` are accepted; `validate` rejects the rest
/// at load time so rendering never fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Template(String);

/// Values substituted into a template.
#[derive(Debug, Clone, Default)]
pub struct TemplateVars {
    pub value: String,
    pub previous: Option<String>,
    pub sensor_id: String,
    pub trigger: String,
    pub actuator_id: Option<String>,
    pub validator_id: Option<String>,
}

impl TemplateVars {
    fn lookup(&self, name: &str) -> &str {
        match name {
            "value" => &self.value,
            "previous" => self.previous.as_deref().unwrap_or("none"),
            "sensor_id" => &self.sensor_id,
            "trigger" => &self.trigger,
            "actuator_id" => self.actuator_id.as_deref().unwrap_or(""),
            "validator_id" => self.validator_id.as_deref().unwrap_or(""),
            _ => "",
        }
    }
}

impl Template {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn validate(&self) -> Result<(), LoadError> {
        for name in placeholders(&self.0) {
            if !PLACEHOLDERS.contains(&name) {
                return Err(LoadError::Template {
                    template: self.0.clone(),
                    placeholder: name.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn render(&self, vars: &TemplateVars) -> String {
        let mut out = String::with_capacity(self.0.len());
        let mut rest = self.0.as_str();
        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            match after.find('}') {
                Some(end) if is_name(&after[..end]) => {
                    out.push_str(vars.lookup(&after[..end]));
                    rest = &after[end + 1..];
                }
                _ => {
                    out.push('{');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Template {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

fn is_name(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn placeholders(text: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) if is_name(&after[..end]) => {
                names.push(&after[..end]);
                rest = &after[end + 1..];
            }
            _ => rest = after,
        }
    }
    names
}
