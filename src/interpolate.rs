use crate::types::value_to_string;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;
use std::{
    collections::{BTreeMap, HashMap},
    env,
};

pub const ENV_SAFETY_PREFIX: &str = "reqchain_";

static ENV_PATTERN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<env\.([a-zA-Z_]+)>").unwrap());
static TEMPLATE_VAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{([a-zA-Z0-9_]+)\}").unwrap());

/// Resolves `<env.NAME>` patterns. Only names carrying the safety prefix are
/// ever looked up; the process environment wins over the fallback table.
#[derive(Debug, Clone)]
pub struct EnvResolver {
    prefix: String,
    fallback: HashMap<String, String>,
    use_process_env: bool,
}

impl Default for EnvResolver {
    fn default() -> Self {
        Self::new(HashMap::new())
    }
}

impl EnvResolver {
    pub fn new(fallback: HashMap<String, String>) -> Self {
        Self {
            prefix: ENV_SAFETY_PREFIX.to_string(),
            fallback,
            use_process_env: true,
        }
    }

    /// Resolve from the fallback table alone.
    #[cfg(test)]
    pub fn without_process_env(mut self) -> Self {
        self.use_process_env = false;
        self
    }

    fn lookup(&self, name: &str) -> Option<String> {
        if !name.starts_with(&self.prefix) {
            return None;
        }
        let from_env = if self.use_process_env {
            env::var(name).ok().filter(|v| !v.trim().is_empty())
        } else {
            None
        };
        from_env.or_else(|| {
            self.fallback
                .get(name)
                .filter(|v| !v.trim().is_empty())
                .cloned()
        })
    }

    pub fn replace_str(&self, s: &str) -> String {
        ENV_PATTERN_RE
            .replace_all(s, |caps: &Captures| match self.lookup(&caps[1]) {
                Some(v) => v,
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    /// Rewrites every string in `value`, descending through objects and arrays.
    pub fn replace_in_value(&self, value: &mut Value) {
        match value {
            Value::String(s) => {
                if ENV_PATTERN_RE.is_match(s) {
                    *s = self.replace_str(s);
                }
            }
            Value::Object(obj) => obj.values_mut().for_each(|v| self.replace_in_value(v)),
            Value::Array(arr) => arr.iter_mut().for_each(|v| self.replace_in_value(v)),
            _ => {}
        }
    }
}

/// Renders the final output: `${key}` templating when a template is set,
/// the preserved items as json otherwise.
pub fn render_output(template: &str, preserved: &BTreeMap<String, String>) -> String {
    if template.trim().is_empty() {
        return serde_json::to_string(preserved).unwrap_or_else(|_| "{}".to_string());
    }
    TEMPLATE_VAR_RE
        .replace_all(template, |caps: &Captures| match preserved.get(&caps[1]) {
            Some(v) => v.clone(),
            None => value_to_string(&Value::Null),
        })
        .into_owned()
}
