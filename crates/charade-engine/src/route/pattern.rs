//! Path template compilation.
//!
//! A template such as `/v1/users/{id}/profile` compiles to an anchored regex
//! with one named capture group per `{name}` placeholder. The character class
//! of a group depends on the placeholder name: `id` expects a UUID-shaped
//! token, `resource` and `operation` expect an alphanumeric slug, anything
//! else matches a run of non-`/` characters.

use crate::error::EngineError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{(\w+)\}").expect("static regex"));

/// A compiled path template.
///
/// Compilation is deterministic: the same template always yields a matcher
/// with identical behavior. The original template, the ordered placeholder
/// names and the derived base path are kept alongside the regex.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    template: String,
    regex: Regex,
    params: Vec<String>,
    base_path: String,
}

impl RoutePattern {
    /// Compile a path template into a matcher.
    pub fn compile(template: &str) -> Result<Self, EngineError> {
        let mut pattern = String::from("^");
        let mut params = Vec::new();
        let mut last = 0;

        for caps in PLACEHOLDER.captures_iter(template) {
            let whole = caps.get(0).expect("capture 0 always present");
            let name = &caps[1];

            pattern.push_str(&regex::escape(&template[last..whole.start()]));

            let class = match name {
                "id" => r"[0-9a-f\-]{36}",
                "resource" | "operation" => "[a-zA-Z0-9_-]+",
                _ => "[^/]+",
            };
            pattern.push_str(&format!("(?P<{name}>{class})"));

            params.push(name.to_string());
            last = whole.end();
        }
        pattern.push_str(&regex::escape(&template[last..]));
        pattern.push('$');

        let regex = Regex::new(&pattern).map_err(|source| EngineError::Pattern {
            pattern: template.to_string(),
            source,
        })?;

        Ok(Self {
            template: template.to_string(),
            regex,
            params,
            base_path: derive_base_path(template),
        })
    }

    /// Whether a concrete path matches this template.
    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Extract the named parameters from a matching path. Returns `None` if
    /// the path does not match.
    pub fn extract(&self, path: &str) -> Option<HashMap<String, String>> {
        let caps = self.regex.captures(path)?;
        Some(
            self.params
                .iter()
                .filter_map(|name| {
                    caps.name(name)
                        .map(|m| (name.clone(), m.as_str().to_string()))
                })
                .collect(),
        )
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Ordered placeholder names, as they appear in the template.
    pub fn param_names(&self) -> &[String] {
        &self.params
    }

    /// The template prefix preceding the first placeholder. Templates without
    /// placeholders are their own base path.
    pub fn base_path(&self) -> &str {
        &self.base_path
    }
}

/// For `/v1/users/{id}` returns `/v1/users`; for `/users` returns `/users`.
fn derive_base_path(template: &str) -> String {
    static TAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\{[^}]+\}.*$").expect("static regex"));
    TAIL.replace(template, "").to_string()
}
