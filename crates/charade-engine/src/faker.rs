//! Definition-driven fake value generation.
//!
//! A definition is a JSON template describing one item. Each field resolves
//! by type: objects recurse, arrays pick a random element, strings are
//! treated as generator expressions (a bare generator name or a call form
//! like `randomElement([...])`), and everything else passes through
//! verbatim. Custom generators registered by name take precedence over the
//! built-ins.

use fake::faker::address::en::CityName;
use fake::faker::chrono::en::Date;
use fake::faker::internet::en::SafeEmail;
use fake::faker::lorem::en::{Sentence, Word};
use fake::faker::name::en::{FirstName, LastName, Name};
use fake::Fake;
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::{json, Value};
use std::collections::HashMap;
use uuid::Uuid;

type GeneratorFn = Box<dyn Fn() -> Value + Send + Sync>;

/// Expands declarative templates into concrete fake values.
#[derive(Default)]
pub struct DefinitionFaker {
    custom: HashMap<String, GeneratorFn>,
}

impl DefinitionFaker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a custom generator. A template string equal to `name`
    /// resolves by invoking `generator`, shadowing any built-in of the same
    /// name.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        generator: impl Fn() -> Value + Send + Sync + 'static,
    ) {
        self.custom.insert(name.into(), Box::new(generator));
    }

    /// Expand a definition template into concrete values.
    pub fn make(&self, definition: &Value) -> Value {
        match definition {
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), self.resolve(value)))
                    .collect(),
            ),
            other => self.resolve(other),
        }
    }

    fn resolve(&self, value: &Value) -> Value {
        match value {
            Value::Object(_) => self.make(value),
            Value::Array(items) => items
                .choose(&mut rand::thread_rng())
                .cloned()
                .unwrap_or(Value::Null),
            Value::String(expr) => self.resolve_expression(expr),
            other => other.clone(),
        }
    }

    fn resolve_expression(&self, expr: &str) -> Value {
        if let Some(generator) = self.custom.get(expr) {
            return generator();
        }

        if let Some(inner) = call_argument(expr, "randomElement") {
            if let Ok(items) = serde_json::from_str::<Vec<Value>>(inner) {
                return items
                    .choose(&mut rand::thread_rng())
                    .cloned()
                    .unwrap_or(Value::Null);
            }
        }

        if let Some(inner) = call_argument(expr, "numberBetween") {
            let bounds: Vec<i64> = inner
                .split(',')
                .filter_map(|part| part.trim().parse().ok())
                .collect();
            if let [low, high] = bounds[..] {
                if low <= high {
                    return json!(rand::thread_rng().gen_range(low..=high));
                }
            }
        }

        match expr {
            "firstName" => json!(FirstName().fake::<String>()),
            "lastName" => json!(LastName().fake::<String>()),
            "name" => json!(Name().fake::<String>()),
            "email" => json!(SafeEmail().fake::<String>()),
            "city" => json!(CityName().fake::<String>()),
            "word" => json!(Word().fake::<String>()),
            "sentence" => json!(Sentence(3..8).fake::<String>()),
            "date" => json!(Date().fake::<chrono::NaiveDate>().to_string()),
            "uuid" => json!(Uuid::new_v4().to_string()),
            "boolean" => json!(rand::thread_rng().gen_bool(0.5)),
            // Unrecognized expressions pass through verbatim.
            other => json!(other),
        }
    }
}

impl std::fmt::Debug for DefinitionFaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefinitionFaker")
            .field("custom", &self.custom.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// For `name(args)` returns `args`; `None` when `expr` is not that call.
fn call_argument<'a>(expr: &'a str, name: &str) -> Option<&'a str> {
    expr.strip_prefix(name)?
        .strip_prefix('(')?
        .strip_suffix(')')
}
