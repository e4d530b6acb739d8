//! The engine's view of an intercepted HTTP request.
//!
//! The interception layer hands the engine a method, a path, headers and an
//! already-parsed JSON body. Header names are stored lowercased so lookups
//! are case-insensitive.

use serde_json::Value;
use std::collections::HashMap;

/// An intercepted request.
#[derive(Debug, Clone)]
pub struct FakeRequest {
    method: String,
    path: String,
    headers: HashMap<String, String>,
    body: Value,
}

impl FakeRequest {
    /// Create a request for the given method and path. The method is
    /// normalized to uppercase.
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into().to_uppercase(),
            path: path.into(),
            headers: HashMap::new(),
            body: Value::Null,
        }
    }

    /// Attach a header (builder style).
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_lowercase(), value.into());
        self
    }

    /// Attach a JSON body (builder style).
    pub fn json(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Case-insensitive header lookup.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains_key(&name.to_lowercase())
    }

    /// The body as an object map. Non-object bodies read as empty, so the
    /// default create/update handlers can merge them unconditionally.
    pub(crate) fn body_object(&self) -> serde_json::Map<String, Value> {
        match &self.body {
            Value::Object(map) => map.clone(),
            _ => serde_json::Map::new(),
        }
    }
}
