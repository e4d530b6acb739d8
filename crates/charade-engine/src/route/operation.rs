//! Route operations and per-request match results.

use super::pattern::RoutePattern;
use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// The semantic operation a route performs, independent of its HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrudKind {
    List,
    Show,
    Create,
    Update,
    Delete,
}

impl CrudKind {
    /// All kinds, in the fixed order boot routines iterate them.
    pub const ALL: [CrudKind; 5] = [
        CrudKind::List,
        CrudKind::Show,
        CrudKind::Create,
        CrudKind::Update,
        CrudKind::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CrudKind::List => "list",
            CrudKind::Show => "show",
            CrudKind::Create => "create",
            CrudKind::Update => "update",
            CrudKind::Delete => "delete",
        }
    }
}

impl fmt::Display for CrudKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CrudKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "list" => Ok(CrudKind::List),
            "show" => Ok(CrudKind::Show),
            "create" => Ok(CrudKind::Create),
            "update" => Ok(CrudKind::Update),
            "delete" => Ok(CrudKind::Delete),
            other => Err(EngineError::InvalidKind(other.to_string())),
        }
    }
}

/// A registered operation: CRUD kind, compiled pattern, HTTP method and the
/// collection it belongs to. Immutable after construction.
#[derive(Debug, Clone)]
pub struct RouteOperation {
    kind: CrudKind,
    pattern: RoutePattern,
    method: String,
    collection: String,
    base_path: String,
}

impl RouteOperation {
    pub(crate) fn new(
        kind: CrudKind,
        pattern: RoutePattern,
        method: &str,
        collection: &str,
        base_path: Option<&str>,
    ) -> Self {
        let base_path = base_path
            .map(str::to_string)
            .unwrap_or_else(|| pattern.base_path().to_string());
        Self {
            kind,
            pattern,
            method: method.to_uppercase(),
            collection: collection.to_string(),
            base_path,
        }
    }

    /// Whether this operation accepts the given path and method. Method
    /// comparison is case-insensitive.
    pub fn matches(&self, path: &str, method: &str) -> bool {
        self.method == method.to_uppercase() && self.pattern.matches(path)
    }

    /// Extract named parameters from a matching path.
    pub fn extract_parameters(&self, path: &str) -> HashMap<String, String> {
        self.pattern.extract(path).unwrap_or_default()
    }

    pub fn kind(&self) -> CrudKind {
        self.kind
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn template(&self) -> &str {
        self.pattern.template()
    }

    pub fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// The collection storage key for this operation, e.g. `/v1/users` for
    /// the template `/v1/users/{id}`.
    pub fn base_path(&self) -> &str {
        &self.base_path
    }
}

/// The ephemeral result of a successful route resolution.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    operation: Arc<RouteOperation>,
    path: String,
    method: String,
    parameters: HashMap<String, String>,
}

impl RouteMatch {
    pub(crate) fn new(operation: Arc<RouteOperation>, path: &str, method: &str) -> Self {
        let parameters = operation.extract_parameters(path);
        Self {
            operation,
            path: path.to_string(),
            method: method.to_uppercase(),
            parameters,
        }
    }

    pub fn operation(&self) -> &RouteOperation {
        &self.operation
    }

    pub fn kind(&self) -> CrudKind {
        self.operation.kind()
    }

    /// The concrete request path that matched.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn parameters(&self) -> &HashMap<String, String> {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    pub fn has_parameter(&self, name: &str) -> bool {
        self.parameters.contains_key(name)
    }

    /// The item id addressed by this match: the `resource` parameter for
    /// nested routes, else the `id` parameter.
    pub fn resource_id(&self) -> Option<&str> {
        self.parameter("resource").or_else(|| self.parameter("id"))
    }

    /// The storage key for the collection this match addresses.
    pub fn collection_path(&self) -> &str {
        self.operation.base_path()
    }
}
