//! Parsed API specification data model.
//!
//! The engine never parses spec files itself; it consumes the three maps a
//! [`SpecSource`] exposes. [`YamlSpecParser`] is the bundled implementation
//! for the declarative YAML shape.

mod yaml;

pub use yaml::YamlSpecParser;

use crate::route::CrudKind;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

/// One operation descriptor under a spec path.
#[derive(Debug, Clone, Deserialize)]
pub struct OperationSpec {
    /// Collection the operation belongs to.
    pub collection: String,
    /// HTTP method, stored uppercased.
    pub method: String,
    #[serde(default, rename = "authRequired")]
    pub auth_required: bool,
    /// Route template, when it differs from the paths-map key (nested
    /// routes).
    #[serde(default)]
    pub path: Option<String>,
    /// Explicit collection storage key.
    #[serde(default, rename = "basePath")]
    pub base_path: Option<String>,
    /// Declared response documents, by status code.
    #[serde(default)]
    pub responses: HashMap<String, Value>,
}

/// Per-CRUD-kind descriptors for one spec path.
pub type PathSpec = HashMap<CrudKind, OperationSpec>;

/// A producer of parsed spec data. Paths are ordered: route registration
/// order decides match precedence, so sources must preserve it.
pub trait SpecSource {
    fn paths(&self) -> Vec<(String, PathSpec)>;

    /// Faker definitions keyed by the path they seed.
    fn faker_definitions(&self) -> HashMap<String, Value>;

    /// Auth requirements per path and method.
    fn auth_requirements(&self) -> HashMap<String, HashMap<String, bool>>;

    /// Supported HTTP methods per path.
    fn supported_methods(&self) -> HashMap<String, Vec<String>>;
}
