//! YAML spec parsing.
//!
//! The supported shape groups routes under named collections:
//!
//! ```yaml
//! collections:
//!   users:
//!     basePath: /v1/users
//!     faker:
//!       name: firstName
//!     operations:
//!       list:   { method: GET, authRequired: true }
//!       create: { method: POST }
//!     routes:
//!       "/{id}":
//!         operations:
//!           show: { method: GET }
//! ```
//!
//! Route full paths are the collection base path plus the route sub-path,
//! unless the route declares its own `basePath`. Unknown operation names are
//! skipped. Collection order and route order in the file are preserved,
//! since registration order decides match precedence.

use super::{OperationSpec, PathSpec, SpecSource};
use crate::error::SpecError;
use crate::route::CrudKind;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct SpecFile {
    #[serde(default)]
    collections: serde_yaml::Mapping,
}

#[derive(Debug, Deserialize)]
struct CollectionSpec {
    #[serde(default, rename = "basePath")]
    base_path: Option<String>,
    #[serde(default)]
    faker: Option<Value>,
    #[serde(default)]
    operations: Option<HashMap<String, OperationConfig>>,
    // A mapping rather than a HashMap so the file's route order survives.
    #[serde(default)]
    routes: Option<serde_yaml::Mapping>,
}

#[derive(Debug, Deserialize)]
struct RouteConfig {
    #[serde(default, rename = "basePath")]
    base_path: Option<String>,
    #[serde(default)]
    faker: Option<Value>,
    #[serde(default)]
    operations: Option<HashMap<String, OperationConfig>>,
}

#[derive(Debug, Deserialize)]
struct OperationConfig {
    method: String,
    #[serde(default, rename = "authRequired")]
    auth_required: bool,
    #[serde(default)]
    responses: HashMap<String, Value>,
}

/// Parses a declarative YAML API spec into the three maps a
/// [`SpecSource`] exposes.
#[derive(Debug, Default)]
pub struct YamlSpecParser {
    paths: Vec<(String, PathSpec)>,
    faker_definitions: HashMap<String, Value>,
    supported_methods: HashMap<String, Vec<String>>,
    auth_requirements: HashMap<String, HashMap<String, bool>>,
}

impl YamlSpecParser {
    /// Parse a spec from a file on disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SpecError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_str(&raw)
    }

    /// Parse a spec from YAML source.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(source: &str) -> Result<Self, SpecError> {
        let file: SpecFile = serde_yaml::from_str(source)?;
        let mut parser = Self::default();

        for (name, value) in file.collections {
            let Some(name) = name.as_str().map(str::to_string) else {
                continue;
            };
            let collection: CollectionSpec = serde_yaml::from_value(value)?;
            let base_path = collection
                .base_path
                .clone()
                .unwrap_or_else(|| format!("/{name}"));

            if let Some(faker) = collection.faker {
                parser.faker_definitions.insert(base_path.clone(), faker);
            }

            if let Some(operations) = &collection.operations {
                parser.process_operations(&base_path, operations, &base_path, &name, &base_path);
            }

            let Some(routes) = collection.routes else {
                continue;
            };
            for (route_path, route_value) in routes {
                let Some(route_path) = route_path.as_str() else {
                    continue;
                };
                let route: RouteConfig = serde_yaml::from_value(route_value)?;
                let route_base = route.base_path.clone();
                let full_path = match &route_base {
                    Some(base) => format!("{base}{route_path}"),
                    None => format!("{base_path}{route_path}"),
                };

                if let Some(faker) = route.faker {
                    parser.faker_definitions.insert(full_path.clone(), faker);
                }
                if let Some(operations) = &route.operations {
                    let storage_base = route_base.as_deref().unwrap_or(&base_path);
                    parser.process_operations(
                        &full_path,
                        operations,
                        &full_path,
                        &name,
                        storage_base,
                    );
                }
            }
        }

        debug!(paths = parser.paths.len(), "parsed yaml spec");
        Ok(parser)
    }

    fn process_operations(
        &mut self,
        path: &str,
        operations: &HashMap<String, OperationConfig>,
        original_path: &str,
        collection: &str,
        base_path: &str,
    ) {
        // Fixed kind order keeps registration deterministic per path.
        for kind in CrudKind::ALL {
            let Some(config) = operations.get(kind.as_str()) else {
                continue;
            };
            let method = config.method.to_uppercase();

            let entry = match self.paths.iter_mut().find(|(key, _)| key == original_path) {
                Some((_, entry)) => entry,
                None => {
                    self.paths.push((original_path.to_string(), PathSpec::new()));
                    &mut self.paths.last_mut().expect("just pushed").1
                }
            };
            entry.insert(
                kind,
                OperationSpec {
                    collection: collection.to_string(),
                    method: method.clone(),
                    auth_required: config.auth_required,
                    path: Some(path.to_string()),
                    base_path: Some(base_path.to_string()),
                    responses: config.responses.clone(),
                },
            );

            self.supported_methods
                .entry(path.to_string())
                .or_default()
                .push(method.clone());
            self.auth_requirements
                .entry(path.to_string())
                .or_default()
                .insert(method, config.auth_required);
        }
    }
}

impl SpecSource for YamlSpecParser {
    fn paths(&self) -> Vec<(String, PathSpec)> {
        self.paths.clone()
    }

    fn faker_definitions(&self) -> HashMap<String, Value> {
        self.faker_definitions.clone()
    }

    fn auth_requirements(&self) -> HashMap<String, HashMap<String, bool>> {
        self.auth_requirements.clone()
    }

    fn supported_methods(&self) -> HashMap<String, Vec<String>> {
        self.supported_methods.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPEC: &str = r#"
collections:
  users:
    basePath: /v1/users
    faker:
      name: firstName
      email: email
    operations:
      list:
        method: GET
        authRequired: true
      create:
        method: POST
    routes:
      "/{id}":
        operations:
          show:
            method: GET
          update:
            method: PUT
          delete:
            method: DELETE
      "/{id}/profile":
        faker:
          bio: sentence
        operations:
          show:
            method: GET
  orders:
    operations:
      list:
        method: GET
"#;

    #[test]
    fn test_paths_and_operations() {
        let parser = YamlSpecParser::from_str(SPEC).unwrap();
        let paths = parser.paths();

        let keys: Vec<&str> = paths.iter().map(|(key, _)| key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "/v1/users",
                "/v1/users/{id}",
                "/v1/users/{id}/profile",
                "/orders"
            ]
        );

        let (_, users) = &paths[0];
        let list = &users[&CrudKind::List];
        assert_eq!(list.method, "GET");
        assert!(list.auth_required);
        assert_eq!(list.collection, "users");
        assert_eq!(list.base_path.as_deref(), Some("/v1/users"));

        let (_, by_id) = &paths[1];
        assert!(by_id.contains_key(&CrudKind::Show));
        assert!(by_id.contains_key(&CrudKind::Update));
        assert!(by_id.contains_key(&CrudKind::Delete));
        assert_eq!(
            by_id[&CrudKind::Show].path.as_deref(),
            Some("/v1/users/{id}")
        );
    }

    #[test]
    fn test_default_base_path_is_collection_name() {
        let parser = YamlSpecParser::from_str(SPEC).unwrap();
        let paths = parser.paths();
        let (key, orders) = paths.last().unwrap();
        assert_eq!(key, "/orders");
        assert_eq!(
            orders[&CrudKind::List].base_path.as_deref(),
            Some("/orders")
        );
    }

    #[test]
    fn test_faker_definitions_keyed_by_path() {
        let parser = YamlSpecParser::from_str(SPEC).unwrap();
        let definitions = parser.faker_definitions();

        assert!(definitions.contains_key("/v1/users"));
        assert!(definitions.contains_key("/v1/users/{id}/profile"));
        assert_eq!(definitions["/v1/users"]["name"], "firstName");
    }

    #[test]
    fn test_auth_requirements() {
        let parser = YamlSpecParser::from_str(SPEC).unwrap();
        let auth = parser.auth_requirements();

        assert_eq!(auth["/v1/users"]["GET"], true);
        assert_eq!(auth["/v1/users"]["POST"], false);
        assert_eq!(auth["/v1/users/{id}"]["PUT"], false);
    }

    #[test]
    fn test_supported_methods() {
        let parser = YamlSpecParser::from_str(SPEC).unwrap();
        let methods = parser.supported_methods();

        let mut users = methods["/v1/users"].clone();
        users.sort();
        assert_eq!(users, vec!["GET", "POST"]);
    }

    #[test]
    fn test_unknown_operations_are_skipped() {
        let parser = YamlSpecParser::from_str(
            r#"
collections:
  users:
    operations:
      list: { method: GET }
      upsert: { method: POST }
"#,
        )
        .unwrap();

        let paths = parser.paths();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].1.len(), 1);
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        assert!(matches!(
            YamlSpecParser::from_str("collections: ["),
            Err(SpecError::Yaml(_))
        ));
    }
}
