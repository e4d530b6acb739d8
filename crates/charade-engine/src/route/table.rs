//! Registered operations and route resolution.

use super::operation::{CrudKind, RouteMatch, RouteOperation};
use super::pattern::RoutePattern;
use crate::error::EngineError;
use std::sync::Arc;
use tracing::debug;

/// The ordered set of registered route operations.
///
/// Resolution returns the first operation whose matcher accepts the path and
/// whose method matches, in registration order. There is no specificity
/// ranking: more specific routes must be registered before more general ones
/// that could also accept the same literal path.
#[derive(Debug, Default)]
pub struct RouteTable {
    operations: Vec<Arc<RouteOperation>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile and append an operation.
    pub fn register(
        &mut self,
        kind: CrudKind,
        template: &str,
        method: &str,
        collection: &str,
    ) -> Result<(), EngineError> {
        self.register_with_base(kind, template, method, collection, None)
    }

    /// Compile and append an operation with an explicit collection storage
    /// key, overriding the base path derived from the template.
    pub fn register_with_base(
        &mut self,
        kind: CrudKind,
        template: &str,
        method: &str,
        collection: &str,
        base_path: Option<&str>,
    ) -> Result<(), EngineError> {
        let pattern = RoutePattern::compile(template)?;
        let operation = RouteOperation::new(kind, pattern, method, collection, base_path);
        debug!(
            kind = %kind,
            template,
            method = operation.method(),
            base_path = operation.base_path(),
            "registered route operation"
        );
        self.operations.push(Arc::new(operation));
        Ok(())
    }

    /// Register a sub-resource route such as `GET /users/{resource}/profile`
    /// without a full spec entry, mapped onto one of the five CRUD kinds.
    pub fn register_nested_resource_operation(
        &mut self,
        collection: &str,
        operation: &str,
        method: &str,
        kind: CrudKind,
    ) -> Result<(), EngineError> {
        let template = format!("/{collection}/{{resource}}/{operation}");
        self.register(kind, &template, method, collection)
    }

    /// Resolve a `(path, method)` pair to the first matching operation.
    pub fn resolve(&self, path: &str, method: &str) -> Option<RouteMatch> {
        self.operations
            .iter()
            .find(|op| op.matches(path, method))
            .map(|op| RouteMatch::new(Arc::clone(op), path, method))
    }

    /// Resolve to the CRUD kind only.
    pub fn resolve_kind(&self, path: &str, method: &str) -> Option<CrudKind> {
        self.resolve(path, method).map(|m| m.kind())
    }

    pub fn operations(&self) -> &[Arc<RouteOperation>] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Drop every registered operation.
    pub fn clear(&mut self) {
        self.operations.clear();
    }
}
