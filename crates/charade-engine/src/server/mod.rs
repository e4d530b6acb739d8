//! Request dispatch and the mock server facade.
//!
//! [`MockServer::handle`] is the responder the HTTP interception layer
//! invokes for every intercepted request. Dispatch is strictly ordered:
//! temporary overrides first (absolute, bypassing auth and routing), then
//! route resolution, authorization, scope resolution, and finally handler
//! resolution by priority: nested-resource handler, custom-operation
//! handler, standard-path handler, built-in CRUD handler.

mod handlers;

pub use handlers::{
    custom_operation_key, nested_resource_key, standard_key, Handler, HandlerOutcome,
};

use crate::error::EngineError;
use crate::faker::DefinitionFaker;
use crate::overrides::{OverrideSnapshot, ResponseOverrides};
use crate::request::FakeRequest;
use crate::response::{infer_status, ApiResponse};
use crate::route::{CrudKind, RouteMatch, RouteTable};
use crate::spec::{PathSpec, SpecSource};
use crate::store::ScopedStore;
use parking_lot::RwLock;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info};
use uuid::Uuid;

/// Header carrying the caller identity, used for default auth and scoping.
pub const IDENTITY_HEADER: &str = "X-User-ID";

/// Scope assigned to requests without an identity header.
pub const ANONYMOUS_SCOPE: &str = "anonymous";

/// Lifecycle events observable via [`MockServer::register_hook`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookEvent {
    Init,
    Creating,
    Created,
    Showing,
    Updating,
    Updated,
    Deleting,
    Deleted,
}

type HookFn = Box<dyn Fn(&Value, &str, Option<&FakeRequest>) + Send + Sync>;
type AuthResolver = Box<dyn Fn(&str, &str, &FakeRequest) -> bool + Send + Sync>;
type ScopeResolver = Box<dyn Fn(&FakeRequest) -> String + Send + Sync>;
type ResponseFormatter = Box<dyn Fn(Value, &str, &str, CrudKind) -> Value + Send + Sync>;

/// The mock API engine: routes, scoped store, overrides, auth and handler
/// registry behind a single dispatch entry point.
pub struct MockServer {
    routes: RouteTable,
    store: ScopedStore,
    overrides: ResponseOverrides,
    faker: DefinitionFaker,
    handlers: HashMap<String, Handler>,
    hooks: HashMap<HookEvent, Vec<HookFn>>,
    auth_required: HashMap<String, HashMap<String, bool>>,
    path_definitions: HashMap<String, Value>,
    auth_resolver: Option<AuthResolver>,
    scope_resolver: Option<ScopeResolver>,
    response_formatter: Option<ResponseFormatter>,
    last_response: RwLock<Option<ApiResponse>>,
}

impl Default for MockServer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockServer {
    /// An engine with a purely in-memory store.
    pub fn new() -> Self {
        Self::with_store(ScopedStore::new())
    }

    /// An engine whose store loads from (and saves back to) a snapshot file.
    pub fn with_snapshot(path: impl Into<PathBuf>) -> Self {
        Self::with_store(ScopedStore::with_snapshot(path))
    }

    fn with_store(store: ScopedStore) -> Self {
        Self {
            routes: RouteTable::new(),
            store,
            overrides: ResponseOverrides::new(),
            faker: DefinitionFaker::new(),
            handlers: HashMap::new(),
            hooks: HashMap::new(),
            auth_required: HashMap::new(),
            path_definitions: HashMap::new(),
            auth_resolver: None,
            scope_resolver: None,
            response_formatter: None,
            last_response: RwLock::new(None),
        }
    }

    // ===== Boot =====

    /// Populate routes, auth requirements and faker definitions from parsed
    /// spec data. Paths are registered in the given order; within one path
    /// the five CRUD kinds register in their fixed order.
    pub fn boot_from_parsed(
        &mut self,
        paths: Vec<(String, PathSpec)>,
        faker_definitions: HashMap<String, Value>,
        auth_requirements: HashMap<String, HashMap<String, bool>>,
    ) -> Result<(), EngineError> {
        self.path_definitions.extend(faker_definitions);
        let mut registered = 0usize;

        for (path, entry) in paths {
            for kind in CrudKind::ALL {
                let Some(operation) = entry.get(&kind) else {
                    continue;
                };
                let method = operation.method.to_uppercase();
                let template = operation.path.as_deref().unwrap_or(&path);

                self.routes.register_with_base(
                    kind,
                    template,
                    &method,
                    &operation.collection,
                    operation.base_path.as_deref(),
                )?;

                let required = auth_requirements
                    .get(&path)
                    .and_then(|methods| methods.get(&method))
                    .copied()
                    .unwrap_or(operation.auth_required);
                self.register_auth_requirement(&path, &method, required);
                registered += 1;
            }
        }

        info!(operations = registered, "booted mock server from parsed spec");
        self.run_hooks(HookEvent::Init, &Value::Null, "", None);
        Ok(())
    }

    /// Boot from any spec source (e.g. the bundled YAML parser).
    pub fn boot_from_source(&mut self, source: &impl SpecSource) -> Result<(), EngineError> {
        self.boot_from_parsed(
            source.paths(),
            source.faker_definitions(),
            source.auth_requirements(),
        )
    }

    // ===== Dispatch =====

    /// Handle one intercepted request. Never fails: every per-request
    /// problem maps to a response.
    pub fn handle(&self, request: &FakeRequest) -> ApiResponse {
        let response = self.dispatch(request);
        *self.last_response.write() = Some(response.clone());
        response
    }

    fn dispatch(&self, request: &FakeRequest) -> ApiResponse {
        let path = request.path();
        let method = request.method();

        // Overrides are absolute: no routing, no auth.
        if let Some(response) = self.overrides.consume(path, method) {
            return response;
        }

        let Some(route) = self.routes.resolve(path, method) else {
            debug!(path, method, "no route matched");
            return ApiResponse::with_status(json!({"error": "No route matched"}), 404);
        };

        if !self.is_authorized(path, method, request) {
            debug!(path, method, "request not authorized");
            return ApiResponse::unauthorized();
        }

        self.serve(&route, request)
    }

    fn serve(&self, route: &RouteMatch, request: &FakeRequest) -> ApiResponse {
        let path = route.path();
        let method = route.method();
        let kind = route.kind();

        // Nested-resource paths get two chances at a custom handler before
        // the standard lookup.
        if let (Some(collection), Some(operation)) =
            (extract_collection_name(path), extract_operation_name(path))
        {
            let key = nested_resource_key(method, collection, operation);
            if let Some(handler) = self.handlers.get(&key) {
                debug!(key, "dispatching to nested-resource handler");
                return self.finish(handler(route, request), path, method, kind);
            }

            let key = custom_operation_key(operation);
            if let Some(handler) = self.handlers.get(&key) {
                debug!(key, "dispatching to custom-operation handler");
                return self.finish(handler(route, request), path, method, kind);
            }
        }

        let key = standard_key(method, route.operation().template(), kind);
        if let Some(handler) = self.handlers.get(&key) {
            debug!(key, "dispatching to standard handler");
            return self.finish(handler(route, request), path, method, kind);
        }

        let outcome = match kind {
            CrudKind::List => self.handle_list(route, request),
            CrudKind::Show => self.handle_show(route, request),
            CrudKind::Create => self.handle_create(route, request),
            CrudKind::Update => self.handle_update(route, request),
            CrudKind::Delete => self.handle_delete(route, request),
        };
        self.finish(outcome, path, method, kind)
    }

    fn finish(
        &self,
        outcome: HandlerOutcome,
        path: &str,
        method: &str,
        kind: CrudKind,
    ) -> ApiResponse {
        match outcome {
            HandlerOutcome::Raw(value) => {
                let status = infer_status(&value, kind);
                let body = self.format_body(value, path, method, kind);
                ApiResponse::with_status(body, status)
            }
            HandlerOutcome::Response(response) => {
                let (status, body, headers) = response.into_parts();
                let body = self.format_body(body, path, method, kind);
                ApiResponse::with_status(body, status).with_headers(headers)
            }
            HandlerOutcome::Final(response) => response,
        }
    }

    fn format_body(&self, body: Value, path: &str, method: &str, kind: CrudKind) -> Value {
        match &self.response_formatter {
            Some(formatter) => formatter(body, path, method, kind),
            None => body,
        }
    }

    // ===== Built-in CRUD handlers =====

    fn handle_list(&self, route: &RouteMatch, request: &FakeRequest) -> HandlerOutcome {
        let scope = self.resolve_scope(request);
        let collection = route.collection_path();

        if !self.store.has_scope(collection, &scope) {
            return HandlerOutcome::Raw(json!([]));
        }
        HandlerOutcome::Raw(Value::Array(self.store.list(collection, &scope)))
    }

    fn handle_show(&self, route: &RouteMatch, request: &FakeRequest) -> HandlerOutcome {
        let id = item_id(route);
        let scope = self.resolve_scope(request);
        let collection = route.collection_path();

        match self.store.get(collection, &scope, &id) {
            Some(item) => {
                self.run_hooks(HookEvent::Showing, &item, route.path(), Some(request));
                HandlerOutcome::Raw(item)
            }
            None => HandlerOutcome::Raw(json!({"error": "Not found"})),
        }
    }

    fn handle_create(&self, route: &RouteMatch, request: &FakeRequest) -> HandlerOutcome {
        let id = Uuid::new_v4().to_string();
        let scope = self.resolve_scope(request);
        let collection = route.collection_path();

        let mut fields = request.body_object();
        fields.insert("id".to_string(), json!(id));
        let item = Value::Object(fields);

        self.run_hooks(HookEvent::Creating, &item, route.path(), Some(request));
        self.store.add(collection, &scope, &id, item.clone());
        self.run_hooks(HookEvent::Created, &item, route.path(), Some(request));

        HandlerOutcome::Raw(item)
    }

    fn handle_update(&self, route: &RouteMatch, request: &FakeRequest) -> HandlerOutcome {
        let id = item_id(route);
        let scope = self.resolve_scope(request);
        let collection = route.collection_path();

        let Some(existing) = self.store.get(collection, &scope, &id) else {
            return HandlerOutcome::Raw(json!({"error": "Not found"}));
        };

        self.run_hooks(HookEvent::Updating, &existing, route.path(), Some(request));
        let updated = merge(existing, request.body_object());
        self.store.put(collection, &scope, &id, updated.clone());
        self.run_hooks(HookEvent::Updated, &updated, route.path(), Some(request));

        HandlerOutcome::Raw(updated)
    }

    fn handle_delete(&self, route: &RouteMatch, request: &FakeRequest) -> HandlerOutcome {
        let id = item_id(route);
        let scope = self.resolve_scope(request);
        let collection = route.collection_path();

        if !self.store.has(collection, &scope, &id) {
            return HandlerOutcome::Raw(json!({"error": "Not found"}));
        }

        self.run_hooks(HookEvent::Deleting, &json!(id), collection, Some(request));
        self.store.remove(collection, &scope, &id);
        self.run_hooks(HookEvent::Deleted, &json!(id), collection, Some(request));

        HandlerOutcome::Raw(Value::Null)
    }

    // ===== Auth and scope =====

    /// Whether a request may proceed. A custom resolver, when set, decides
    /// entirely on its own; otherwise the registered requirement map is
    /// consulted (default: not required) and a required route accepts any
    /// request carrying the identity header.
    pub fn is_authorized(&self, path: &str, method: &str, request: &FakeRequest) -> bool {
        if let Some(resolver) = &self.auth_resolver {
            return resolver(path, method, request);
        }

        let required = self
            .auth_required
            .get(path)
            .and_then(|methods| methods.get(&method.to_uppercase()))
            .copied()
            .unwrap_or(false);

        !required || request.has_header(IDENTITY_HEADER)
    }

    fn resolve_scope(&self, request: &FakeRequest) -> String {
        if let Some(resolver) = &self.scope_resolver {
            return resolver(request);
        }
        request
            .header_value(IDENTITY_HEADER)
            .map(str::to_string)
            .unwrap_or_else(|| ANONYMOUS_SCOPE.to_string())
    }

    /// Mark a path+method as requiring (or not requiring) authorization.
    pub fn register_auth_requirement(&mut self, path: &str, method: &str, required: bool) {
        self.auth_required
            .entry(path.to_string())
            .or_default()
            .insert(method.to_uppercase(), required);
    }

    /// Replace the default auth check with custom logic.
    pub fn set_auth_resolver(
        &mut self,
        resolver: impl Fn(&str, &str, &FakeRequest) -> bool + Send + Sync + 'static,
    ) -> &mut Self {
        self.auth_resolver = Some(Box::new(resolver));
        self
    }

    /// Replace the default scope derivation with custom logic.
    pub fn set_scope_resolver(
        &mut self,
        resolver: impl Fn(&FakeRequest) -> String + Send + Sync + 'static,
    ) -> &mut Self {
        self.scope_resolver = Some(Box::new(resolver));
        self
    }

    /// Register a body rewriter applied to every non-final response. It
    /// receives the body, path, method and CRUD kind; the status code is
    /// never touched.
    pub fn format_response_using(
        &mut self,
        formatter: impl Fn(Value, &str, &str, CrudKind) -> Value + Send + Sync + 'static,
    ) -> &mut Self {
        self.response_formatter = Some(Box::new(formatter));
        self
    }

    // ===== Handler and hook registration =====

    /// Register a handler under a synthetic key. Use the key builders
    /// ([`nested_resource_key`], [`custom_operation_key`], [`standard_key`])
    /// to construct keys matching the dispatch priority.
    pub fn register_handler(
        &mut self,
        key: impl Into<String>,
        handler: impl Fn(&RouteMatch, &FakeRequest) -> HandlerOutcome + Send + Sync + 'static,
    ) -> &mut Self {
        self.handlers.insert(key.into(), Box::new(handler));
        self
    }

    /// Register a lifecycle hook. Hooks run in registration order and
    /// receive the affected payload, the storage path, and the triggering
    /// request. The request is absent for hooks fired outside a dispatch,
    /// such as `Init` at boot.
    pub fn register_hook(
        &mut self,
        event: HookEvent,
        hook: impl Fn(&Value, &str, Option<&FakeRequest>) + Send + Sync + 'static,
    ) -> &mut Self {
        self.hooks.entry(event).or_default().push(Box::new(hook));
        self
    }

    fn run_hooks(&self, event: HookEvent, payload: &Value, path: &str, request: Option<&FakeRequest>) {
        if let Some(hooks) = self.hooks.get(&event) {
            for hook in hooks {
                hook(payload, path, request);
            }
        }
    }

    // ===== Routes =====

    /// Register a route operation directly.
    pub fn register_route(
        &mut self,
        kind: CrudKind,
        template: &str,
        method: &str,
        collection: &str,
    ) -> Result<(), EngineError> {
        self.routes.register(kind, template, method, collection)
    }

    /// Register a sub-resource route such as `GET /users/{resource}/profile`.
    pub fn register_nested_resource_operation(
        &mut self,
        collection: &str,
        operation: &str,
        method: &str,
        kind: CrudKind,
    ) -> Result<(), EngineError> {
        self.routes
            .register_nested_resource_operation(collection, operation, method, kind)
    }

    /// Resolve a path+method pair without dispatching.
    pub fn match_route(&self, path: &str, method: &str) -> Option<RouteMatch> {
        self.routes.resolve(path, method)
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    // ===== Temporary overrides =====

    /// Register a call-counted canned response that preempts routing for the
    /// given path and method.
    pub fn add_temporary_response(
        &self,
        path: &str,
        method: &str,
        body: Value,
        total_uses: u32,
        status: u16,
    ) {
        self.overrides
            .add(path, method, body, total_uses, status, HashMap::new());
    }

    /// Same as [`add_temporary_response`](Self::add_temporary_response) with
    /// response headers attached.
    pub fn add_temporary_response_with_headers(
        &self,
        path: &str,
        method: &str,
        body: Value,
        total_uses: u32,
        status: u16,
        headers: HashMap<String, String>,
    ) {
        self.overrides
            .add(path, method, body, total_uses, status, headers);
    }

    /// Read-only view of live overrides and their counters.
    pub fn temporary_responses(&self) -> Vec<OverrideSnapshot> {
        self.overrides.list()
    }

    pub fn clear_temporary_responses(&self) {
        self.overrides.clear();
    }

    // ===== Seeding =====

    /// Register a faker definition for a path.
    pub fn add_path_definition(&mut self, path: &str, definition: Value) {
        self.path_definitions.insert(path.to_string(), definition);
    }

    /// Build one fake item for `path` and add it to the store under `scope`.
    ///
    /// The definition is taken from the argument, falling back to the
    /// definition registered for the path; having neither is a setup error.
    /// `overrides` fields replace generated ones; an `id` override is kept,
    /// otherwise a fresh one is assigned.
    pub fn add_item(
        &self,
        path: &str,
        definition: Option<&Value>,
        overrides: Value,
        scope: &str,
    ) -> Result<Value, EngineError> {
        let definition = match definition {
            Some(definition) => definition.clone(),
            None => self
                .path_definitions
                .get(path)
                .cloned()
                .ok_or_else(|| EngineError::MissingDefinition(path.to_string()))?,
        };

        let mut fields = match self.faker.make(&definition) {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        if let Value::Object(extra) = overrides {
            fields.extend(extra);
        }

        let id = fields
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        fields.insert("id".to_string(), json!(id));

        let item = Value::Object(fields);
        self.store.add(path, scope, &id, item.clone());
        Ok(item)
    }

    /// Build and store `count` fake items.
    pub fn add_items(
        &self,
        path: &str,
        count: usize,
        definition: Option<&Value>,
        overrides: Value,
        scope: &str,
    ) -> Result<Vec<Value>, EngineError> {
        (0..count)
            .map(|_| self.add_item(path, definition, overrides.clone(), scope))
            .collect()
    }

    // ===== Introspection and maintenance =====

    pub fn store(&self) -> &ScopedStore {
        &self.store
    }

    /// Mutable access to the faker, for registering custom generators.
    pub fn faker_mut(&mut self) -> &mut DefinitionFaker {
        &mut self.faker
    }

    /// The response produced by the most recent [`handle`](Self::handle)
    /// call.
    pub fn last_response(&self) -> Option<ApiResponse> {
        self.last_response.read().clone()
    }

    /// Reset the store to an empty state.
    pub fn clear(&self) {
        self.store.clear();
    }
}

/// The item id addressed by a match: the extracted resource/id parameter,
/// falling back to the last path segment.
fn item_id(route: &RouteMatch) -> String {
    route
        .resource_id()
        .map(str::to_string)
        .unwrap_or_else(|| basename(route.path()))
}

fn basename(path: &str) -> String {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Shallow-merge `fields` over `base`. Non-object bases are replaced.
fn merge(base: Value, fields: serde_json::Map<String, Value>) -> Value {
    match base {
        Value::Object(mut map) => {
            map.extend(fields);
            Value::Object(map)
        }
        _ => Value::Object(fields),
    }
}

/// First segment of a path with at least three segments: the collection of
/// a nested-resource path like `/users/{resource}/profile`.
fn extract_collection_name(path: &str) -> Option<&str> {
    let mut segments = path.trim_matches('/').split('/');
    segments.next()
}

/// Third segment of a path with at least three segments: the custom
/// operation of a nested-resource path.
fn extract_operation_name(path: &str) -> Option<&str> {
    path.trim_matches('/').split('/').nth(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    const UUID: &str = "123e4567-e89b-12d3-a456-426614174000";

    fn server_with_users() -> MockServer {
        let mut server = MockServer::new();
        server
            .register_route(CrudKind::List, "/v1/users", "GET", "users")
            .unwrap();
        server
            .register_route(CrudKind::Create, "/v1/users", "POST", "users")
            .unwrap();
        server
            .register_route(CrudKind::Show, "/v1/users/{id}", "GET", "users")
            .unwrap();
        server
            .register_route(CrudKind::Update, "/v1/users/{id}", "PUT", "users")
            .unwrap();
        server
            .register_route(CrudKind::Delete, "/v1/users/{id}", "DELETE", "users")
            .unwrap();
        server
    }

    #[test]
    fn test_unknown_route_is_404() {
        let server = server_with_users();
        let resp = server.handle(&FakeRequest::new("GET", "/nope"));
        assert_eq!(resp.status(), 404);
        assert_eq!(resp.body()["error"], "No route matched");
    }

    #[test]
    fn test_create_assigns_id_and_returns_201() {
        let server = server_with_users();
        let resp = server.handle(
            &FakeRequest::new("POST", "/v1/users")
                .header(IDENTITY_HEADER, "user-1")
                .json(json!({"name": "Alice"})),
        );

        assert_eq!(resp.status(), 201);
        assert_eq!(resp.body()["name"], "Alice");
        assert!(resp.body()["id"].is_string());
    }

    #[test]
    fn test_show_and_delete_round_trip() {
        let server = server_with_users();
        let created = server.handle(
            &FakeRequest::new("POST", "/v1/users")
                .header(IDENTITY_HEADER, "user-1")
                .json(json!({"name": "Alice"})),
        );
        let id = created.body()["id"].as_str().unwrap().to_string();

        let shown = server.handle(
            &FakeRequest::new("GET", format!("/v1/users/{id}")).header(IDENTITY_HEADER, "user-1"),
        );
        assert_eq!(shown.status(), 200);
        assert_eq!(shown.body()["name"], "Alice");

        let deleted = server.handle(
            &FakeRequest::new("DELETE", format!("/v1/users/{id}"))
                .header(IDENTITY_HEADER, "user-1"),
        );
        assert_eq!(deleted.status(), 204);

        let missing = server.handle(
            &FakeRequest::new("GET", format!("/v1/users/{id}")).header(IDENTITY_HEADER, "user-1"),
        );
        assert_eq!(missing.status(), 404);
    }

    #[test]
    fn test_update_merges_fields() {
        let server = server_with_users();
        let created = server.handle(
            &FakeRequest::new("POST", "/v1/users")
                .header(IDENTITY_HEADER, "user-1")
                .json(json!({"name": "Alice", "city": "Hamburg"})),
        );
        let id = created.body()["id"].as_str().unwrap().to_string();

        let updated = server.handle(
            &FakeRequest::new("PUT", format!("/v1/users/{id}"))
                .header(IDENTITY_HEADER, "user-1")
                .json(json!({"city": "Berlin"})),
        );
        assert_eq!(updated.status(), 200);
        assert_eq!(updated.body()["name"], "Alice");
        assert_eq!(updated.body()["city"], "Berlin");
        assert_eq!(updated.body()["id"], json!(id));
    }

    #[test]
    fn test_update_missing_item_is_404() {
        let server = server_with_users();
        let resp = server.handle(
            &FakeRequest::new("PUT", format!("/v1/users/{UUID}"))
                .header(IDENTITY_HEADER, "user-1")
                .json(json!({"city": "Berlin"})),
        );
        assert_eq!(resp.status(), 404);
    }

    #[test]
    fn test_auth_required_rejects_anonymous() {
        let mut server = server_with_users();
        server.register_auth_requirement("/v1/users", "GET", true);

        let resp = server.handle(&FakeRequest::new("GET", "/v1/users"));
        assert_eq!(resp.status(), 401);

        let resp = server.handle(&FakeRequest::new("GET", "/v1/users").header(IDENTITY_HEADER, "u"));
        assert_eq!(resp.status(), 200);
    }

    #[test]
    fn test_custom_auth_resolver_is_authoritative() {
        let mut server = server_with_users();
        server.set_auth_resolver(|_, method, _| method != "POST");

        let resp = server.handle(&FakeRequest::new("POST", "/v1/users").json(json!({})));
        assert_eq!(resp.status(), 401);

        let resp = server.handle(&FakeRequest::new("GET", "/v1/users"));
        assert_eq!(resp.status(), 200);
    }

    #[test]
    fn test_custom_scope_resolver() {
        let mut server = server_with_users();
        server.set_scope_resolver(|request| {
            request
                .header_value("Authorization")
                .unwrap_or("anonymous")
                .to_string()
        });

        server.handle(
            &FakeRequest::new("POST", "/v1/users")
                .header("Authorization", "token-a")
                .json(json!({"name": "Alice"})),
        );

        let listed = server.handle(&FakeRequest::new("GET", "/v1/users").header("Authorization", "token-a"));
        assert_eq!(listed.body().as_array().unwrap().len(), 1);

        let other = server.handle(&FakeRequest::new("GET", "/v1/users").header("Authorization", "token-b"));
        assert!(other.body().as_array().unwrap().is_empty());
    }

    #[test]
    fn test_override_bypasses_auth_and_routing() {
        let mut server = server_with_users();
        server.register_auth_requirement("/v1/users", "GET", true);
        server.add_temporary_response("/v1/users", "GET", json!({"msg": "down"}), 1, 503);

        // No identity header, and the override still answers.
        let resp = server.handle(&FakeRequest::new("GET", "/v1/users"));
        assert_eq!(resp.status(), 503);

        // Exhausted: normal dispatch resumes, auth now applies.
        let resp = server.handle(&FakeRequest::new("GET", "/v1/users"));
        assert_eq!(resp.status(), 401);
    }

    #[test]
    fn test_standard_handler_overrides_default() {
        let mut server = server_with_users();
        server.register_handler(standard_key("GET", "/v1/users", CrudKind::List), |_, _| {
            HandlerOutcome::Raw(json!([{"custom": true}]))
        });

        let resp = server.handle(&FakeRequest::new("GET", "/v1/users"));
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.body()[0]["custom"], true);
    }

    #[test]
    fn test_handler_priority_nested_beats_custom_operation() {
        let mut server = MockServer::new();
        server
            .register_nested_resource_operation("users", "profile", "GET", CrudKind::Show)
            .unwrap();
        server.register_handler(custom_operation_key("profile"), |_, _| {
            HandlerOutcome::Raw(json!({"handler": "custom"}))
        });
        server.register_handler(nested_resource_key("GET", "users", "profile"), |_, _| {
            HandlerOutcome::Raw(json!({"handler": "nested"}))
        });

        let resp = server.handle(&FakeRequest::new("GET", format!("/users/{UUID}/profile")));
        assert_eq!(resp.body()["handler"], "nested");
    }

    #[test]
    fn test_custom_operation_handler_when_no_nested_handler() {
        let mut server = MockServer::new();
        server
            .register_nested_resource_operation("users", "profile", "GET", CrudKind::Show)
            .unwrap();
        server.register_handler(custom_operation_key("profile"), |_, _| {
            HandlerOutcome::Response(ApiResponse::with_status(json!({"handler": "custom"}), 202))
        });

        let resp = server.handle(&FakeRequest::new("GET", format!("/users/{UUID}/profile")));
        assert_eq!(resp.status(), 202);
        assert_eq!(resp.body()["handler"], "custom");
    }

    #[test]
    fn test_response_formatter_rewrites_body_not_status() {
        let mut server = server_with_users();
        server.format_response_using(|body, _, _, _| json!({"data": body}));

        let resp = server.handle(
            &FakeRequest::new("POST", "/v1/users")
                .header(IDENTITY_HEADER, "user-1")
                .json(json!({"name": "Alice"})),
        );
        assert_eq!(resp.status(), 201);
        assert_eq!(resp.body()["data"]["name"], "Alice");
    }

    #[test]
    fn test_final_outcome_skips_formatter() {
        let mut server = server_with_users();
        server.format_response_using(|body, _, _, _| json!({"data": body}));
        server.register_handler(standard_key("GET", "/v1/users", CrudKind::List), |_, _| {
            HandlerOutcome::Final(ApiResponse::ok(json!({"verbatim": true})))
        });

        let resp = server.handle(&FakeRequest::new("GET", "/v1/users"));
        assert_eq!(resp.body(), &json!({"verbatim": true}));
    }

    #[test]
    fn test_add_item_requires_definition() {
        let server = MockServer::new();
        assert!(matches!(
            server.add_item("/v1/users", None, json!({}), "anonymous"),
            Err(EngineError::MissingDefinition(path)) if path == "/v1/users"
        ));
    }

    #[test]
    fn test_add_item_with_overrides() {
        let mut server = MockServer::new();
        server.add_path_definition("/v1/users", json!({"name": "firstName"}));

        let item = server
            .add_item("/v1/users", None, json!({"id": UUID, "role": "admin"}), "user-1")
            .unwrap();
        assert_eq!(item["id"], json!(UUID));
        assert_eq!(item["role"], "admin");
        assert!(item["name"].is_string());

        assert!(server.store().has("/v1/users", "user-1", UUID));
    }

    #[test]
    fn test_add_items_generates_distinct_ids() {
        let server = MockServer::new();
        let items = server
            .add_items(
                "/v1/users",
                3,
                Some(&json!({"name": "firstName"})),
                json!({}),
                "user-1",
            )
            .unwrap();
        assert_eq!(items.len(), 3);

        let ids: std::collections::HashSet<&str> =
            items.iter().map(|item| item["id"].as_str().unwrap()).collect();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn test_hooks_fire_in_order() {
        use std::sync::{Arc, Mutex};

        let events = Arc::new(Mutex::new(Vec::new()));
        let mut server = server_with_users();
        for (event, label) in [
            (HookEvent::Creating, "creating"),
            (HookEvent::Created, "created"),
        ] {
            let events = Arc::clone(&events);
            server.register_hook(event, move |_, _, _| events.lock().unwrap().push(label));
        }

        server.handle(
            &FakeRequest::new("POST", "/v1/users")
                .header(IDENTITY_HEADER, "user-1")
                .json(json!({"name": "Alice"})),
        );

        assert_eq!(*events.lock().unwrap(), vec!["creating", "created"]);
    }

    #[test]
    fn test_hooks_see_the_triggering_request() {
        use std::sync::{Arc, Mutex};

        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut server = server_with_users();
        {
            let seen = Arc::clone(&seen);
            server.register_hook(HookEvent::Created, move |_, _, request| {
                let caller = request
                    .and_then(|r| r.header_value(IDENTITY_HEADER))
                    .unwrap_or("none")
                    .to_string();
                seen.lock().unwrap().push(caller);
            });
        }

        server.handle(
            &FakeRequest::new("POST", "/v1/users")
                .header(IDENTITY_HEADER, "user-1")
                .json(json!({"name": "Alice"})),
        );

        assert_eq!(*seen.lock().unwrap(), vec!["user-1"]);
    }

    #[test]
    fn test_init_hook_fires_without_a_request() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;

        let fired = Arc::new(AtomicBool::new(false));
        let mut server = MockServer::new();
        {
            let fired = Arc::clone(&fired);
            server.register_hook(HookEvent::Init, move |_, _, request| {
                assert!(request.is_none());
                fired.store(true, Ordering::SeqCst);
            });
        }

        server.boot_from_parsed(Vec::new(), HashMap::new(), HashMap::new()).unwrap();
        assert!(fired.load(Ordering::SeqCst));
    }

    #[test]
    fn test_last_response_is_tracked() {
        let server = server_with_users();
        assert!(server.last_response().is_none());

        server.handle(&FakeRequest::new("GET", "/nope"));
        assert_eq!(server.last_response().unwrap().status(), 404);
    }
}
