//! HTTP-like responses produced by the engine.
//!
//! Handlers either build an [`ApiResponse`] explicitly or return a raw JSON
//! value and let [`infer_status`] pick the status code from a fixed lookup
//! table.

use crate::route::CrudKind;
use serde_json::Value;
use std::collections::HashMap;

/// A response with status code, JSON body and headers.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    status: u16,
    body: Value,
    headers: HashMap<String, String>,
}

impl ApiResponse {
    pub fn new(body: Value, status: u16) -> Self {
        Self {
            status,
            body,
            headers: HashMap::new(),
        }
    }

    /// 200 OK.
    pub fn ok(body: Value) -> Self {
        Self::new(body, 200)
    }

    /// 201 Created.
    pub fn created(body: Value) -> Self {
        Self::new(body, 201)
    }

    /// 404 with the standard error marker body.
    pub fn not_found() -> Self {
        Self::new(serde_json::json!({"error": "Not found"}), 404)
    }

    /// 400 with the standard error marker body.
    pub fn bad_request() -> Self {
        Self::new(serde_json::json!({"error": "Bad request"}), 400)
    }

    /// 401 with the standard error marker body.
    pub fn unauthorized() -> Self {
        Self::new(serde_json::json!({"error": "Unauthorized"}), 401)
    }

    /// 403 with the standard error marker body.
    pub fn forbidden() -> Self {
        Self::new(serde_json::json!({"error": "Forbidden"}), 403)
    }

    /// 422 with the standard error marker body.
    pub fn unprocessable_entity() -> Self {
        Self::new(serde_json::json!({"error": "Unprocessable entity"}), 422)
    }

    /// Arbitrary status code.
    pub fn with_status(body: Value, status: u16) -> Self {
        Self::new(body, status)
    }

    /// Attach headers (builder style).
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Decompose into `(status, body, headers)`.
    pub fn into_parts(self) -> (u16, Value, HashMap<String, String>) {
        (self.status, self.body, self.headers)
    }

    pub fn is_successful(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}

/// Infer a status code for a raw handler value.
///
/// `null` maps to 204. A body carrying a recognized `error` marker maps to
/// the matching 4xx code (unknown markers fall back to 400). A non-error
/// body under a `create` route maps to 201, anything else to 200.
pub fn infer_status(body: &Value, kind: CrudKind) -> u16 {
    if body.is_null() {
        return 204;
    }

    if let Some(marker) = body.get("error").and_then(Value::as_str) {
        return match marker {
            "Not found" => 404,
            "Unauthorized" => 401,
            "Forbidden" => 403,
            "Bad request" => 400,
            "Unprocessable entity" => 422,
            _ => 400,
        };
    }

    if kind == CrudKind::Create {
        201
    } else {
        200
    }
}
