//! Handler registry keys and handler outcome types.
//!
//! Custom handlers are registered under synthetic string keys derived from
//! the request method, collection, operation or route template. The key
//! builders here are public so callers can register handlers without
//! spelling the naming convention by hand.

use crate::request::FakeRequest;
use crate::response::ApiResponse;
use crate::route::{CrudKind, RouteMatch};
use serde_json::Value;

/// What a handler hands back to the dispatcher.
pub enum HandlerOutcome {
    /// A raw value. The status is inferred: `null` maps to 204, recognized
    /// error markers to their 4xx code, create routes to 201, the rest
    /// to 200. The body passes through the response formatter.
    Raw(Value),
    /// An explicit status and headers. The body still passes through the
    /// response formatter.
    Response(ApiResponse),
    /// A finalized response, returned unchanged.
    Final(ApiResponse),
}

impl From<Value> for HandlerOutcome {
    fn from(value: Value) -> Self {
        HandlerOutcome::Raw(value)
    }
}

impl From<ApiResponse> for HandlerOutcome {
    fn from(response: ApiResponse) -> Self {
        HandlerOutcome::Response(response)
    }
}

pub type Handler = Box<dyn Fn(&RouteMatch, &FakeRequest) -> HandlerOutcome + Send + Sync>;

/// Key for a nested-resource handler, e.g. `getUsersResourceProfile` for
/// `GET /users/{resource}/profile`.
pub fn nested_resource_key(method: &str, collection: &str, operation: &str) -> String {
    format!(
        "{}{}Resource{}",
        method.to_lowercase(),
        pascal_case(collection),
        pascal_case(operation)
    )
}

/// Key for a custom-operation handler, e.g. `handleProfile`.
pub fn custom_operation_key(operation: &str) -> String {
    format!("handle{}", pascal_case(operation))
}

/// Key for a standard-path handler built from the route template, e.g.
/// `getV1UsersList` for `GET /v1/users` bound to the `list` kind.
pub fn standard_key(method: &str, template: &str, kind: CrudKind) -> String {
    format!(
        "{}{}{}",
        method.to_lowercase(),
        pascal_case_path(template),
        pascal_case(kind.as_str())
    )
}

/// `profile-settings` and `profile_settings` both become `ProfileSettings`.
fn pascal_case(input: &str) -> String {
    input
        .split(['-', '_'])
        .filter(|part| !part.is_empty())
        .map(capitalize)
        .collect()
}

/// `/v1/users/{id}` becomes `V1UsersId`.
fn pascal_case_path(path: &str) -> String {
    path.split('/')
        .map(|segment| segment.trim_matches(['{', '}']))
        .filter(|segment| !segment.is_empty())
        .map(|segment| pascal_case(segment))
        .collect()
}

fn capitalize(input: &str) -> String {
    let mut chars = input.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
