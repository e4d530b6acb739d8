//! Charade: a deterministic, scoped mock HTTP API engine for automated
//! tests.
//!
//! The engine sits behind an HTTP interception layer: tests hand
//! [`MockServer::handle`] a [`FakeRequest`] and get back an [`ApiResponse`].
//! Routes come from a declarative spec (see [`spec::YamlSpecParser`]) or
//! from direct registration, state lives in a per-caller scoped store, and
//! call-counted temporary overrides simulate outages and edge responses
//! without touching the route table.
//!
//! ```no_run
//! use charade_engine::{FakeRequest, MockServer, YamlSpecParser};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let spec = YamlSpecParser::from_file("api.yaml")?;
//! let mut server = MockServer::new();
//! server.boot_from_source(&spec)?;
//!
//! let response = server.handle(
//!     &FakeRequest::new("POST", "/v1/users")
//!         .header("X-User-ID", "user-1")
//!         .json(json!({"name": "Alice"})),
//! );
//! assert_eq!(response.status(), 201);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod faker;
pub mod overrides;
pub mod request;
pub mod response;
pub mod route;
pub mod server;
pub mod spec;
pub mod store;

pub use error::{EngineError, SpecError};
pub use faker::DefinitionFaker;
pub use overrides::OverrideSnapshot;
pub use request::FakeRequest;
pub use response::ApiResponse;
pub use route::{CrudKind, RouteMatch, RouteOperation, RoutePattern, RouteTable};
pub use server::{
    custom_operation_key, nested_resource_key, standard_key, HandlerOutcome, HookEvent,
    MockServer, ANONYMOUS_SCOPE, IDENTITY_HEADER,
};
pub use spec::{OperationSpec, PathSpec, SpecSource, YamlSpecParser};
pub use store::ScopedStore;
