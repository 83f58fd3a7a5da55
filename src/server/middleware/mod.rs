//! HTTP middleware implementations
//!
//! - Request ID tracking
//! - Bearer token authentication into a request context

mod auth;
mod helpers;
mod request_id;

pub use auth::{AuthMiddleware, AuthMiddlewareService, AuthenticatedUser, RequestContext};
pub use helpers::{extract_bearer_token, is_public_route};
pub use request_id::{REQUEST_ID_HEADER, RequestIdMiddleware, RequestIdMiddlewareService};
