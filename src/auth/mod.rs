//! Authentication
//!
//! Resolves the calling helpdesk user from a bearer token.

pub mod jwt;

pub use jwt::{Claims, JwtHandler};
