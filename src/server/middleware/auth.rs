//! Authentication middleware

use crate::server::AppState;
use crate::server::middleware::helpers::{extract_bearer_token, is_public_route};
use crate::utils::error::WebhookError;
use actix_web::dev::{Payload, Service, ServiceRequest, ServiceResponse, Transform, forward_ready};
use actix_web::{FromRequest, HttpMessage, HttpRequest, web};
use futures::future::{Ready, ready};
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, warn};

/// Per-request caller information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Helpdesk user behind a valid bearer token
    pub user_id: Option<i32>,
}

/// Auth middleware for Actix-web
///
/// Resolves the bearer token into a [`RequestContext`]. It never rejects a
/// request itself; handlers that need a caller take [`AuthenticatedUser`].
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService { service }))
    }
}

/// Service implementation for auth middleware
pub struct AuthMiddlewareService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if is_public_route(req.path()) {
            return Box::pin(self.service.call(req));
        }

        let user_id = match (
            extract_bearer_token(req.headers()),
            req.app_data::<web::Data<AppState>>(),
        ) {
            (Some(token), Some(state)) => match state.jwt.verify_token(&token) {
                Ok(claims) => {
                    debug!("JWT validated for user {}", claims.sub);
                    Some(claims.sub)
                }
                Err(e) => {
                    warn!("JWT validation error: {}", e);
                    None
                }
            },
            (None, _) => {
                debug!("No bearer token on {}", req.path());
                None
            }
            (Some(_), None) => {
                warn!("Application state missing, cannot verify bearer token");
                None
            }
        };

        req.extensions_mut().insert(RequestContext { user_id });

        Box::pin(self.service.call(req))
    }
}

/// Extractor for handlers that require a signed-in caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: i32,
}

impl FromRequest for AuthenticatedUser {
    type Error = WebhookError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let user_id = req
            .extensions()
            .get::<RequestContext>()
            .and_then(|ctx| ctx.user_id);

        ready(match user_id {
            Some(user_id) => Ok(AuthenticatedUser { user_id }),
            None => Err(WebhookError::unauthorized("Authentication required")),
        })
    }
}
