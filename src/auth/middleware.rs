//! Axum adapters for the authorization gate
//!
//! Middleware resolves the caller once and stores it in the request
//! extensions; [`CurrentUser`] picks it up from there, or resolves the
//! bearer token itself on routes without a gate layer.

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::auth::gate::{require_role, Gate, RoleGuard};
use crate::auth::models::{User, UserRole};

/// Raw `Authorization` header value, if it is valid text
pub fn authorization_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok())
}

/// The authenticated caller
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    Gate: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }

        let gate = Gate::from_ref(state);
        let user = gate
            .require_authenticated(authorization_header(&parts.headers))
            .await?
            .into_result()?;
        Ok(CurrentUser(user))
    }
}

/// Middleware for requiring authentication
pub async fn require_auth(
    State(gate): State<Gate>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = authorization_header(req.headers()).map(str::to_owned);
    let user = gate
        .require_authenticated(header.as_deref())
        .await?
        .into_result()?;

    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}

/// Gate plus the roles a route admits; the state of [`require_role_layer`]
#[derive(Clone)]
pub struct RoleGate {
    gate: Gate,
    guard: Arc<RoleGuard>,
}

impl RoleGate {
    pub fn new(gate: Gate, roles: impl IntoIterator<Item = UserRole>) -> Self {
        Self {
            gate,
            guard: Arc::new(require_role(roles)),
        }
    }

    pub fn allowed(&self) -> &[UserRole] {
        self.guard.allowed()
    }
}

/// Middleware for requiring one of a set of roles
pub async fn require_role_layer(
    State(role_gate): State<RoleGate>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = authorization_header(req.headers()).map(str::to_owned);
    let user = role_gate
        .gate
        .authorize(header.as_deref(), role_gate.guard.as_ref(), &())
        .await?
        .into_result()?;

    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}
