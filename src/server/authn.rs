//! Request authentication and route-policy middleware.
//!
//! `authenticate` never rejects: a missing, malformed, tampered or expired token
//! simply leaves the request without a principal. `authorize` then applies the
//! route policy and produces the single 401 shape for protected routes.

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use super::AppState;
use crate::error::AppError;
use crate::identity::{Principal, RequestContext};

/// Extract the token from `Authorization: Bearer <token>`. Scheme is case-insensitive.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let raw = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = raw.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") { return None; }
    let token = token.trim();
    if token.is_empty() { None } else { Some(token) }
}

pub async fn authenticate(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let mut ctx = req
        .extensions_mut()
        .remove::<RequestContext>()
        .unwrap_or_else(|| RequestContext::with_request_id(uuid::Uuid::new_v4().to_string()));
    let request_id = ctx.request_id.clone().unwrap_or_default();

    if let Some(token) = bearer_token(req.headers()) {
        match state.codec.verify(token) {
            Ok(claims) => {
                let user_id = claims.sub.clone();
                if ctx.attach(Principal::from(claims)) {
                    debug!(target: "account::authn", request_id = %request_id, user_id = %user_id, "bearer token accepted");
                } else {
                    debug!(target: "account::authn", request_id = %request_id, "identity already attached; token ignored");
                }
            }
            Err(e) => {
                debug!(target: "account::authn", request_id = %request_id, kind = e.kind(), "bearer token rejected");
            }
        }
    }

    req.extensions_mut().insert(ctx);
    next.run(req).await
}

pub async fn authorize(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if state.policy.requires_auth_for(req.method(), req.uri().path()) {
        let authed = req.extensions().get::<RequestContext>().map(|c| c.is_authenticated()).unwrap_or(false);
        if !authed {
            debug!(target: "account::authn", path = %req.uri().path(), "protected route without identity");
            return AppError::unauthorized().into_response();
        }
    }
    next.run(req).await
}
