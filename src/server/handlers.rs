use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::error;

use super::AppState;
use crate::error::{AppError, AppResult};
use crate::identity::{FieldErrors, IdentityView, LoginOutcome, Principal, Registered, RequestContext};

pub async fn health() -> &'static str {
    "account ok"
}

/// Unparsable bodies get the same shape as field errors.
fn body_error(rejection: JsonRejection) -> AppError {
    let mut details = FieldErrors::default();
    details.push("body", &rejection.body_text());
    AppError::validation(details)
}

// Argon2 work and store access run off the async workers.
async fn blocking<T, F>(f: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!(target: "account::server", error = %e, "blocking task failed");
        AppError::internal("request processing failed")
    })?
}

fn require_principal(ctx: &RequestContext) -> AppResult<&Principal> {
    ctx.principal().ok_or_else(AppError::unauthorized)
}

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<crate::identity::RegisterPayload>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Registered>)> {
    let Json(payload) = payload.map_err(body_error)?;
    let registry = state.registry.clone();
    let out = blocking(move || registry.register(&payload)).await?;
    Ok((StatusCode::CREATED, Json(out)))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<crate::identity::LoginPayload>, JsonRejection>,
) -> AppResult<Json<LoginOutcome>> {
    let Json(payload) = payload.map_err(body_error)?;
    let registry = state.registry.clone();
    let out = blocking(move || registry.login(&payload)).await?;
    Ok(Json(out))
}

pub async fn me(State(state): State<AppState>, Extension(ctx): Extension<RequestContext>) -> AppResult<Json<IdentityView>> {
    let id = require_principal(&ctx)?.user_id.clone();
    let registry = state.registry.clone();
    Ok(Json(blocking(move || registry.find_by_id(&id)).await?))
}

pub async fn user_by_id(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> AppResult<Json<IdentityView>> {
    require_principal(&ctx)?;
    let registry = state.registry.clone();
    Ok(Json(blocking(move || registry.find_by_id(&id)).await?))
}
