use axum::{extract::Extension, http::HeaderMap, response::Response};
use std::sync::Arc;
use tracing::instrument;

use super::{fields, request_context, respond, FormBody};
use crate::portier::auth::{flow, AuthState};

#[utoipa::path(
    get,
    path = "/sign_in",
    responses(
        (status = 200, description = "Sign-in form", body = String, content_type = "text/html"),
        (status = 303, description = "Already signed in, redirect to /dashboard")
    ),
    tag = "sessions"
)]
#[instrument(skip_all)]
pub async fn sign_in_form(headers: HeaderMap, state: Extension<Arc<AuthState>>) -> Response {
    let ctx = match request_context(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    let outcome = flow::sign_in_form(&state, &ctx).await;
    respond(&state, &ctx, outcome)
}

#[utoipa::path(
    post,
    path = "/sign_in",
    request_body(
        content = String,
        content_type = "application/x-www-form-urlencoded",
        description = "Fields: username, password, csrf_token"
    ),
    responses(
        (status = 303, description = "Redirect to /dashboard on success, back to /sign_in otherwise")
    ),
    tag = "sessions"
)]
#[instrument(skip_all)]
pub async fn sign_in(
    headers: HeaderMap,
    state: Extension<Arc<AuthState>>,
    body: FormBody,
) -> Response {
    let mut ctx = match request_context(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    let outcome = flow::sign_in(&state, &mut ctx, &fields(body)).await;
    respond(&state, &ctx, outcome)
}

#[utoipa::path(
    post,
    path = "/sign_out",
    request_body(
        content = String,
        content_type = "application/x-www-form-urlencoded",
        description = "Fields: csrf_token"
    ),
    responses(
        (status = 303, description = "Redirect to /sign_in with a fresh session")
    ),
    tag = "sessions"
)]
#[instrument(skip_all)]
pub async fn sign_out(
    headers: HeaderMap,
    state: Extension<Arc<AuthState>>,
    body: FormBody,
) -> Response {
    let mut ctx = match request_context(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    let outcome = flow::sign_out(&state, &mut ctx, &fields(body)).await;
    respond(&state, &ctx, outcome)
}
