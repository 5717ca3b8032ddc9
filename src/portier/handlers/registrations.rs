use axum::{extract::Extension, http::HeaderMap, response::Response};
use std::sync::Arc;
use tracing::instrument;

use super::{fields, request_context, respond, FormBody};
use crate::portier::auth::{flow, AuthState};

#[utoipa::path(
    get,
    path = "/sign_up",
    responses(
        (status = 200, description = "Sign-up form", body = String, content_type = "text/html"),
        (status = 303, description = "Already signed in, redirect to /dashboard")
    ),
    tag = "registrations"
)]
#[instrument(skip_all)]
pub async fn sign_up_form(headers: HeaderMap, state: Extension<Arc<AuthState>>) -> Response {
    let ctx = match request_context(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    let outcome = flow::sign_up_form(&state, &ctx).await;
    respond(&state, &ctx, outcome)
}

#[utoipa::path(
    post,
    path = "/sign_up",
    request_body(
        content = String,
        content_type = "application/x-www-form-urlencoded",
        description = "Fields: username, password, code, csrf_token"
    ),
    responses(
        (status = 303, description = "Redirect to /sign_in when registered, back to /sign_up otherwise")
    ),
    tag = "registrations"
)]
#[instrument(skip_all)]
pub async fn sign_up(
    headers: HeaderMap,
    state: Extension<Arc<AuthState>>,
    body: FormBody,
) -> Response {
    let ctx = match request_context(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    let outcome = flow::sign_up(&state, &ctx, &fields(body)).await;
    respond(&state, &ctx, outcome)
}
