use axum::{extract::Extension, http::HeaderMap, response::Response};
use std::sync::Arc;
use tracing::instrument;

use super::{request_context, respond};
use crate::portier::auth::{flow, AuthState};

#[utoipa::path(
    get,
    path = "/dashboard",
    responses(
        (status = 200, description = "Dashboard for signed-in sessions", body = String, content_type = "text/html"),
        (status = 303, description = "Not signed in, redirect to /sign_in")
    ),
    tag = "sessions"
)]
#[instrument(skip_all)]
pub async fn dashboard(headers: HeaderMap, state: Extension<Arc<AuthState>>) -> Response {
    let ctx = match request_context(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    let outcome = flow::dashboard(&state, &ctx).await;
    respond(&state, &ctx, outcome)
}
