use axum::{extract::Extension, http::HeaderMap, response::Response};
use std::sync::Arc;
use tracing::instrument;

use super::{request_context, respond};
use crate::portier::auth::{flow, AuthState};

// Not part of the OpenAPI document; `/` only redirects.
#[instrument(skip_all)]
pub async fn root(headers: HeaderMap, state: Extension<Arc<AuthState>>) -> Response {
    let ctx = match request_context(&state, &headers).await {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    let outcome = flow::root(&state, &ctx).await;
    respond(&state, &ctx, outcome)
}
