//! API route composition.

mod push;

use crate::state::AppState;
use axum::{Router, routing::post};

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/push_messages_for_all", post(push::push_messages_for_all))
        .route("/v1/batch_push_messages_async", post(push::batch_push_messages_async))
        .route("/v1/push_messages", post(push::push_messages))
        .with_state(state)
}
