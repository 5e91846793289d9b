use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

use super::controller::{
    approve_request, create_request, get_request, get_requests, reject_request, save_draft,
    track_request,
};

pub fn init_requests_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_request).get(get_requests))
        .route("/track/{reference}", get(track_request))
        .route("/{id}", get(get_request))
        .route("/{id}/approve", post(approve_request))
        .route("/{id}/reject", post(reject_request))
        .route("/{id}/draft", put(save_draft))
}
