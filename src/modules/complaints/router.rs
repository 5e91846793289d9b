use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{
    create_complaint, get_complaint, get_complaints, respond_complaint, track_complaint,
};

pub fn init_complaints_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_complaint).get(get_complaints))
        .route("/track/{reference}", get(track_complaint))
        .route("/{id}", get(get_complaint))
        .route("/{id}/respond", post(respond_complaint))
}
