use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;

use scolarite_core::AppError;
use scolarite_core::errors::ErrorResponse;
use scolarite_models::ids::ComplaintId;

use crate::middleware::auth::RequireAdmin;
use crate::modules::complaints::model::{
    Complaint, ComplaintFilterParams, ComplaintTrackingResponse, CreateComplaintDto,
    PaginatedComplaintsResponse, RespondComplaintDto,
};
use crate::modules::complaints::service::ComplaintService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

/// File a complaint about a request
#[utoipa::path(
    post,
    path = "/api/complaints",
    request_body = CreateComplaintDto,
    responses(
        (status = 201, description = "Complaint created", body = Complaint),
        (status = 404, description = "Unknown request reference or email", body = ErrorResponse),
        (status = 409, description = "The request already has a complaint", body = ErrorResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse)
    ),
    tag = "Complaints"
)]
#[instrument(skip(state, dto))]
pub async fn create_complaint(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<CreateComplaintDto>,
) -> Result<(StatusCode, Json<Complaint>), AppError> {
    let complaint = ComplaintService::create_complaint(&state, dto).await?;
    Ok((StatusCode::CREATED, Json(complaint)))
}

/// Track a complaint by reference
#[utoipa::path(
    get,
    path = "/api/complaints/track/{reference}",
    params(
        ("reference" = String, Path, description = "Complaint reference, e.g. RC-2025-001")
    ),
    responses(
        (status = 200, description = "Complaint status", body = ComplaintTrackingResponse),
        (status = 404, description = "Unknown reference", body = ErrorResponse)
    ),
    tag = "Complaints"
)]
#[instrument(skip(state))]
pub async fn track_complaint(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<Json<ComplaintTrackingResponse>, AppError> {
    let tracking = ComplaintService::track_complaint(&state, &reference).await?;
    Ok(Json(tracking))
}

/// List complaints
#[utoipa::path(
    get,
    path = "/api/complaints",
    params(ComplaintFilterParams),
    responses(
        (status = 200, description = "Complaints, newest first", body = PaginatedComplaintsResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse)
    ),
    tag = "Complaints",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _admin))]
pub async fn get_complaints(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Query(filters): Query<ComplaintFilterParams>,
) -> Result<Json<PaginatedComplaintsResponse>, AppError> {
    let complaints = ComplaintService::list_complaints(&state, filters).await?;
    Ok(Json(complaints))
}

/// Get a complaint by ID
#[utoipa::path(
    get,
    path = "/api/complaints/{id}",
    params(
        ("id" = i64, Path, description = "Complaint ID")
    ),
    responses(
        (status = 200, description = "Complaint details", body = Complaint),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "Complaint not found", body = ErrorResponse)
    ),
    tag = "Complaints",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _admin))]
pub async fn get_complaint(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<ComplaintId>,
) -> Result<Json<Complaint>, AppError> {
    let complaint = ComplaintService::get_complaint(&state, id).await?;
    Ok(Json(complaint))
}

/// Respond to a complaint
#[utoipa::path(
    post,
    path = "/api/complaints/{id}/respond",
    params(
        ("id" = i64, Path, description = "Complaint ID")
    ),
    request_body = RespondComplaintDto,
    responses(
        (status = 200, description = "Complaint resolved", body = Complaint),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "Complaint not found", body = ErrorResponse),
        (status = 409, description = "Complaint already resolved", body = ErrorResponse),
        (status = 422, description = "Missing response", body = ErrorResponse),
        (status = 500, description = "Regeneration failed, complaint left pending", body = ErrorResponse)
    ),
    tag = "Complaints",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, admin, dto), fields(admin = %admin.0.email()))]
pub async fn respond_complaint(
    State(state): State<AppState>,
    admin: RequireAdmin,
    Path(id): Path<ComplaintId>,
    ValidatedJson(dto): ValidatedJson<RespondComplaintDto>,
) -> Result<Json<Complaint>, AppError> {
    let complaint = ComplaintService::respond_complaint(&state, id, dto).await?;
    Ok(Json(complaint))
}
