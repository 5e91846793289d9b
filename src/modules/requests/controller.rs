use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;

use scolarite_core::AppError;
use scolarite_core::errors::ErrorResponse;
use scolarite_models::ids::RequestId;

use crate::middleware::auth::RequireAdmin;
use crate::modules::requests::model::{
    ApproveRequestDto, CreateRequestDto, DocumentRequest, PaginatedRequestsResponse,
    RejectRequestDto, RequestFilterParams, RequestTrackingResponse, SaveDraftDto,
};
use crate::modules::requests::service::RequestService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

/// Submit a document request
#[utoipa::path(
    post,
    path = "/api/requests",
    request_body = CreateRequestDto,
    responses(
        (status = 201, description = "Request created, draft generated", body = DocumentRequest),
        (status = 400, description = "Malformed body", body = ErrorResponse),
        (status = 404, description = "No student matches the email and CIN", body = ErrorResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse),
        (status = 500, description = "Document generation failed", body = ErrorResponse)
    ),
    tag = "Requests"
)]
#[instrument(skip(state, dto))]
pub async fn create_request(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<CreateRequestDto>,
) -> Result<(StatusCode, Json<DocumentRequest>), AppError> {
    let request = RequestService::create_request(&state, dto).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// Track a request by reference
#[utoipa::path(
    get,
    path = "/api/requests/track/{reference}",
    params(
        ("reference" = String, Path, description = "Request reference, e.g. AS-2025-001")
    ),
    responses(
        (status = 200, description = "Request status", body = RequestTrackingResponse),
        (status = 404, description = "Unknown reference", body = ErrorResponse)
    ),
    tag = "Requests"
)]
#[instrument(skip(state))]
pub async fn track_request(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<Json<RequestTrackingResponse>, AppError> {
    let tracking = RequestService::track_request(&state, &reference).await?;
    Ok(Json(tracking))
}

/// List requests
#[utoipa::path(
    get,
    path = "/api/requests",
    params(RequestFilterParams),
    responses(
        (status = 200, description = "Requests, newest first", body = PaginatedRequestsResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse)
    ),
    tag = "Requests",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _admin))]
pub async fn get_requests(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Query(filters): Query<RequestFilterParams>,
) -> Result<Json<PaginatedRequestsResponse>, AppError> {
    let requests = RequestService::list_requests(&state, filters).await?;
    Ok(Json(requests))
}

/// Get a request by ID
#[utoipa::path(
    get,
    path = "/api/requests/{id}",
    params(
        ("id" = i64, Path, description = "Request ID")
    ),
    responses(
        (status = 200, description = "Request details", body = DocumentRequest),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "Request not found", body = ErrorResponse)
    ),
    tag = "Requests",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _admin))]
pub async fn get_request(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<RequestId>,
) -> Result<Json<DocumentRequest>, AppError> {
    let request = RequestService::get_request(&state, id).await?;
    Ok(Json(request))
}

/// Approve a request
#[utoipa::path(
    post,
    path = "/api/requests/{id}/approve",
    params(
        ("id" = i64, Path, description = "Request ID")
    ),
    request_body = ApproveRequestDto,
    responses(
        (status = 200, description = "Request accepted", body = DocumentRequest),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "Request not found", body = ErrorResponse),
        (status = 409, description = "Request was rejected", body = ErrorResponse),
        (status = 500, description = "Document generation failed", body = ErrorResponse)
    ),
    tag = "Requests",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, admin, dto), fields(admin = %admin.0.email()))]
pub async fn approve_request(
    State(state): State<AppState>,
    admin: RequireAdmin,
    Path(id): Path<RequestId>,
    ValidatedJson(dto): ValidatedJson<ApproveRequestDto>,
) -> Result<Json<DocumentRequest>, AppError> {
    let request = RequestService::approve_request(&state, id, dto).await?;
    Ok(Json(request))
}

/// Reject a request
#[utoipa::path(
    post,
    path = "/api/requests/{id}/reject",
    params(
        ("id" = i64, Path, description = "Request ID")
    ),
    request_body = RejectRequestDto,
    responses(
        (status = 200, description = "Request rejected", body = DocumentRequest),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "Request not found", body = ErrorResponse),
        (status = 409, description = "Request was accepted", body = ErrorResponse),
        (status = 422, description = "Missing refusal reason", body = ErrorResponse)
    ),
    tag = "Requests",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, admin, dto), fields(admin = %admin.0.email()))]
pub async fn reject_request(
    State(state): State<AppState>,
    admin: RequireAdmin,
    Path(id): Path<RequestId>,
    ValidatedJson(dto): ValidatedJson<RejectRequestDto>,
) -> Result<Json<DocumentRequest>, AppError> {
    let request = RequestService::reject_request(&state, id, dto).await?;
    Ok(Json(request))
}

/// Edit and regenerate the draft
#[utoipa::path(
    put,
    path = "/api/requests/{id}/draft",
    params(
        ("id" = i64, Path, description = "Request ID")
    ),
    request_body = SaveDraftDto,
    responses(
        (status = 200, description = "Draft regenerated", body = DocumentRequest),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "Request not found", body = ErrorResponse),
        (status = 500, description = "Document generation failed", body = ErrorResponse)
    ),
    tag = "Requests",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, admin, dto), fields(admin = %admin.0.email()))]
pub async fn save_draft(
    State(state): State<AppState>,
    admin: RequireAdmin,
    Path(id): Path<RequestId>,
    ValidatedJson(dto): ValidatedJson<SaveDraftDto>,
) -> Result<Json<DocumentRequest>, AppError> {
    let request = RequestService::save_draft(&state, id, dto).await?;
    Ok(Json(request))
}
