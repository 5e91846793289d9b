use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use scolarite_core::errors::ErrorResponse;
use scolarite_core::pagination::{PaginationMeta, PaginationParams};
use scolarite_models::complaints::{
    Complaint, ComplaintStatus, ComplaintTrackingResponse, CreateComplaintDto,
    PaginatedComplaintsResponse, RespondComplaintDto,
};
use scolarite_models::details::{
    DetailSet, DocumentType, InternshipDetails, SchoolCertificateDetails,
    SuccessCertificateDetails, TranscriptDetails,
};
use scolarite_models::requests::{
    ApproveRequestDto, CreateRequestDto, DocumentRequest, PaginatedRequestsResponse,
    RejectRequestDto, RequestStatus, RequestTrackingResponse, SaveDraftDto, UploadedDocument,
};
use scolarite_models::transcripts::ModuleGrade;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::requests::controller::create_request,
        crate::modules::requests::controller::track_request,
        crate::modules::requests::controller::get_requests,
        crate::modules::requests::controller::get_request,
        crate::modules::requests::controller::approve_request,
        crate::modules::requests::controller::reject_request,
        crate::modules::requests::controller::save_draft,
        crate::modules::complaints::controller::create_complaint,
        crate::modules::complaints::controller::track_complaint,
        crate::modules::complaints::controller::get_complaints,
        crate::modules::complaints::controller::get_complaint,
        crate::modules::complaints::controller::respond_complaint,
    ),
    components(
        schemas(
            DocumentRequest,
            RequestStatus,
            DocumentType,
            DetailSet,
            SchoolCertificateDetails,
            SuccessCertificateDetails,
            TranscriptDetails,
            InternshipDetails,
            ModuleGrade,
            CreateRequestDto,
            ApproveRequestDto,
            RejectRequestDto,
            SaveDraftDto,
            UploadedDocument,
            RequestTrackingResponse,
            PaginatedRequestsResponse,
            Complaint,
            ComplaintStatus,
            CreateComplaintDto,
            RespondComplaintDto,
            ComplaintTrackingResponse,
            PaginatedComplaintsResponse,
            PaginationMeta,
            PaginationParams,
            ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Requests", description = "Document requests and their review"),
        (name = "Complaints", description = "Complaints about issued documents")
    ),
    info(
        title = "Scolarite API",
        version = "0.1.0",
        description = "Student services: document requests, generated certificates and transcripts, complaints.",
        contact(
            name = "Service de la scolarité",
            email = "scolarite@universite.ma"
        )
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}
