//! Document request models and DTOs.

use chrono::{DateTime, Utc};
use scolarite_core::pagination::{PaginationMeta, PaginationParams};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::details::{DetailFields, DetailSet, DocumentType};
use crate::ids::{RequestId, StudentId};

/// Review status of a request. Exactly one at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum RequestStatus {
    #[serde(rename = "En attente")]
    Pending,
    #[serde(rename = "Accepté")]
    Accepted,
    #[serde(rename = "Refusé")]
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "En attente",
            RequestStatus::Accepted => "Accepté",
            RequestStatus::Rejected => "Refusé",
        }
    }

    /// Whether an admin action may move a request from `self` to `next`.
    ///
    /// Pending requests can be accepted or rejected. An accepted request can
    /// be re-issued and a rejected one can have its reason updated, but a
    /// decision is never flipped.
    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        matches!(
            (self, next),
            (RequestStatus::Pending, RequestStatus::Accepted)
                | (RequestStatus::Pending, RequestStatus::Rejected)
                | (RequestStatus::Accepted, RequestStatus::Accepted)
                | (RequestStatus::Rejected, RequestStatus::Rejected)
        )
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "En attente" => Ok(RequestStatus::Pending),
            "Accepté" => Ok(RequestStatus::Accepted),
            "Refusé" => Ok(RequestStatus::Rejected),
            other => Err(format!("Unknown request status: {}", other)),
        }
    }
}

/// Which file a generation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DocumentVariant {
    Draft,
    Final,
}

impl DocumentVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentVariant::Draft => "draft",
            DocumentVariant::Final => "final",
        }
    }
}

impl fmt::Display for DocumentVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DocumentRequest {
    pub id: RequestId,
    pub reference: String,
    pub student_id: StudentId,
    pub document_type: DocumentType,
    pub status: RequestStatus,
    /// Merged detail snapshot
    pub specific_details: DetailSet,
    /// Details of the last issued document, rendered or uploaded
    pub template_data: Option<DetailSet>,
    /// Public path of the draft
    pub generated_document_path: Option<String>,
    /// Public path of the final document
    pub document_path: Option<String>,
    /// The final document was supplied by an admin upload
    pub document_uploaded: bool,
    pub refusal_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row data for inserting a request.
#[derive(Debug, Clone)]
pub struct NewRequest {
    pub reference: String,
    pub student_id: StudentId,
    pub document_type: DocumentType,
    pub specific_details: DetailSet,
    pub template_data: Option<DetailSet>,
    pub generated_document_path: Option<String>,
}

/// A file already accepted by the upload intake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema, Validate)]
pub struct UploadedDocument {
    #[validate(length(min = 1))]
    pub absolute_path: String,
    #[validate(length(min = 1))]
    pub public_path: String,
}

/// Public submission form.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateRequestDto {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 20))]
    pub cin: String,
    pub document_type: DocumentType,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub details: DetailFields,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema, Validate)]
pub struct ApproveRequestDto {
    #[serde(default)]
    #[schema(value_type = Object)]
    pub overrides: DetailFields,
    #[validate(nested)]
    pub uploaded_document: Option<UploadedDocument>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema, Validate)]
pub struct RejectRequestDto {
    /// Required; checked before any document is touched.
    #[validate(length(max = 2000))]
    pub reason: Option<String>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub overrides: DetailFields,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema, Validate)]
pub struct SaveDraftDto {
    #[serde(default)]
    #[schema(value_type = Object)]
    pub overrides: DetailFields,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
pub struct RequestFilterParams {
    pub status: Option<RequestStatus>,
    pub document_type: Option<DocumentType>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedRequestsResponse {
    pub data: Vec<DocumentRequest>,
    pub meta: PaginationMeta,
}

/// What a student sees when tracking a reference.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RequestTrackingResponse {
    pub reference: String,
    pub document_type: DocumentType,
    pub status: RequestStatus,
    pub refusal_reason: Option<String>,
    /// Only exposed once the request is accepted
    pub document_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&DocumentRequest> for RequestTrackingResponse {
    fn from(request: &DocumentRequest) -> Self {
        Self {
            reference: request.reference.clone(),
            document_type: request.document_type,
            status: request.status,
            refusal_reason: request.refusal_reason.clone(),
            document_path: match request.status {
                RequestStatus::Accepted => request.document_path.clone(),
                _ => None,
            },
            created_at: request.created_at,
            updated_at: request.updated_at,
        }
    }
}
