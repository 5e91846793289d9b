//! Complaint models and DTOs.
//!
//! A complaint is tied to exactly one request. Complaint references use the
//! `RC` prefix and their own per-year sequence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use scolarite_core::pagination::{PaginationMeta, PaginationParams};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::details::DetailFields;
use crate::ids::{ComplaintId, RequestId};
use crate::requests::UploadedDocument;

/// Reference prefix of complaints.
pub const COMPLAINT_REFERENCE_PREFIX: &str = "RC";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum ComplaintStatus {
    #[serde(rename = "En attente")]
    Pending,
    #[serde(rename = "Résolue")]
    Resolved,
}

impl ComplaintStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplaintStatus::Pending => "En attente",
            ComplaintStatus::Resolved => "Résolue",
        }
    }
}

impl fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComplaintStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "En attente" => Ok(ComplaintStatus::Pending),
            "Résolue" => Ok(ComplaintStatus::Resolved),
            other => Err(format!("Unknown complaint status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Complaint {
    pub id: ComplaintId,
    pub reference: String,
    pub request_id: RequestId,
    pub status: ComplaintStatus,
    pub reason: String,
    pub description: String,
    pub response: Option<String>,
    /// The linked request's final document was regenerated or replaced
    /// while responding.
    pub regenerated: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row data for inserting a complaint.
#[derive(Debug, Clone)]
pub struct NewComplaint {
    pub reference: String,
    pub request_id: RequestId,
    pub reason: String,
    pub description: String,
}

/// Public complaint form. The email must match the student who owns the
/// referenced request.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateComplaintDto {
    #[validate(length(min = 1, max = 32))]
    pub request_reference: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 200))]
    pub reason: String,
    #[validate(length(min = 1, max = 5000))]
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema, Validate)]
pub struct RespondComplaintDto {
    #[validate(length(min = 1, max = 5000))]
    pub response: String,
    /// Regenerate the linked request's final document
    #[serde(default)]
    pub regenerate: bool,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub overrides: DetailFields,
    #[validate(nested)]
    pub uploaded_document: Option<UploadedDocument>,
}

impl RespondComplaintDto {
    /// Whether responding touches the linked request's document.
    pub fn touches_document(&self) -> bool {
        self.regenerate || self.uploaded_document.is_some()
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
pub struct ComplaintFilterParams {
    pub status: Option<ComplaintStatus>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedComplaintsResponse {
    pub data: Vec<Complaint>,
    pub meta: PaginationMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ComplaintTrackingResponse {
    pub reference: String,
    pub request_reference: String,
    pub status: ComplaintStatus,
    pub reason: String,
    pub response: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_wire_values() {
        assert_eq!(
            serde_json::to_value(ComplaintStatus::Resolved).unwrap(),
            json!("Résolue")
        );
        assert_eq!(
            "En attente".parse::<ComplaintStatus>().unwrap(),
            ComplaintStatus::Pending
        );
    }

    #[test]
    fn test_respond_dto_requires_response() {
        let dto: RespondComplaintDto =
            serde_json::from_value(json!({ "response": "", "regenerate": true })).unwrap();
        assert!(dto.validate().is_err());
        assert!(dto.touches_document());
    }

    #[test]
    fn test_create_dto_validation() {
        let dto = CreateComplaintDto {
            request_reference: "RN-2025-001".to_string(),
            email: "amal@etu.ma".to_string(),
            reason: "Note erronée".to_string(),
            description: "La note du module BD est incorrecte".to_string(),
        };
        assert!(dto.validate().is_ok());
    }
}
