//! # Scolarite Models
//!
//! Domain models and DTOs for the Scolarite API.
//!
//! # Modules
//!
//! - [`complaints`]: Complaints filed against a document request
//! - [`details`]: Document types and their typed detail sets
//! - [`ids`]: Strongly-typed integer identifiers
//! - [`requests`]: Document requests, lifecycle status and admin DTOs
//! - [`students`]: Student records
//! - [`transcripts`]: Nested transcript (parcours) records
//!
//! # Example
//!
//! ```ignore
//! use scolarite_models::details::{DetailSet, DocumentType};
//! use scolarite_models::requests::RequestStatus;
//!
//! assert_eq!(DocumentType::SchoolCertificate.reference_prefix(), "AS");
//! assert_eq!(RequestStatus::Accepted.as_str(), "Accepté");
//! ```

pub mod complaints;
pub mod details;
pub mod ids;
pub mod requests;
pub mod students;
pub mod transcripts;

// Re-export commonly used types at crate root for convenience
pub use complaints::{
    COMPLAINT_REFERENCE_PREFIX, Complaint, ComplaintFilterParams, ComplaintStatus,
    ComplaintTrackingResponse, CreateComplaintDto, NewComplaint, PaginatedComplaintsResponse,
    RespondComplaintDto,
};
pub use details::{
    DetailFields, DetailSet, DocumentType, InternshipDetails, SchoolCertificateDetails,
    SuccessCertificateDetails, TranscriptDetails,
};
pub use ids::{ComplaintId, RequestId, StudentId};
pub use requests::{
    ApproveRequestDto, CreateRequestDto, DocumentRequest, DocumentVariant, NewRequest,
    PaginatedRequestsResponse, RejectRequestDto, RequestFilterParams, RequestStatus,
    RequestTrackingResponse, SaveDraftDto, UploadedDocument,
};
pub use students::{NewStudent, Student};
pub use transcripts::{AcademicYear, ModuleGrade, Semester, SemesterResult, Transcript};
