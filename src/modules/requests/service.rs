use anyhow::anyhow;
use chrono::{Datelike, Local};
use std::path::PathBuf;
use tracing::{info, instrument, warn};

use scolarite_core::{AppError, PaginationMeta};
use scolarite_models::details::{DetailFields, DetailSet};
use scolarite_models::ids::RequestId;
use scolarite_models::requests::{
    ApproveRequestDto, CreateRequestDto, DocumentRequest, DocumentVariant, NewRequest,
    PaginatedRequestsResponse, RejectRequestDto, RequestFilterParams, RequestStatus,
    RequestTrackingResponse, SaveDraftDto, UploadedDocument,
};
use scolarite_models::students::Student;

use crate::metrics::track_request_transition;
use crate::modules::documents::{GenerateDocument, GeneratedDocument, merger};
use crate::state::AppState;
use crate::store::{RequestStore, StoreError};
use crate::utils::notifier::{Notification, NotificationKind, dispatch};

/// `{prefix}-{year}-{seq:03}`
pub fn format_reference(prefix: &str, year: i32, sequence: i64) -> String {
    format!("{}-{}-{:03}", prefix, year, sequence)
}

/// Reserve the next reference for `prefix` in `year`.
pub async fn allocate_reference(
    store: &dyn RequestStore,
    prefix: &str,
    year: i32,
) -> Result<String, StoreError> {
    let sequence = store.next_sequence(prefix, year).await?;
    Ok(format_reference(prefix, year, sequence))
}

pub(crate) fn current_year() -> i32 {
    Local::now().year()
}

pub(crate) async fn load_request(
    store: &dyn RequestStore,
    id: RequestId,
) -> Result<DocumentRequest, AppError> {
    store
        .find_request(id)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Request not found")))
}

pub(crate) async fn load_student(
    store: &dyn RequestStore,
    request: &DocumentRequest,
) -> Result<Student, AppError> {
    store
        .find_student(request.student_id)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Student not found")))
}

fn ensure_transition(request: &DocumentRequest, next: RequestStatus) -> Result<(), AppError> {
    if request.status.can_transition_to(next) {
        return Ok(());
    }
    Err(AppError::conflict(anyhow!(
        "Request {} is {} and cannot become {}",
        request.reference,
        request.status,
        next
    )))
}

/// Render `request`'s document from its stored details with `overrides`
/// applied on top.
pub(crate) async fn regenerate(
    state: &AppState,
    request: &DocumentRequest,
    student: &Student,
    overrides: &DetailFields,
    variant: DocumentVariant,
) -> Result<GeneratedDocument, AppError> {
    let details = merger::overlay(student, &request.specific_details, overrides);
    let generated = state
        .documents
        .generate_document(GenerateDocument {
            document_type: request.document_type,
            student,
            details,
            reference: &request.reference,
            variant,
        })
        .await?;
    Ok(generated)
}

/// Stored details with `overrides` merged in, without rendering.
pub(crate) fn merged_details(
    request: &DocumentRequest,
    student: &Student,
    overrides: &DetailFields,
) -> DetailSet {
    let incoming = merger::overlay(student, &request.specific_details, overrides);
    merger::merge(request.document_type, student, &incoming)
}

/// Make `upload` the final document of `request`. Returns the file to attach.
pub(crate) fn apply_upload(
    request: &mut DocumentRequest,
    student: &Student,
    overrides: &DetailFields,
    upload: UploadedDocument,
) -> PathBuf {
    let details = merged_details(request, student, overrides);
    request.specific_details = details.clone();
    request.template_data = Some(details);
    request.document_path = Some(upload.public_path);
    request.document_uploaded = true;
    PathBuf::from(upload.absolute_path)
}

/// Record a rendered document on `request`.
pub(crate) fn apply_generated(
    request: &mut DocumentRequest,
    generated: &GeneratedDocument,
    variant: DocumentVariant,
) {
    request.specific_details = generated.details.clone();
    request.template_data = Some(generated.details.clone());
    match variant {
        DocumentVariant::Draft => {
            request.generated_document_path = Some(generated.public_path.clone())
        }
        DocumentVariant::Final => request.document_path = Some(generated.public_path.clone()),
    }
}

pub struct RequestService;

impl RequestService {
    #[instrument(skip(state, dto), fields(document_type = %dto.document_type))]
    pub async fn create_request(
        state: &AppState,
        dto: CreateRequestDto,
    ) -> Result<DocumentRequest, AppError> {
        let store = state.store.as_ref();

        let student = store
            .find_student_by_email(&dto.email)
            .await?
            .filter(|student| student.matches_cin(&dto.cin))
            .ok_or_else(|| AppError::not_found(anyhow!("No student matches this email and CIN")))?;

        let reference = allocate_reference(
            store,
            dto.document_type.reference_prefix(),
            current_year(),
        )
        .await?;

        let generated = state
            .documents
            .generate_document(GenerateDocument {
                document_type: dto.document_type,
                student: &student,
                details: dto.details,
                reference: &reference,
                variant: DocumentVariant::Draft,
            })
            .await?;

        let request = store
            .insert_request(NewRequest {
                reference,
                student_id: student.id,
                document_type: dto.document_type,
                specific_details: generated.details.clone(),
                template_data: Some(generated.details),
                generated_document_path: Some(generated.public_path),
            })
            .await?;

        track_request_transition(request.status.as_str());
        info!(reference = %request.reference, "Request created");

        dispatch(
            state.notifier.as_ref(),
            Notification::for_request(NotificationKind::RequestReceived, &student, &request, None),
        )
        .await;

        Ok(request)
    }

    /// Accept a request and produce its final document.
    ///
    /// An uploaded file replaces generation. Without one, the final document
    /// is generated unless an earlier upload already supplied it; overrides
    /// are then merged into the stored details only. The status changes only
    /// after the document is in place.
    #[instrument(skip(state, dto))]
    pub async fn approve_request(
        state: &AppState,
        id: RequestId,
        dto: ApproveRequestDto,
    ) -> Result<DocumentRequest, AppError> {
        let store = state.store.as_ref();
        let mut request = load_request(store, id).await?;
        ensure_transition(&request, RequestStatus::Accepted)?;
        let student = load_student(store, &request).await?;

        let attachment: Option<PathBuf> = match dto.uploaded_document {
            Some(upload) => Some(apply_upload(&mut request, &student, &dto.overrides, upload)),
            None if request.document_uploaded => {
                warn!(
                    reference = %request.reference,
                    "Final document was uploaded, skipping generation"
                );
                if !dto.overrides.is_empty() {
                    request.specific_details = merged_details(&request, &student, &dto.overrides);
                }
                None
            }
            None => {
                let generated = regenerate(
                    state,
                    &request,
                    &student,
                    &dto.overrides,
                    DocumentVariant::Final,
                )
                .await?;
                apply_generated(&mut request, &generated, DocumentVariant::Final);
                Some(generated.absolute_path)
            }
        };

        request.status = RequestStatus::Accepted;
        request.refusal_reason = None;
        let request = store.update_request(&request).await?;

        track_request_transition(request.status.as_str());
        info!(reference = %request.reference, "Request accepted");

        dispatch(
            state.notifier.as_ref(),
            Notification::for_request(
                NotificationKind::RequestAccepted,
                &student,
                &request,
                attachment,
            ),
        )
        .await;

        Ok(request)
    }

    /// Refuse a request. The reason is checked before anything is loaded or
    /// rendered; overrides regenerate the draft.
    #[instrument(skip(state, dto))]
    pub async fn reject_request(
        state: &AppState,
        id: RequestId,
        dto: RejectRequestDto,
    ) -> Result<DocumentRequest, AppError> {
        let reason = dto
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|reason| !reason.is_empty())
            .ok_or_else(|| AppError::unprocessable(anyhow!("A refusal reason is required")))?
            .to_string();

        let store = state.store.as_ref();
        let mut request = load_request(store, id).await?;
        ensure_transition(&request, RequestStatus::Rejected)?;
        let student = load_student(store, &request).await?;

        if !dto.overrides.is_empty() {
            let generated = regenerate(
                state,
                &request,
                &student,
                &dto.overrides,
                DocumentVariant::Draft,
            )
            .await?;
            apply_generated(&mut request, &generated, DocumentVariant::Draft);
        }

        request.status = RequestStatus::Rejected;
        request.refusal_reason = Some(reason);
        let request = store.update_request(&request).await?;

        track_request_transition(request.status.as_str());
        info!(reference = %request.reference, "Request rejected");

        dispatch(
            state.notifier.as_ref(),
            Notification::for_request(NotificationKind::RequestRejected, &student, &request, None),
        )
        .await;

        Ok(request)
    }

    /// Apply overrides to the stored details and regenerate the draft.
    /// Allowed in every state; the status is left unchanged.
    #[instrument(skip(state, dto))]
    pub async fn save_draft(
        state: &AppState,
        id: RequestId,
        dto: SaveDraftDto,
    ) -> Result<DocumentRequest, AppError> {
        let store = state.store.as_ref();
        let mut request = load_request(store, id).await?;
        let student = load_student(store, &request).await?;

        let generated = regenerate(
            state,
            &request,
            &student,
            &dto.overrides,
            DocumentVariant::Draft,
        )
        .await?;
        apply_generated(&mut request, &generated, DocumentVariant::Draft);

        let request = store.update_request(&request).await?;
        info!(reference = %request.reference, "Draft saved");

        Ok(request)
    }

    #[instrument(skip(state))]
    pub async fn get_request(state: &AppState, id: RequestId) -> Result<DocumentRequest, AppError> {
        load_request(state.store.as_ref(), id).await
    }

    #[instrument(skip(state))]
    pub async fn track_request(
        state: &AppState,
        reference: &str,
    ) -> Result<RequestTrackingResponse, AppError> {
        let request = state
            .store
            .find_request_by_reference(reference.trim())
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Request not found")))?;

        Ok(RequestTrackingResponse::from(&request))
    }

    #[instrument(skip(state))]
    pub async fn list_requests(
        state: &AppState,
        filters: RequestFilterParams,
    ) -> Result<PaginatedRequestsResponse, AppError> {
        let (data, total) = state.store.list_requests(&filters).await?;

        Ok(PaginatedRequestsResponse {
            data,
            meta: PaginationMeta::new(&filters.pagination, total),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use scolarite_models::details::{DetailSet, DocumentType, SchoolCertificateDetails};
    use scolarite_models::ids::StudentId;

    #[test]
    fn test_format_reference_pads_sequence() {
        assert_eq!(format_reference("AS", 2025, 3), "AS-2025-003");
        assert_eq!(format_reference("RC", 2025, 1234), "RC-2025-1234");
    }

    #[tokio::test]
    async fn test_reference_follows_existing_rows() {
        let store = MemoryStore::new();
        for reference in ["AS-2025-001", "AS-2025-002"] {
            store
                .insert_request(NewRequest {
                    reference: reference.to_string(),
                    student_id: StudentId::new(1),
                    document_type: DocumentType::SchoolCertificate,
                    specific_details: DetailSet::SchoolCertificate(
                        SchoolCertificateDetails::default(),
                    ),
                    template_data: None,
                    generated_document_path: None,
                })
                .await
                .unwrap();
        }

        let reference = allocate_reference(&store, "AS", 2025).await.unwrap();
        assert_eq!(reference, "AS-2025-003");
    }
}
