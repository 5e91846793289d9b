use anyhow::anyhow;
use std::path::PathBuf;
use tracing::{info, instrument, warn};

use scolarite_core::{AppError, PaginationMeta};
use scolarite_models::complaints::{
    COMPLAINT_REFERENCE_PREFIX, Complaint, ComplaintFilterParams, ComplaintStatus,
    ComplaintTrackingResponse, CreateComplaintDto, NewComplaint, PaginatedComplaintsResponse,
    RespondComplaintDto,
};
use scolarite_models::ids::ComplaintId;
use scolarite_models::requests::{DocumentVariant, RequestStatus};

use crate::metrics::{track_complaint_created, track_complaint_resolved};
use crate::modules::requests::service::{
    allocate_reference, apply_generated, apply_upload, current_year, load_request, load_student,
    regenerate,
};
use crate::state::AppState;
use crate::store::RequestStore;
use crate::utils::notifier::{Notification, NotificationKind, dispatch};

async fn load_complaint(store: &dyn RequestStore, id: ComplaintId) -> Result<Complaint, AppError> {
    store
        .find_complaint(id)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Complaint not found")))
}

pub struct ComplaintService;

impl ComplaintService {
    /// File a complaint against a request. The email must be the one of the
    /// student who owns the request; a mismatch reads as an unknown request.
    #[instrument(skip(state, dto), fields(request_reference = %dto.request_reference))]
    pub async fn create_complaint(
        state: &AppState,
        dto: CreateComplaintDto,
    ) -> Result<Complaint, AppError> {
        let store = state.store.as_ref();

        let request = store
            .find_request_by_reference(dto.request_reference.trim())
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Request not found")))?;
        let student = load_student(store, &request).await?;
        if !student.email.eq_ignore_ascii_case(dto.email.trim()) {
            return Err(AppError::not_found(anyhow!("Request not found")));
        }

        if store.find_complaint_by_request(request.id).await?.is_some() {
            return Err(AppError::conflict(anyhow!(
                "A complaint already exists for request {}",
                request.reference
            )));
        }

        let reference =
            allocate_reference(store, COMPLAINT_REFERENCE_PREFIX, current_year()).await?;

        let complaint = store
            .insert_complaint(NewComplaint {
                reference,
                request_id: request.id,
                reason: dto.reason.trim().to_string(),
                description: dto.description.trim().to_string(),
            })
            .await?;

        track_complaint_created();
        info!(reference = %complaint.reference, "Complaint created");

        dispatch(
            state.notifier.as_ref(),
            Notification::for_complaint(
                NotificationKind::ComplaintReceived,
                &student,
                &request,
                &complaint,
                None,
            ),
        )
        .await;

        Ok(complaint)
    }

    /// Resolve a complaint, optionally regenerating or replacing the linked
    /// request's document first. Regeneration renders the final document of
    /// an accepted request and the draft of any other.
    ///
    /// If the document step fails the complaint stays pending and nothing is
    /// persisted.
    #[instrument(skip(state, dto), fields(regenerate = dto.regenerate))]
    pub async fn respond_complaint(
        state: &AppState,
        id: ComplaintId,
        dto: RespondComplaintDto,
    ) -> Result<Complaint, AppError> {
        let response = dto.response.trim();
        if response.is_empty() {
            return Err(AppError::unprocessable(anyhow!("A response is required")));
        }

        let store = state.store.as_ref();
        let mut complaint = load_complaint(store, id).await?;
        if complaint.status == ComplaintStatus::Resolved {
            return Err(AppError::conflict(anyhow!(
                "Complaint {} is already resolved",
                complaint.reference
            )));
        }

        let mut request = load_request(store, complaint.request_id).await?;
        let student = load_student(store, &request).await?;

        let mut attachment: Option<PathBuf> = None;
        let mut regenerated = false;

        match dto.uploaded_document {
            Some(upload) => {
                attachment = Some(apply_upload(&mut request, &student, &dto.overrides, upload));
                regenerated = true;
            }
            None if dto.regenerate => {
                // Only an accepted request carries a final document.
                let variant = if request.status == RequestStatus::Accepted {
                    DocumentVariant::Final
                } else {
                    DocumentVariant::Draft
                };

                if variant == DocumentVariant::Final && request.document_uploaded {
                    warn!(
                        reference = %request.reference,
                        "Final document was uploaded, skipping regeneration"
                    );
                } else {
                    let generated =
                        regenerate(state, &request, &student, &dto.overrides, variant).await?;
                    apply_generated(&mut request, &generated, variant);
                    if variant == DocumentVariant::Final {
                        attachment = Some(generated.absolute_path);
                    }
                    regenerated = true;
                }
            }
            None => {}
        }

        if regenerated {
            request = store.update_request(&request).await?;
        }

        complaint.status = ComplaintStatus::Resolved;
        complaint.response = Some(response.to_string());
        complaint.regenerated = regenerated;
        let complaint = store.update_complaint(&complaint).await?;

        track_complaint_resolved(regenerated);
        info!(reference = %complaint.reference, regenerated, "Complaint resolved");

        dispatch(
            state.notifier.as_ref(),
            Notification::for_complaint(
                NotificationKind::ComplaintResolved,
                &student,
                &request,
                &complaint,
                attachment,
            ),
        )
        .await;

        Ok(complaint)
    }

    #[instrument(skip(state))]
    pub async fn get_complaint(state: &AppState, id: ComplaintId) -> Result<Complaint, AppError> {
        load_complaint(state.store.as_ref(), id).await
    }

    #[instrument(skip(state))]
    pub async fn track_complaint(
        state: &AppState,
        reference: &str,
    ) -> Result<ComplaintTrackingResponse, AppError> {
        let store = state.store.as_ref();
        let complaint = store
            .find_complaint_by_reference(reference.trim())
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Complaint not found")))?;
        let request = load_request(store, complaint.request_id).await?;

        Ok(ComplaintTrackingResponse {
            reference: complaint.reference,
            request_reference: request.reference,
            status: complaint.status,
            reason: complaint.reason,
            response: complaint.response,
            created_at: complaint.created_at,
            updated_at: complaint.updated_at,
        })
    }

    #[instrument(skip(state))]
    pub async fn list_complaints(
        state: &AppState,
        filters: ComplaintFilterParams,
    ) -> Result<PaginatedComplaintsResponse, AppError> {
        let (data, total) = state.store.list_complaints(&filters).await?;

        Ok(PaginatedComplaintsResponse {
            data,
            meta: PaginationMeta::new(&filters.pagination, total),
        })
    }
}
