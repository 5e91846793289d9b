use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use scolarite_models::complaints::{Complaint, ComplaintFilterParams, ComplaintStatus, NewComplaint};
use scolarite_models::ids::{ComplaintId, RequestId, StudentId};
use scolarite_models::requests::{DocumentRequest, NewRequest, RequestFilterParams, RequestStatus};
use scolarite_models::students::{NewStudent, Student};

use super::{RequestStore, StoreError, StoreFuture};

#[derive(Default)]
struct State {
    students: BTreeMap<i64, Student>,
    requests: BTreeMap<i64, DocumentRequest>,
    complaints: BTreeMap<i64, Complaint>,
    sequences: HashMap<(String, i32), i64>,
    last_id: i64,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

/// In-process store. Every operation takes a single lock, so sequence
/// reservation is atomic as in the database.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn page<T: Clone>(rows: Vec<&T>, offset: i64, limit: i64) -> Vec<T> {
    rows.into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .cloned()
        .collect()
}

impl RequestStore for MemoryStore {
    fn insert_student(&self, student: NewStudent) -> StoreFuture<'_, Student> {
        Box::pin(async move {
            let mut state = self.lock();
            if state
                .students
                .values()
                .any(|s| s.email.eq_ignore_ascii_case(&student.email))
            {
                return Err(StoreError::Conflict(format!(
                    "A student with email {} already exists",
                    student.email
                )));
            }
            let id = state.next_id();
            let student = student.into_student(StudentId::new(id));
            state.students.insert(id, student.clone());
            Ok(student)
        })
    }

    fn find_student(&self, id: StudentId) -> StoreFuture<'_, Option<Student>> {
        Box::pin(async move { Ok(self.lock().students.get(&id.into_inner()).cloned()) })
    }

    fn find_student_by_email<'a>(&'a self, email: &'a str) -> StoreFuture<'a, Option<Student>> {
        Box::pin(async move {
            let email = email.trim();
            Ok(self
                .lock()
                .students
                .values()
                .find(|s| s.email.eq_ignore_ascii_case(email))
                .cloned())
        })
    }

    fn next_sequence<'a>(&'a self, prefix: &'a str, year: i32) -> StoreFuture<'a, i64> {
        Box::pin(async move {
            let mut state = self.lock();
            let key = (prefix.to_string(), year);

            let next = match state.sequences.get(&key) {
                Some(last) => last + 1,
                None => {
                    let pattern = format!("{}-{}-", prefix, year);
                    let existing = state
                        .requests
                        .values()
                        .map(|r| &r.reference)
                        .chain(state.complaints.values().map(|c| &c.reference))
                        .filter(|reference| reference.starts_with(&pattern))
                        .count() as i64;
                    existing + 1
                }
            };

            state.sequences.insert(key, next);
            Ok(next)
        })
    }

    fn insert_request(&self, request: NewRequest) -> StoreFuture<'_, DocumentRequest> {
        Box::pin(async move {
            let mut state = self.lock();
            if state
                .requests
                .values()
                .any(|r| r.reference == request.reference)
            {
                return Err(StoreError::Conflict(format!(
                    "Reference {} already exists",
                    request.reference
                )));
            }

            let id = state.next_id();
            let now = Utc::now();
            let row = DocumentRequest {
                id: RequestId::new(id),
                reference: request.reference,
                student_id: request.student_id,
                document_type: request.document_type,
                status: RequestStatus::Pending,
                specific_details: request.specific_details,
                template_data: request.template_data,
                generated_document_path: request.generated_document_path,
                document_path: None,
                document_uploaded: false,
                refusal_reason: None,
                created_at: now,
                updated_at: now,
            };
            state.requests.insert(id, row.clone());
            Ok(row)
        })
    }

    fn update_request<'a>(
        &'a self,
        request: &'a DocumentRequest,
    ) -> StoreFuture<'a, DocumentRequest> {
        Box::pin(async move {
            let mut state = self.lock();
            let row = state
                .requests
                .get_mut(&request.id.into_inner())
                .ok_or(StoreError::NotFound("Request"))?;

            *row = DocumentRequest {
                updated_at: Utc::now(),
                created_at: row.created_at,
                ..request.clone()
            };
            Ok(row.clone())
        })
    }

    fn find_request(&self, id: RequestId) -> StoreFuture<'_, Option<DocumentRequest>> {
        Box::pin(async move { Ok(self.lock().requests.get(&id.into_inner()).cloned()) })
    }

    fn find_request_by_reference<'a>(
        &'a self,
        reference: &'a str,
    ) -> StoreFuture<'a, Option<DocumentRequest>> {
        Box::pin(async move {
            Ok(self
                .lock()
                .requests
                .values()
                .find(|r| r.reference == reference)
                .cloned())
        })
    }

    fn list_requests<'a>(
        &'a self,
        filters: &'a RequestFilterParams,
    ) -> StoreFuture<'a, (Vec<DocumentRequest>, i64)> {
        Box::pin(async move {
            let state = self.lock();
            let rows: Vec<&DocumentRequest> = state
                .requests
                .values()
                .rev()
                .filter(|r| filters.status.is_none_or(|s| r.status == s))
                .filter(|r| filters.document_type.is_none_or(|t| r.document_type == t))
                .collect();

            let total = rows.len() as i64;
            let data = page(
                rows,
                filters.pagination.offset(),
                filters.pagination.limit(),
            );
            Ok((data, total))
        })
    }

    fn insert_complaint(&self, complaint: NewComplaint) -> StoreFuture<'_, Complaint> {
        Box::pin(async move {
            let mut state = self.lock();
            if state
                .complaints
                .values()
                .any(|c| c.request_id == complaint.request_id)
            {
                return Err(StoreError::Conflict(
                    "A complaint already exists for this request".to_string(),
                ));
            }

            let id = state.next_id();
            let now = Utc::now();
            let row = Complaint {
                id: ComplaintId::new(id),
                reference: complaint.reference,
                request_id: complaint.request_id,
                status: ComplaintStatus::Pending,
                reason: complaint.reason,
                description: complaint.description,
                response: None,
                regenerated: false,
                created_at: now,
                updated_at: now,
            };
            state.complaints.insert(id, row.clone());
            Ok(row)
        })
    }

    fn update_complaint<'a>(&'a self, complaint: &'a Complaint) -> StoreFuture<'a, Complaint> {
        Box::pin(async move {
            let mut state = self.lock();
            let row = state
                .complaints
                .get_mut(&complaint.id.into_inner())
                .ok_or(StoreError::NotFound("Complaint"))?;

            *row = Complaint {
                updated_at: Utc::now(),
                created_at: row.created_at,
                ..complaint.clone()
            };
            Ok(row.clone())
        })
    }

    fn find_complaint(&self, id: ComplaintId) -> StoreFuture<'_, Option<Complaint>> {
        Box::pin(async move { Ok(self.lock().complaints.get(&id.into_inner()).cloned()) })
    }

    fn find_complaint_by_reference<'a>(
        &'a self,
        reference: &'a str,
    ) -> StoreFuture<'a, Option<Complaint>> {
        Box::pin(async move {
            Ok(self
                .lock()
                .complaints
                .values()
                .find(|c| c.reference == reference)
                .cloned())
        })
    }

    fn find_complaint_by_request(
        &self,
        request_id: RequestId,
    ) -> StoreFuture<'_, Option<Complaint>> {
        Box::pin(async move {
            Ok(self
                .lock()
                .complaints
                .values()
                .find(|c| c.request_id == request_id)
                .cloned())
        })
    }

    fn list_complaints<'a>(
        &'a self,
        filters: &'a ComplaintFilterParams,
    ) -> StoreFuture<'a, (Vec<Complaint>, i64)> {
        Box::pin(async move {
            let state = self.lock();
            let rows: Vec<&Complaint> = state
                .complaints
                .values()
                .rev()
                .filter(|c| filters.status.is_none_or(|s| c.status == s))
                .collect();

            let total = rows.len() as i64;
            let data = page(
                rows,
                filters.pagination.offset(),
                filters.pagination.limit(),
            );
            Ok((data, total))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scolarite_models::details::{DetailSet, DocumentType, SchoolCertificateDetails};
    use std::sync::Arc;

    fn new_request(reference: &str) -> NewRequest {
        NewRequest {
            reference: reference.to_string(),
            student_id: StudentId::new(1),
            document_type: DocumentType::SchoolCertificate,
            specific_details: DetailSet::SchoolCertificate(SchoolCertificateDetails::default()),
            template_data: None,
            generated_document_path: None,
        }
    }

    #[tokio::test]
    async fn test_sequence_is_seeded_from_existing_references() {
        let store = MemoryStore::new();
        store.insert_request(new_request("AS-2025-001")).await.unwrap();
        store.insert_request(new_request("AS-2025-002")).await.unwrap();
        store.insert_request(new_request("AS-2024-007")).await.unwrap();

        assert_eq!(store.next_sequence("AS", 2025).await.unwrap(), 3);
        assert_eq!(store.next_sequence("AS", 2025).await.unwrap(), 4);
        assert_eq!(store.next_sequence("AR", 2025).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_reservations_are_distinct() {
        let store = Arc::new(MemoryStore::new());
        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.next_sequence("RN", 2025).await.unwrap()
            }));
        }

        let mut values = Vec::new();
        for handle in handles {
            values.push(handle.await.unwrap());
        }
        values.sort();
        assert_eq!(values, (1..=20).collect::<Vec<i64>>());
    }

    #[tokio::test]
    async fn test_one_complaint_per_request() {
        let store = MemoryStore::new();
        let request = store.insert_request(new_request("AS-2025-001")).await.unwrap();
        let complaint = NewComplaint {
            reference: "RC-2025-001".to_string(),
            request_id: request.id,
            reason: "Erreur".to_string(),
            description: "Nom mal orthographié".to_string(),
        };

        store.insert_complaint(complaint.clone()).await.unwrap();
        let err = store.insert_complaint(complaint).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_list_requests_filters_and_paginates() {
        let store = MemoryStore::new();
        for i in 1..=3 {
            store
                .insert_request(new_request(&format!("AS-2025-00{}", i)))
                .await
                .unwrap();
        }
        let mut accepted = store.find_request(RequestId::new(2)).await.unwrap().unwrap();
        accepted.status = RequestStatus::Accepted;
        store.update_request(&accepted).await.unwrap();

        let filters = RequestFilterParams {
            status: Some(RequestStatus::Pending),
            ..Default::default()
        };
        let (rows, total) = store.list_requests(&filters).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(rows[0].reference, "AS-2025-003");
        assert_eq!(rows[1].reference, "AS-2025-001");
    }
}
