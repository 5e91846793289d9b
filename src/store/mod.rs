//! Persistence of students, requests, complaints and reference sequences.
//!
//! Services talk to a [`RequestStore`] so the lifecycle can run against
//! PostgreSQL in the server and against [`MemoryStore`] in tests and the
//! offline CLI.

pub mod memory;
pub mod postgres;

use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

use scolarite_core::AppError;
use scolarite_models::complaints::{Complaint, ComplaintFilterParams, NewComplaint};
use scolarite_models::ids::{ComplaintId, RequestId, StudentId};
use scolarite_models::requests::{DocumentRequest, NewRequest, RequestFilterParams};
use scolarite_models::students::{NewStudent, Student};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Boxed future returned by [`RequestStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("Corrupt {entity} row: {message}")]
    Corrupt {
        entity: &'static str,
        message: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => AppError::not_found(err),
            StoreError::Conflict(_) => AppError::conflict(err),
            StoreError::Corrupt { .. } | StoreError::Database(_) => AppError::database(err),
        }
    }
}

pub trait RequestStore: Send + Sync {
    fn insert_student(&self, student: NewStudent) -> StoreFuture<'_, Student>;

    fn find_student(&self, id: StudentId) -> StoreFuture<'_, Option<Student>>;

    fn find_student_by_email<'a>(&'a self, email: &'a str) -> StoreFuture<'a, Option<Student>>;

    /// Reserve the next sequence number for `(prefix, year)`.
    ///
    /// The sequence is seeded on first use with the number of existing
    /// references starting with `{prefix}-{year}-`. Two concurrent callers
    /// never receive the same number.
    fn next_sequence<'a>(&'a self, prefix: &'a str, year: i32) -> StoreFuture<'a, i64>;

    fn insert_request(&self, request: NewRequest) -> StoreFuture<'_, DocumentRequest>;

    /// Persist every mutable column of `request` and bump `updated_at`.
    fn update_request<'a>(&'a self, request: &'a DocumentRequest)
    -> StoreFuture<'a, DocumentRequest>;

    fn find_request(&self, id: RequestId) -> StoreFuture<'_, Option<DocumentRequest>>;

    fn find_request_by_reference<'a>(
        &'a self,
        reference: &'a str,
    ) -> StoreFuture<'a, Option<DocumentRequest>>;

    /// Newest first, with the total number of matching rows.
    fn list_requests<'a>(
        &'a self,
        filters: &'a RequestFilterParams,
    ) -> StoreFuture<'a, (Vec<DocumentRequest>, i64)>;

    /// Fails with [`StoreError::Conflict`] when the request already has a
    /// complaint.
    fn insert_complaint(&self, complaint: NewComplaint) -> StoreFuture<'_, Complaint>;

    fn update_complaint<'a>(&'a self, complaint: &'a Complaint) -> StoreFuture<'a, Complaint>;

    fn find_complaint(&self, id: ComplaintId) -> StoreFuture<'_, Option<Complaint>>;

    fn find_complaint_by_reference<'a>(
        &'a self,
        reference: &'a str,
    ) -> StoreFuture<'a, Option<Complaint>>;

    fn find_complaint_by_request(&self, request_id: RequestId)
    -> StoreFuture<'_, Option<Complaint>>;

    fn list_complaints<'a>(
        &'a self,
        filters: &'a ComplaintFilterParams,
    ) -> StoreFuture<'a, (Vec<Complaint>, i64)>;
}
