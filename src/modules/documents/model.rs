use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

use scolarite_core::{AppError, StorageError};
use scolarite_models::details::{DetailFields, DetailSet, DocumentType};
use scolarite_models::requests::DocumentVariant;
use scolarite_models::students::Student;

/// Failure while producing a document file.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Failed to load font {}: {source}", path.display())]
    Font {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build PDF: {0}")]
    Pdf(String),

    #[error("Failed to store document: {0}")]
    Storage(#[from] StorageError),

    #[error("Rendering task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<DocumentError> for AppError {
    fn from(err: DocumentError) -> Self {
        AppError::internal(anyhow::Error::new(err).context("Document generation failed"))
    }
}

/// Identity printed on every document.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentSnapshot {
    pub full_name: String,
    pub cin: String,
    pub cne: String,
}

impl From<&Student> for StudentSnapshot {
    fn from(student: &Student) -> Self {
        Self {
            full_name: student.full_name(),
            cin: student.cin.clone(),
            cne: student.cne.clone().unwrap_or_default(),
        }
    }
}

/// Everything the renderer needs for one document.
#[derive(Debug, Clone)]
pub struct DocumentPayload {
    pub reference: String,
    pub student: StudentSnapshot,
    pub details: DetailSet,
    pub issued_on: NaiveDate,
}

/// Input of [`DocumentService::generate_document`](super::service::DocumentService::generate_document).
#[derive(Debug, Clone)]
pub struct GenerateDocument<'a> {
    pub document_type: DocumentType,
    pub student: &'a Student,
    pub details: DetailFields,
    pub reference: &'a str,
    pub variant: DocumentVariant,
}

#[derive(Debug, Clone)]
pub struct GeneratedDocument {
    pub absolute_path: PathBuf,
    pub public_path: String,
    /// Merged details the file was rendered from
    pub details: DetailSet,
    pub success: bool,
}
