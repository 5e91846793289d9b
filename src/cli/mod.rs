//! Offline tooling used by `scolarite-cli`.

use anyhow::Context;
use std::path::{Path, PathBuf};

use scolarite_config::DocumentConfig;
use scolarite_models::details::{DetailFields, DetailSet, DocumentType};
use scolarite_models::ids::StudentId;
use scolarite_models::students::NewStudent;

use crate::modules::documents::DocumentService;

pub struct PreviewOptions {
    pub document_type: DocumentType,
    pub student: PathBuf,
    pub details: Option<PathBuf>,
    pub reference: Option<String>,
    pub out: PathBuf,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid JSON in {}", path.display()))
}

/// Merge and render one document from JSON files, writing the PDF to
/// `options.out`. Returns the merged details.
pub async fn preview_document(
    config: DocumentConfig,
    options: PreviewOptions,
) -> anyhow::Result<DetailSet> {
    let student: NewStudent = read_json(&options.student)?;
    let student = student.into_student(StudentId::new(0));

    let details: DetailFields = match &options.details {
        Some(path) => read_json(path)?,
        None => DetailFields::new(),
    };

    let reference = options.reference.unwrap_or_else(|| {
        format!("{}-PREVIEW", options.document_type.reference_prefix())
    });

    let service = DocumentService::from_config(config);
    let (merged, bytes) = service
        .preview(options.document_type, &student, &details, &reference)
        .await?;

    if let Some(parent) = options.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(&options.out, bytes)
        .with_context(|| format!("Failed to write {}", options.out.display()))?;

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_preview_writes_pdf() {
        let dir = TempDir::new().unwrap();
        let student = dir.path().join("student.json");
        std::fs::write(
            &student,
            r#"{
                "email": "amal@etu.ma",
                "first_name": "Amal",
                "last_name": "Idrissi",
                "cin": "AB123456",
                "transcript": { "years": [] }
            }"#,
        )
        .unwrap();
        let details = dir.path().join("details.json");
        std::fs::write(&details, r#"{ "company_name": "OCP" }"#).unwrap();
        let out = dir.path().join("out/preview.pdf");

        let merged = preview_document(
            DocumentConfig::default().with_storage_dir(dir.path()),
            PreviewOptions {
                document_type: DocumentType::Internship,
                student,
                details: Some(details),
                reference: None,
                out: out.clone(),
            },
        )
        .await
        .unwrap();

        assert_eq!(merged.document_type(), DocumentType::Internship);
        assert!(std::fs::read(&out).unwrap().starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn test_preview_reports_bad_student_file() {
        let dir = TempDir::new().unwrap();
        let student = dir.path().join("student.json");
        std::fs::write(&student, "not json").unwrap();

        let err = preview_document(
            DocumentConfig::default().with_storage_dir(dir.path()),
            PreviewOptions {
                document_type: DocumentType::Transcript,
                student,
                details: None,
                reference: None,
                out: dir.path().join("out.pdf"),
            },
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("Invalid JSON"));
    }
}
