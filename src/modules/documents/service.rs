use chrono::Local;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

use scolarite_config::DocumentConfig;
use scolarite_core::{FileStorage, LocalFileStorage};
use scolarite_models::details::{DetailFields, DetailSet, DocumentType};
use scolarite_models::requests::DocumentVariant;
use scolarite_models::students::Student;

use crate::metrics::{
    track_document_generated, track_document_generation_failure, track_document_render_duration,
};
use crate::modules::documents::merger;
use crate::modules::documents::model::{
    DocumentError, DocumentPayload, GenerateDocument, GeneratedDocument, StudentSnapshot,
};
use crate::modules::documents::renderer;

/// Produces draft and final PDF files for requests.
#[derive(Clone)]
pub struct DocumentService {
    storage: Arc<dyn FileStorage>,
    config: Arc<DocumentConfig>,
}

impl DocumentService {
    pub fn new(storage: Arc<dyn FileStorage>, config: DocumentConfig) -> Self {
        Self {
            storage,
            config: Arc::new(config),
        }
    }

    /// Service writing to the local directory named by `config`.
    pub fn from_config(config: DocumentConfig) -> Self {
        let storage = LocalFileStorage::new(config.storage_dir.clone(), config.public_prefix.clone());
        Self::new(Arc::new(storage), config)
    }

    pub fn config(&self) -> &DocumentConfig {
        &self.config
    }

    /// `{variant}/{reference}-{variant}.pdf`
    pub fn storage_key(reference: &str, variant: DocumentVariant) -> String {
        format!("{}/{}-{}.pdf", variant, reference, variant)
    }

    /// Merge, render and store one document.
    ///
    /// The file for a given reference and variant is overwritten on every
    /// call. Any failure is returned before anything is reported as stored.
    #[instrument(
        skip(self, request),
        fields(
            reference = %request.reference,
            document_type = %request.document_type,
            variant = %request.variant
        )
    )]
    pub async fn generate_document(
        &self,
        request: GenerateDocument<'_>,
    ) -> Result<GeneratedDocument, DocumentError> {
        let document_type = request.document_type;
        let variant = request.variant;

        match self.generate(request).await {
            Ok(generated) => {
                track_document_generated(document_type.as_str(), variant.as_str());
                info!(path = %generated.public_path, "Document generated");
                Ok(generated)
            }
            Err(err) => {
                track_document_generation_failure(document_type.as_str());
                error!(error = %err, "Document generation failed");
                Err(err)
            }
        }
    }

    async fn generate(
        &self,
        request: GenerateDocument<'_>,
    ) -> Result<GeneratedDocument, DocumentError> {
        let details = merger::merge(request.document_type, request.student, &request.details);

        let missing = details.missing_fields();
        if !missing.is_empty() {
            warn!(?missing, "Rendering document with missing fields");
        }

        let payload = DocumentPayload {
            reference: request.reference.to_string(),
            student: StudentSnapshot::from(request.student),
            details: details.clone(),
            issued_on: Local::now().date_naive(),
        };

        let started = Instant::now();
        let bytes = self.render(payload).await?;
        track_document_render_duration(
            request.document_type.as_str(),
            started.elapsed().as_secs_f64(),
        );

        let key = Self::storage_key(request.reference, request.variant);
        let stored = self.storage.save(&key, &bytes).await?;

        Ok(GeneratedDocument {
            absolute_path: stored.absolute_path,
            public_path: stored.public_path,
            details,
            success: true,
        })
    }

    /// Merge and render without storing anything.
    pub async fn preview(
        &self,
        document_type: DocumentType,
        student: &Student,
        details: &DetailFields,
        reference: &str,
    ) -> Result<(DetailSet, Vec<u8>), DocumentError> {
        let details = merger::merge(document_type, student, details);
        let payload = DocumentPayload {
            reference: reference.to_string(),
            student: StudentSnapshot::from(student),
            details: details.clone(),
            issued_on: Local::now().date_naive(),
        };
        let bytes = self.render(payload).await?;
        Ok((details, bytes))
    }

    /// Render on the blocking pool.
    pub async fn render(&self, payload: DocumentPayload) -> Result<Vec<u8>, DocumentError> {
        let config = Arc::clone(&self.config);
        tokio::task::spawn_blocking(move || renderer::render(&payload, &config)).await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scolarite_models::ids::StudentId;
    use scolarite_models::students::NewStudent;
    use serde_json::json;
    use tempfile::TempDir;

    fn student() -> Student {
        NewStudent {
            email: "amal@etu.ma".to_string(),
            first_name: "Amal".to_string(),
            last_name: "Idrissi".to_string(),
            cin: "AB123456".to_string(),
            ..Default::default()
        }
        .into_student(StudentId::new(1))
    }

    fn service(dir: &TempDir) -> DocumentService {
        DocumentService::from_config(DocumentConfig::default().with_storage_dir(dir.path()))
    }

    #[test]
    fn test_storage_key() {
        assert_eq!(
            DocumentService::storage_key("AS-2025-001", DocumentVariant::Final),
            "final/AS-2025-001-final.pdf"
        );
    }

    #[tokio::test]
    async fn test_every_type_renders_from_empty_details() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        let student = student();

        for document_type in DocumentType::ALL {
            let reference = format!("{}-2025-001", document_type.reference_prefix());
            let generated = service
                .generate_document(GenerateDocument {
                    document_type,
                    student: &student,
                    details: DetailFields::new(),
                    reference: &reference,
                    variant: DocumentVariant::Draft,
                })
                .await
                .unwrap();

            assert!(generated.success);
            assert_eq!(generated.details.document_type(), document_type);
            assert_eq!(
                generated.public_path,
                format!("/documents/draft/{}-draft.pdf", reference)
            );
            let bytes = std::fs::read(&generated.absolute_path).unwrap();
            assert!(bytes.starts_with(b"%PDF"));
        }
    }

    #[tokio::test]
    async fn test_regeneration_overwrites_same_path() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        let student = student();

        let first = service
            .generate_document(GenerateDocument {
                document_type: DocumentType::SchoolCertificate,
                student: &student,
                details: DetailFields::new(),
                reference: "AS-2025-001",
                variant: DocumentVariant::Final,
            })
            .await
            .unwrap();
        let first_bytes = std::fs::read(&first.absolute_path).unwrap();

        let details = match json!({ "level": "Master 2", "program": "Big Data" }) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        };
        let second = service
            .generate_document(GenerateDocument {
                document_type: DocumentType::SchoolCertificate,
                student: &student,
                details,
                reference: "AS-2025-001",
                variant: DocumentVariant::Final,
            })
            .await
            .unwrap();
        let second_bytes = std::fs::read(&second.absolute_path).unwrap();

        assert_eq!(first.absolute_path, second.absolute_path);
        assert_eq!(first.public_path, second.public_path);
        assert_ne!(first_bytes, second_bytes);
        let DetailSet::SchoolCertificate(details) = second.details else {
            panic!("wrong variant");
        };
        assert_eq!(details.level, "Master 2");
    }

    #[tokio::test]
    async fn test_unreadable_font_fails_without_writing() {
        let dir = TempDir::new().unwrap();
        let config = DocumentConfig {
            font_path: Some(dir.path().join("missing.ttf")),
            ..DocumentConfig::default().with_storage_dir(dir.path())
        };
        let service = DocumentService::from_config(config);
        let student = student();

        let result = service
            .generate_document(GenerateDocument {
                document_type: DocumentType::Transcript,
                student: &student,
                details: DetailFields::new(),
                reference: "RN-2025-001",
                variant: DocumentVariant::Draft,
            })
            .await;

        assert!(matches!(result, Err(DocumentError::Font { .. })));
        assert!(!dir.path().join("draft/RN-2025-001-draft.pdf").exists());
    }
}
