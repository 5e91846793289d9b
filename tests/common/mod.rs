#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::NaiveDate;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::ServiceExt;

use scolarite::modules::documents::DocumentService;
use scolarite::router::init_router;
use scolarite::state::AppState;
use scolarite::store::{MemoryStore, RequestStore};
use scolarite::utils::jwt::{ADMIN_ROLE, create_token};
use scolarite::utils::notifier::{Notification, Notifier, NotifyFuture};
use scolarite_config::{DocumentConfig, JwtConfig};
use scolarite_models::students::{NewStudent, Student};
use scolarite_models::transcripts::{
    AcademicYear, ModuleGrade, Semester, SemesterResult, Transcript,
};

pub const JWT_SECRET: &str = "integration-test-secret";

/// Keeps every notification it is asked to send.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn send<'a>(&'a self, notification: &'a Notification) -> NotifyFuture<'a> {
        Box::pin(async move {
            self.sent.lock().unwrap().push(notification.clone());
            Ok(())
        })
    }
}

pub struct TestContext {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub dir: TempDir,
}

impl TestContext {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let documents =
            DocumentService::from_config(DocumentConfig::default().with_storage_dir(dir.path()));

        let state = AppState::new(
            store.clone(),
            documents,
            notifier.clone(),
            JwtConfig::with_secret(JWT_SECRET),
        );

        Self {
            state,
            store,
            notifier,
            dir,
        }
    }

    /// Same store and notifier, but every render fails on an unreadable font.
    pub fn failing_state(&self) -> AppState {
        let config = DocumentConfig {
            font_path: Some(self.dir.path().join("missing-font.ttf")),
            ..DocumentConfig::default().with_storage_dir(self.dir.path())
        };
        AppState {
            documents: DocumentService::from_config(config),
            ..self.state.clone()
        }
    }

    pub fn app(&self) -> axum::Router {
        init_router(self.state.clone())
    }

    pub async fn seed_student(&self) -> Student {
        self.store.insert_student(sample_student()).await.unwrap()
    }

    pub fn admin_token(&self) -> String {
        create_token(
            "1",
            "admin@universite.ma",
            ADMIN_ROLE,
            3600,
            &JwtConfig::with_secret(JWT_SECRET),
        )
        .unwrap()
    }

    pub fn path_of(&self, public_path: &str) -> std::path::PathBuf {
        let relative = public_path.trim_start_matches("/documents/");
        self.dir.path().join(relative)
    }
}

/// 2024-2025 / S1 with Algo 12 and BD 8, mention Bien.
pub fn sample_transcript() -> Transcript {
    Transcript {
        years: vec![AcademicYear {
            year: "2024-2025".to_string(),
            semesters: vec![
                Semester {
                    name: "S1".to_string(),
                    modules: vec![ModuleGrade::new("Algo", 12.0), ModuleGrade::new("BD", 8.0)],
                    result: Some(SemesterResult {
                        mention: "Bien".to_string(),
                        decision: "Admis".to_string(),
                    }),
                },
                Semester {
                    name: "S2".to_string(),
                    modules: vec![ModuleGrade::new("Réseaux", 14.5)],
                    result: Some(SemesterResult {
                        mention: "Assez bien".to_string(),
                        decision: "Admis".to_string(),
                    }),
                },
            ],
        }],
    }
}

pub fn sample_student() -> NewStudent {
    NewStudent {
        email: "amal.idrissi@etu.uit.ac.ma".to_string(),
        first_name: "Amal".to_string(),
        last_name: "Idrissi".to_string(),
        cin: "AB123456".to_string(),
        cne: Some("R130456789".to_string()),
        level: Some("Licence 3".to_string()),
        program: Some("Informatique".to_string()),
        birth_date: NaiveDate::from_ymd_opt(2003, 5, 14),
        birth_place: Some("Kénitra".to_string()),
        transcript: Some(sample_transcript()),
    }
}

pub async fn send(
    app: axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

pub fn create_request_body(document_type: &str, details: Value) -> Value {
    json!({
        "email": "amal.idrissi@etu.uit.ac.ma",
        "cin": "AB123456",
        "document_type": document_type,
        "details": details
    })
}
