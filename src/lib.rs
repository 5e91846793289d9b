//! # Scolarite API
//!
//! Student-services backend for a university faculty: students request
//! official documents (school and success certificates, transcripts,
//! internship agreements) and file complaints; administrators review
//! requests and the service generates the PDF documents.
//!
//! ## Architecture
//!
//! ```text
//! src/
//! ├── cli/              # Offline preview used by scolarite-cli
//! ├── middleware/       # Bearer token extractors
//! ├── modules/
//! │   ├── documents/   # Transcript resolver, detail merger, PDF renderer
//! │   ├── requests/    # Request lifecycle (create, approve, reject, draft)
//! │   └── complaints/  # Complaint filing and reconciliation
//! ├── store/            # RequestStore trait, PostgreSQL and in-memory stores
//! └── utils/            # JWT, notifications
//! ```
//!
//! Feature modules follow the same layout: `controller.rs` (HTTP handlers),
//! `service.rs` (business logic), `model.rs` (DTOs), `router.rs`.
//!
//! ## Document generation
//!
//! Every document is rendered from a typed [`DetailSet`](scolarite_models::DetailSet)
//! obtained by merging the student record, the resolved transcript year and
//! caller-supplied details. Drafts and final documents are stored as
//! `{DOCUMENTS_DIR}/{variant}/{reference}-{variant}.pdf` and served under
//! `DOCUMENTS_PUBLIC_PREFIX`.
//!
//! ## API Documentation
//!
//! - Swagger UI: `http://localhost:3000/swagger-ui`
//! - Scalar: `http://localhost:3000/scalar`

pub mod cli;
pub mod docs;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod modules;
pub mod router;
pub mod state;
pub mod store;
pub mod utils;
pub mod validator;

pub use scolarite_config;
pub use scolarite_core;
pub use scolarite_db;
pub use scolarite_models;
