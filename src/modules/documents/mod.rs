//! Document generation: transcript resolution, detail merging, layout and
//! PDF painting, and storage of draft/final files.

pub mod format;
pub mod merger;
pub mod model;
pub mod pdf;
pub mod renderer;
pub mod resolver;
pub mod service;

pub use model::{DocumentError, DocumentPayload, GenerateDocument, GeneratedDocument};
pub use service::DocumentService;
