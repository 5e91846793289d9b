//! # Scolarite Core
//!
//! Core types, errors, and utilities for the Scolarite API.
//!
//! This crate provides foundational types used throughout the application:
//!
//! - [`errors`]: Application error type with HTTP response conversion
//! - [`file_storage`]: Storage abstraction for generated documents
//! - [`pagination`]: Pagination utilities for list endpoints
//!
//! # Example
//!
//! ```ignore
//! use scolarite_core::errors::AppError;
//! use scolarite_core::pagination::PaginationParams;
//!
//! let error = AppError::not_found(anyhow::anyhow!("Request not found"));
//!
//! let params = PaginationParams::default();
//! let limit = params.limit();
//! ```

pub mod errors;
pub mod file_storage;
pub mod pagination;

// Re-export commonly used types at crate root
pub use errors::AppError;
pub use file_storage::{FileStorage, LocalFileStorage, StorageError, StoredFile};
pub use pagination::{PaginationMeta, PaginationParams};
