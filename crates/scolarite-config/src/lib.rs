//! # Scolarite Config
//!
//! Configuration types for the Scolarite API, loaded from environment
//! variables (a `.env` file is honoured by the binaries through `dotenvy`):
//!
//! - [`cors`]: CORS (Cross-Origin Resource Sharing) configuration
//! - [`documents`]: Document storage, letterhead and font configuration
//! - [`email`]: Email/SMTP configuration for student notifications
//! - [`jwt`]: JWT secret used by the admin check
//! - [`server`]: Listen address and observability switch
//!
//! # Example
//!
//! ```ignore
//! use scolarite_config::{DocumentConfig, EmailConfig};
//!
//! let documents = DocumentConfig::from_env();
//! let email = EmailConfig::from_env();
//! ```

pub mod cors;
pub mod documents;
pub mod email;
pub mod jwt;
pub mod server;

// Re-export commonly used types at crate root
pub use cors::CorsConfig;
pub use documents::DocumentConfig;
pub use email::EmailConfig;
pub use jwt::JwtConfig;
pub use server::ServerConfig;
