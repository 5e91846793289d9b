//! Shared utilities.
//!
//! - [`jwt`]: Admin token claims, creation and verification
//! - [`notifier`]: Student notifications (SMTP and logging)

pub mod jwt;
pub mod notifier;
