//! Document requests.
//!
//! Students submit requests publicly and track them by reference. Admins
//! review them: approve (final document), reject (with a reason) or edit the
//! draft. Every action that renders goes through
//! [`DocumentService`](crate::modules::documents::DocumentService) and
//! persists only after rendering succeeded.

pub mod controller;
pub mod model;
pub mod router;
pub mod service;
