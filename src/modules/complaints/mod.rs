//! Complaints against document requests.
//!
//! One complaint per request. Responding resolves the complaint and can
//! regenerate or replace the request's final document on the way.

pub mod controller;
pub mod model;
pub mod router;
pub mod service;
