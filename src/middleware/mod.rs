//! Request extractors for authentication.
//!
//! Public student endpoints take no extractor. Admin handlers take
//! [`auth::RequireAdmin`], which validates the `Authorization: Bearer <token>`
//! header and checks the `admin` role claim.

pub mod auth;
