pub mod complaints;
pub mod documents;
pub mod requests;
