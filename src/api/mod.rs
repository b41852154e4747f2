//! Typed client for the training-platform REST API.

pub mod admin;
pub mod client;
pub mod errors;
pub mod json;
pub mod models;

pub use client::ApiClient;
pub use errors::ApiError;
pub use models::*;
