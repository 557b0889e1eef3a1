//! Endpoint wrappers over [`crate::api::ApiClient`].
//!
//! Each service owns the paths and payload shapes for one backend
//! resource; callers never build request bodies themselves.

pub mod auth;
pub mod results;
pub mod user;
