//! Core protrack library (API client, session, services, flows).

pub mod api;
pub mod auth;
pub mod config;
pub mod flow;
pub mod logging;
pub mod services;
pub mod session;
