//! Command handlers.

pub mod auth;
pub mod config;
pub mod profile;
pub mod results;
pub mod submit;

use anyhow::anyhow;
use protrack_core::api::ApiError;

use super::AppContext;

/// Turns an API error into a user-facing error, ending the session first
/// if the server rejected the token.
pub fn report(ctx: &AppContext, err: ApiError) -> anyhow::Error {
    if ctx.session.handle_api_error(&err) {
        anyhow!("Session expired. Run 'protrack login' again.")
    } else {
        anyhow::Error::new(err)
    }
}
