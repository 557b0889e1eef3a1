//! Account endpoints: token issuance, signup, logout notification.

use serde::{Deserialize, Serialize};
use tracing::warn;

use protrack_types::{SignupRequest, UserProfile};

use crate::api::{ApiClient, ApiResult};

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

/// Exchanges credentials for an auth token (`POST accounts/token/`).
pub async fn issue_token(api: &ApiClient, email: &str, password: &str) -> ApiResult<String> {
    let response: TokenResponse = api
        .post_json("accounts/token/", &TokenRequest { email, password })
        .await?;
    Ok(response.token)
}

/// Creates a new account (`POST accounts/signup/`). Does not log in;
/// callers follow up with [`issue_token`].
pub async fn register(api: &ApiClient, request: &SignupRequest) -> ApiResult<UserProfile> {
    api.post_json("accounts/signup/", request).await
}

/// Tells the backend the session is ending (`POST accounts/logout/`).
///
/// Best effort: local logout proceeds regardless, so failures are
/// logged and swallowed.
pub async fn notify_logout(api: &ApiClient) {
    if let Err(err) = api.post_empty("accounts/logout/").await {
        warn!(error = %err, "Logout notification failed; clearing local session anyway");
    }
}
