//! Profile endpoints.

use protrack_types::{ProfileUpdate, UserProfile};

use crate::api::{ApiClient, ApiResult};

const PROFILE_PATH: &str = "accounts/profile/";

/// Fetches the authenticated user's profile.
pub async fn fetch_profile(api: &ApiClient) -> ApiResult<UserProfile> {
    api.get_json(PROFILE_PATH).await
}

/// Applies a partial profile update; returns the updated profile.
pub async fn update_profile(api: &ApiClient, update: &ProfileUpdate) -> ApiResult<UserProfile> {
    api.patch_json(PROFILE_PATH, update).await
}
