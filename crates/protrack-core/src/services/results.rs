//! Test-result endpoints and chart helpers.
//!
//! The entry method is stamped here, not by callers: JSON creates are
//! always `manual`, photo uploads are always `auto`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use protrack_types::{EntryMethod, ProteinLevel, TestResult};

use crate::api::{ApiClient, ApiError, ApiErrorKind, ApiResult};

const RESULTS_PATH: &str = "test-results/";

/// The list endpoint has been seen both bare and wrapped in a
/// `{"results": [...]}` envelope; accept either.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListPayload {
    Wrapped { results: Vec<TestResult> },
    Bare(Vec<TestResult>),
}

#[derive(Debug, Serialize)]
struct ManualCreateRequest<'a> {
    result: ProteinLevel,
    entry_method: EntryMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<&'a str>,
    timestamp: DateTime<Utc>,
}

/// Fetches the user's results (`GET test-results/`).
pub async fn list(api: &ApiClient) -> ApiResult<Vec<TestResult>> {
    let payload: ListPayload = api.get_json(RESULTS_PATH).await?;
    Ok(match payload {
        ListPayload::Wrapped { results } | ListPayload::Bare(results) => results,
    })
}

/// Creates a manual-entry result (`POST test-results/`).
pub async fn create_manual(
    api: &ApiClient,
    result: ProteinLevel,
    notes: Option<&str>,
    timestamp: DateTime<Utc>,
) -> ApiResult<TestResult> {
    let request = ManualCreateRequest {
        result,
        entry_method: EntryMethod::Manual,
        notes,
        timestamp,
    };
    api.post_json(RESULTS_PATH, &request).await
}

/// Uploads a strip photo for server-side inference (`POST test-results/`
/// as multipart). The returned record carries the inferred level.
pub async fn create_auto(
    api: &ApiClient,
    image: Vec<u8>,
    file_name: &str,
    mime_type: &str,
) -> ApiResult<TestResult> {
    let part = reqwest::multipart::Part::bytes(image)
        .file_name(file_name.to_string())
        .mime_str(mime_type)
        .map_err(|err| {
            ApiError::new(ApiErrorKind::Validation, format!("Invalid MIME type: {err}"))
        })?;

    let form = reqwest::multipart::Form::new()
        .text("entry_method", "auto")
        .part("image", part);

    api.post_multipart(RESULTS_PATH, form).await
}

/// Projects results onto (timestamp, chart value) points in ascending
/// time order, ready for trend plotting.
pub fn chart_series(results: &[TestResult]) -> Vec<(DateTime<Utc>, u8)> {
    let mut points: Vec<(DateTime<Utc>, u8)> = results
        .iter()
        .map(|r| (r.timestamp, r.result.chart_value()))
        .collect();
    points.sort_by_key(|(timestamp, _)| *timestamp);
    points
}
