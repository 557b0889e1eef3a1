//! Result-submission flow.
//!
//! Manual entry is optimistic: the provisional record is emitted as
//! visible strictly before the create request is dispatched, and a
//! failed create leaves it visible in `Failed` state (no rollback, no
//! retry). Photo entry is the opposite: nothing is shown until the
//! server has inferred a level from the upload.

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use protrack_types::{EntryMethod, LocalResult, ManualEntry, SubmissionStatus, TestResult};

use crate::api::{ApiClient, ApiError, ApiResult};
use crate::auth::AuthSession;
use crate::services;

/// Events emitted while a submission runs.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlowEvent {
    /// The provisional record is now visible. Always precedes
    /// `RequestDispatched` for the same `client_ref`.
    RecordVisible { record: LocalResult },

    /// The create request has been sent to the backend.
    RequestDispatched { client_ref: Uuid },

    /// The backend accepted the record; `record` carries the
    /// server-assigned id.
    Confirmed { client_ref: Uuid, record: TestResult },

    /// The create failed. The provisional record stays visible in
    /// `Failed` state; no retry is scheduled.
    SubmitFailed { client_ref: Uuid, message: String },

    /// A photo upload is in flight (blocking indicator).
    UploadStarted,

    /// The photo upload has resolved, either way.
    UploadFinished,

    /// The server ended the session (token rejected mid-flow).
    SessionEnded,
}

/// Sender half for flow events.
pub type FlowEventTx = mpsc::UnboundedSender<FlowEvent>;

fn emit(tx: &FlowEventTx, event: FlowEvent) {
    // Receiver may have gone away; the flow outcome doesn't depend on it.
    let _ = tx.send(event);
}

/// Submits a manual entry optimistically.
///
/// Returns the local record with its final reconciliation status. A
/// failed create is not an `Err`: the record stays, the failure is
/// advisory. An auth rejection additionally ends the session.
///
/// # Errors
/// Only a missing protein level errors, before any network call.
pub async fn submit_manual(
    api: &ApiClient,
    session: &AuthSession,
    entry: ManualEntry,
    tx: &FlowEventTx,
) -> ApiResult<LocalResult> {
    let Some(level) = entry.result else {
        return Err(ApiError::validation("No protein level selected"));
    };

    let mut local = LocalResult {
        client_ref: Uuid::new_v4(),
        record: TestResult {
            id: None,
            result: level,
            entry_method: EntryMethod::Manual,
            notes: entry.notes.clone(),
            timestamp: entry.timestamp,
            image: None,
        },
        status: SubmissionStatus::Pending,
    };

    // Visible first, dispatched second. The order is the contract.
    emit(tx, FlowEvent::RecordVisible {
        record: local.clone(),
    });
    emit(tx, FlowEvent::RequestDispatched {
        client_ref: local.client_ref,
    });

    match services::results::create_manual(api, level, entry.notes.as_deref(), entry.timestamp)
        .await
    {
        Ok(record) => {
            debug!(client_ref = %local.client_ref, id = ?record.id, "Create confirmed");
            local.record = record.clone();
            local.status = SubmissionStatus::Confirmed;
            emit(tx, FlowEvent::Confirmed {
                client_ref: local.client_ref,
                record,
            });
        }
        Err(err) => {
            warn!(client_ref = %local.client_ref, error = %err, "Create failed");
            local.status = SubmissionStatus::Failed;
            emit(tx, FlowEvent::SubmitFailed {
                client_ref: local.client_ref,
                message: err.to_string(),
            });
            if session.handle_api_error(&err) {
                emit(tx, FlowEvent::SessionEnded);
            }
        }
    }

    Ok(local)
}

/// Submits a strip photo for server-side inference.
///
/// Blocking, not optimistic: there is nothing to show until the server
/// has read the strip.
///
/// # Errors
/// Empty image bytes error before any network call. Otherwise returns
/// the API error on failure; auth rejection also ends the session.
pub async fn submit_photo(
    api: &ApiClient,
    session: &AuthSession,
    image: Vec<u8>,
    file_name: &str,
    mime_type: &str,
    tx: &FlowEventTx,
) -> ApiResult<TestResult> {
    if image.is_empty() {
        return Err(ApiError::validation("Empty image"));
    }

    emit(tx, FlowEvent::UploadStarted);
    let outcome = services::results::create_auto(api, image, file_name, mime_type).await;
    emit(tx, FlowEvent::UploadFinished);

    match outcome {
        Ok(record) => Ok(record),
        Err(err) => {
            if session.handle_api_error(&err) {
                emit(tx, FlowEvent::SessionEnded);
            }
            Err(err)
        }
    }
}
