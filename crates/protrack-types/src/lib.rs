//! Domain data model shared across the protrack workspace.
//!
//! Pure data: no I/O, no networking. Wire names match the backend's
//! REST contract exactly.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ordered categorical protein-level reading off a urine test strip.
///
/// The derived `Ord` follows the clinical ordering:
/// `Negative < Trace < +1 < +2 < +3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProteinLevel {
    Negative,
    Trace,
    #[serde(rename = "+1")]
    PlusOne,
    #[serde(rename = "+2")]
    PlusTwo,
    #[serde(rename = "+3")]
    PlusThree,
}

impl ProteinLevel {
    /// All levels in ascending clinical order (e.g., for pickers/help text).
    pub fn all() -> &'static [ProteinLevel] {
        &[
            ProteinLevel::Negative,
            ProteinLevel::Trace,
            ProteinLevel::PlusOne,
            ProteinLevel::PlusTwo,
            ProteinLevel::PlusThree,
        ]
    }

    /// Wire string for this level (the exact value the backend stores).
    pub fn as_str(&self) -> &'static str {
        match self {
            ProteinLevel::Negative => "Negative",
            ProteinLevel::Trace => "Trace",
            ProteinLevel::PlusOne => "+1",
            ProteinLevel::PlusTwo => "+2",
            ProteinLevel::PlusThree => "+3",
        }
    }

    /// Numeric value for trend charting: `Negative` = 0 up to `+3` = 4.
    pub fn chart_value(&self) -> u8 {
        match self {
            ProteinLevel::Negative => 0,
            ProteinLevel::Trace => 1,
            ProteinLevel::PlusOne => 2,
            ProteinLevel::PlusTwo => 3,
            ProteinLevel::PlusThree => 4,
        }
    }
}

impl fmt::Display for ProteinLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProteinLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "negative" => Ok(ProteinLevel::Negative),
            "trace" => Ok(ProteinLevel::Trace),
            "+1" | "1" => Ok(ProteinLevel::PlusOne),
            "+2" | "2" => Ok(ProteinLevel::PlusTwo),
            "+3" | "3" => Ok(ProteinLevel::PlusThree),
            other => Err(format!(
                "Unknown protein level '{other}' (expected one of: Negative, Trace, +1, +2, +3)"
            )),
        }
    }
}

/// How a test result entered the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryMethod {
    /// Inferred server-side from an uploaded strip photo.
    Auto,
    /// Typed in by the user.
    Manual,
}

impl fmt::Display for EntryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryMethod::Auto => write!(f, "auto"),
            EntryMethod::Manual => write!(f, "manual"),
        }
    }
}

/// A single strip reading. Immutable once created; there is no
/// client-side edit or delete.
///
/// `id` is `None` for client-provisional records and `Some` once the
/// backend has assigned a durable id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    #[serde(default)]
    pub id: Option<i64>,
    pub result: ProteinLevel,
    pub entry_method: EntryMethod,
    #[serde(default)]
    pub notes: Option<String>,
    /// Some backend responses (notably the auto-entry create) omit the
    /// timestamp; default to "now" so the record is still displayable.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub image: Option<String>,
}

/// Manual-entry form state. `result` stays optional until the user has
/// picked a level; submission validates it before any network call.
#[derive(Debug, Clone)]
pub struct ManualEntry {
    pub result: Option<ProteinLevel>,
    pub notes: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Reconciliation state of a locally-created record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    /// Shown optimistically; the create request has not resolved yet.
    Pending,
    /// The backend accepted the create.
    Confirmed,
    /// The create failed; the record stays visible, no retry scheduled.
    Failed,
}

/// A locally-created record with its reconciliation state.
///
/// `client_ref` identifies the record before (and independently of)
/// any server-assigned id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalResult {
    pub client_ref: Uuid,
    pub record: TestResult,
    pub status: SubmissionStatus,
}

/// User profile as stored by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub sex: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub lga: String,
    /// Date of birth, `YYYY-MM-DD`.
    #[serde(default)]
    pub dob: String,
}

/// Partial profile for PATCH updates; unset fields are omitted from
/// the request body.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lga: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,
}

impl ProfileUpdate {
    /// Returns true if no field is set (nothing to send).
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.sex.is_none()
            && self.state.is_none()
            && self.lga.is_none()
            && self.dob.is_none()
    }
}

/// Account-creation payload (profile fields + password).
#[derive(Debug, Clone, Serialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub sex: String,
    pub state: String,
    pub lga: String,
    pub dob: String,
}
