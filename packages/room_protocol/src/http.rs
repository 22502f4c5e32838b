//! Request and response bodies of the room backend's HTTP endpoints.

use serde::{Deserialize, Serialize};

/// `POST /api/token`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRequest {
    pub username: String,
}

/// Successful `/api/token` body. Both fields are required by the client but
/// are kept optional here so a partial response can be reported precisely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// `POST /room/{room_id}/facilitator?enable=...`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacilitatorToggle {
    pub facilitator_enabled: bool,
}

/// `POST /room/{room_id}/ai_participant/{ai_name}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiParticipantAdded {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_participant_added: Option<String>,
}

/// `DELETE /room/{room_id}/ai_participant/{ai_name}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiParticipantRemoved {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_participant_removed: Option<String>,
}

/// Failure body. The backend reports `detail`; proxies in front of it report `error`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorBody {
    /// The human-readable reason, preferring `detail`.
    pub fn reason(&self) -> Option<&str> {
        non_empty(&self.detail).or_else(|| non_empty(&self.error))
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}
