use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactType {
    Phone,
    Wechat,
    Email,
}

/// Authenticated user as returned by the login endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    pub id: String,
    pub email: String,
    pub nickname: String,
    pub contact_type: ContactType,
    pub contact_value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerSummary {
    pub id: String,
    pub nickname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// A private channel between exactly two users. The backend guarantees at
/// most one conversation per unordered participant pair; clients trust the
/// id it hands back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub other_user: PeerSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,
    /// Epoch millis of the latest activity, used for list ordering.
    pub updated_at: i64,
}

/// Message payload, tagged on the wire as `{"type": ..., "content": ...}`.
///
/// Keep handling exhaustive wherever this is consumed so an unknown fourth
/// kind fails loudly instead of falling through to text rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "kebab-case")]
pub enum MessageBody {
    Text(String),
    ContactRequest(String),
    /// Frozen snapshot of the sender's contact value at the moment of
    /// sharing. Later profile edits never touch it.
    ContactShare(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    #[serde(flatten)]
    pub body: MessageBody,
    /// Epoch millis. Messages are totally ordered by this, then by id.
    pub created_at: i64,
}

impl Message {
    pub fn sort_key(&self) -> (i64, &str) {
        (self.created_at, &self.id)
    }
}

/// Draft for the message-create endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    Text(String),
    ContactRequest,
    /// Content is left empty on the wire; the server fills in the sender's
    /// current contact value as the immutable snapshot.
    ContactShare,
}

impl Outgoing {
    /// Build a text draft, trimming whitespace. Empty content is rejected
    /// here, before any network call happens.
    pub fn text(input: &str) -> Result<Self, ApiError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ApiError::EmptyMessage);
        }
        Ok(Outgoing::Text(trimmed.to_string()))
    }

    pub fn wire(&self) -> serde_json::Value {
        match self {
            Outgoing::Text(content) => {
                serde_json::json!({ "type": "text", "content": content })
            }
            Outgoing::ContactRequest => {
                serde_json::json!({ "type": "contact-request", "content": "" })
            }
            Outgoing::ContactShare => {
                serde_json::json!({ "type": "contact-share", "content": "" })
            }
        }
    }
}
