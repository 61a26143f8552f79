use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde_json::Value;

use crate::api::error::ApiError;
use crate::api::models::{Conversation, Credentials, Message, Outgoing, UserData};
use crate::session::{Session, SessionGuard};

/// The REST surface the sync subsystem consumes.
///
/// Implemented over HTTP by [`ApiClient`]; the directory, sync engine and
/// contact policy only ever see this trait, so tests run them against an
/// in-process backend.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Conversation summaries for the authenticated user, most recently
    /// updated first. The server's order is trusted as-is.
    async fn list_conversations(&self) -> Result<Vec<Conversation>, ApiError>;

    /// Existing conversation with `target_user_id`, or a newly created one.
    /// Idempotent server-side: the same pair always yields the same id.
    async fn open_or_create(&self, target_user_id: &str) -> Result<Conversation, ApiError>;

    /// Full ordered message snapshot. No incremental deltas.
    async fn fetch_messages(&self, conversation_id: &str) -> Result<Vec<Message>, ApiError>;

    /// Append a message and return it with its canonical id and timestamp.
    async fn send_message(
        &self,
        conversation_id: &str,
        outgoing: Outgoing,
    ) -> Result<Message, ApiError>;
}

pub struct ApiClient {
    http: HttpClient,
    base_url: String,
    guard: Arc<SessionGuard>,
}

impl ApiClient {
    pub fn new(base_url: &str, guard: Arc<SessionGuard>) -> Self {
        Self {
            http: HttpClient::new(),
            base_url: base_api(base_url),
            guard,
        }
    }

    /// Authenticate and install the returned session. A rejection here is a
    /// normal failed login, never an expiry signal.
    pub async fn login(&self, credentials: &Credentials) -> Result<UserData, ApiError> {
        let endpoint = format!("{}/auth/login", self.base_url);
        let resp = self.http.post(&endpoint).json(credentials).send().await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let detail = read_error(resp).await;
            return Err(self.guard.reject(status, true, detail));
        }
        let user: UserData = serde_json::from_value(resp.json::<Value>().await?)?;
        match user.token.clone() {
            Some(token) => {
                self.guard.install(Session {
                    user_id: user.id.clone(),
                    token,
                });
                Ok(user)
            }
            None => Err(ApiError::Rejected("login response carried no token".into())),
        }
    }

    pub fn logout(&self) {
        self.guard.clear();
    }

    pub fn guard(&self) -> &Arc<SessionGuard> {
        &self.guard
    }

    async fn get(&self, path: &str) -> Result<Value, ApiError> {
        let endpoint = format!("{}{}", self.base_url, path);
        self.request(self.http.get(&endpoint)).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        let endpoint = format!("{}{}", self.base_url, path);
        self.request(self.http.post(&endpoint).json(body)).await
    }

    async fn request(&self, req: reqwest::RequestBuilder) -> Result<Value, ApiError> {
        let resp = self.guard.bearer(req).send().await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let detail = read_error(resp).await;
            return Err(self.guard.reject(status, false, detail));
        }
        Ok(resp.json::<Value>().await?)
    }
}

#[async_trait]
impl ChatBackend for ApiClient {
    async fn list_conversations(&self) -> Result<Vec<Conversation>, ApiError> {
        let json = self.get("/conversations").await?;
        Ok(serde_json::from_value(json)?)
    }

    async fn open_or_create(&self, target_user_id: &str) -> Result<Conversation, ApiError> {
        let body = serde_json::json!({ "targetUserId": target_user_id });
        let json = self.post("/conversations/open-or-create", &body).await?;
        Ok(serde_json::from_value(json)?)
    }

    async fn fetch_messages(&self, conversation_id: &str) -> Result<Vec<Message>, ApiError> {
        let json = self
            .get(&format!("/conversations/{}/messages", conversation_id))
            .await?;
        Ok(serde_json::from_value(json)?)
    }

    async fn send_message(
        &self,
        conversation_id: &str,
        outgoing: Outgoing,
    ) -> Result<Message, ApiError> {
        let json = self
            .post(
                &format!("/conversations/{}/messages", conversation_id),
                &outgoing.wire(),
            )
            .await?;
        Ok(serde_json::from_value(json)?)
    }
}

fn base_api(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    if trimmed.ends_with("/api") {
        trimmed.to_string()
    } else {
        format!("{}/api", trimmed)
    }
}

/// Pull the server's error message out of a failed response body, falling
/// back to the bare status line.
async fn read_error(resp: reqwest::Response) -> String {
    let status = resp.status();
    match resp.json::<Value>().await {
        Ok(body) => body
            .get("error")
            .or_else(|| body.get("message"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("HTTP {}", status)),
        Err(_) => format!("HTTP {}", status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_api_appends_suffix_once() {
        assert_eq!(base_api("https://example.com"), "https://example.com/api");
        assert_eq!(base_api("https://example.com/"), "https://example.com/api");
        assert_eq!(base_api("https://example.com/api"), "https://example.com/api");
    }
}
