//! Conversation listing and idempotent pair lookup.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::api::client::ChatBackend;
use crate::api::error::ApiError;
use crate::api::models::Conversation;
use crate::storage::ConversationCache;
use crate::sync::reconcile;

pub const LIST_POLL_INTERVAL: Duration = Duration::from_secs(5);

pub struct ConversationDirectory {
    backend: Arc<dyn ChatBackend>,
    cache: Option<ConversationCache>,
}

impl ConversationDirectory {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            backend,
            cache: None,
        }
    }

    /// Persist fetched summaries so the list can render instantly on the
    /// next launch, before the first fetch lands.
    pub fn with_cache(backend: Arc<dyn ChatBackend>, cache: ConversationCache) -> Self {
        Self {
            backend,
            cache: Some(cache),
        }
    }

    /// Summaries cached by a previous run, most recently updated first.
    pub fn cached(&self, limit: usize) -> Vec<Conversation> {
        match &self.cache {
            Some(cache) => cache.recent(limit).unwrap_or_else(|e| {
                log::warn!("conversation cache read failed: {e}");
                Vec::new()
            }),
            None => Vec::new(),
        }
    }

    /// One on-demand fetch, most recently updated first. The server's order
    /// is published as-is.
    pub async fn list(&self) -> Result<Vec<Conversation>, ApiError> {
        let conversations = self.backend.list_conversations().await?;
        self.store(&conversations);
        Ok(conversations)
    }

    /// Existing conversation with `target_user_id` or a freshly created
    /// one. Safe to call repeatedly for the same pair: the backend keys
    /// conversations by the unordered participant pair and always returns
    /// the same id.
    pub async fn open_or_create(&self, target_user_id: &str) -> Result<Conversation, ApiError> {
        self.backend.open_or_create(target_user_id).await
    }

    /// Start the 5-second list poll for the time the list view is active.
    /// Drop the handle when the view goes away; an inactive view must not
    /// generate idle network load.
    pub fn watch(&self) -> DirectoryWatch {
        self.watch_every(LIST_POLL_INTERVAL)
    }

    pub fn watch_every(&self, interval: Duration) -> DirectoryWatch {
        let backend = Arc::clone(&self.backend);
        let cache = self.cache.clone();
        let (tx, rx) = watch::channel(Vec::new());
        let task = tokio::spawn(async move {
            loop {
                match backend.list_conversations().await {
                    Ok(conversations) => {
                        if let Some(cache) = &cache {
                            if let Err(e) = cache.upsert(&conversations) {
                                log::warn!("conversation cache update failed: {e}");
                            }
                        }
                        reconcile(&tx, conversations);
                    }
                    Err(e) if e.is_handled() => {
                        log::debug!("conversation list poll stopped: {e}");
                        break;
                    }
                    Err(e) => log::warn!("conversation list poll failed: {e}"),
                }
                tokio::time::sleep(interval).await;
            }
        });
        DirectoryWatch { rx, task }
    }

    fn store(&self, conversations: &[Conversation]) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.upsert(conversations) {
                log::warn!("conversation cache update failed: {e}");
            }
        }
    }
}

/// Running list poll. Dropping it stops the timer.
pub struct DirectoryWatch {
    rx: watch::Receiver<Vec<Conversation>>,
    task: JoinHandle<()>,
}

impl DirectoryWatch {
    pub fn conversations(&self) -> watch::Receiver<Vec<Conversation>> {
        self.rx.clone()
    }

    pub fn stop(self) {}
}

impl Drop for DirectoryWatch {
    fn drop(&mut self) {
        self.task.abort();
    }
}
