//! Per-conversation message retrieval and polling reconciliation.
//!
//! An open conversation view fetches the full message snapshot once, then
//! re-fetches on a fixed timer. The fresh snapshot replaces the published
//! one only when the two differ structurally, so an unchanged conversation
//! produces no downstream churn while still converging within one interval.
//! The client never reorders or merges: the rendered list is always exactly
//! the server's order.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;

use crate::api::client::ChatBackend;
use crate::api::error::ApiError;
use crate::api::models::{Message, Outgoing};
use crate::contact::ContactSharePrompt;

pub const MESSAGE_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Replace the published snapshot only when the fresh fetch differs.
/// Returns whether a replacement happened; feeding the same snapshot twice
/// replaces once and then never again.
pub fn reconcile<T: PartialEq>(tx: &watch::Sender<T>, fresh: T) -> bool {
    tx.send_if_modified(|current| {
        if *current != fresh {
            *current = fresh;
            true
        } else {
            false
        }
    })
}

/// Handle for one open conversation.
///
/// Owns the poll timer: dropping the view (or calling [`close`]) releases it
/// on every path, so a torn-down view can never keep polling in the
/// background.
///
/// [`close`]: ConversationView::close
pub struct ConversationView {
    conversation_id: String,
    backend: Arc<dyn ChatBackend>,
    messages: watch::Receiver<Vec<Message>>,
    refresh: Arc<Notify>,
    task: JoinHandle<()>,
}

impl ConversationView {
    pub fn open(backend: Arc<dyn ChatBackend>, conversation_id: &str) -> Self {
        Self::open_with_interval(backend, conversation_id, MESSAGE_POLL_INTERVAL)
    }

    pub fn open_with_interval(
        backend: Arc<dyn ChatBackend>,
        conversation_id: &str,
        interval: Duration,
    ) -> Self {
        let (tx, rx) = watch::channel(Vec::new());
        let refresh = Arc::new(Notify::new());
        let task = tokio::spawn(poll_loop(
            Arc::clone(&backend),
            conversation_id.to_string(),
            tx,
            Arc::clone(&refresh),
            interval,
        ));
        Self {
            conversation_id: conversation_id.to_string(),
            backend,
            messages: rx,
            refresh,
            task,
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Watch the message snapshot. The receiver sees one change per actual
    /// server-side difference, never one per poll tick.
    pub fn messages(&self) -> watch::Receiver<Vec<Message>> {
        self.messages.clone()
    }

    /// Send a text message. Empty-after-trim content is rejected before any
    /// network call. On success one immediate reconciliation pass is forced
    /// so the message's canonical id and ordering land without waiting for
    /// the next tick.
    pub async fn send_text(&self, input: &str) -> Result<Message, ApiError> {
        let outgoing = Outgoing::text(input)?;
        let msg = self
            .backend
            .send_message(&self.conversation_id, outgoing)
            .await?;
        self.refresh.notify_one();
        Ok(msg)
    }

    /// Begin a contact share. Nothing is transmitted until the returned
    /// prompt is explicitly confirmed.
    pub fn share_contact(&self) -> ContactSharePrompt {
        ContactSharePrompt::new(
            Arc::clone(&self.backend),
            self.conversation_id.clone(),
            Arc::clone(&self.refresh),
        )
    }

    /// Close the view, releasing the poll timer.
    pub fn close(self) {}
}

impl Drop for ConversationView {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn poll_loop(
    backend: Arc<dyn ChatBackend>,
    conversation_id: String,
    tx: watch::Sender<Vec<Message>>,
    refresh: Arc<Notify>,
    interval: Duration,
) {
    loop {
        match backend.fetch_messages(&conversation_id).await {
            Ok(snapshot) => {
                reconcile(&tx, snapshot);
            }
            // The expiry signal already went out; retrying would just spam
            // the server with doomed requests.
            Err(e) if e.is_handled() => {
                log::debug!("message poll for {conversation_id} stopped: {e}");
                break;
            }
            // Fail soft: keep the previous snapshot until the next tick.
            Err(e) => log::warn!("message poll for {conversation_id} failed: {e}"),
        }
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = refresh.notified() => {}
        }
    }
}
