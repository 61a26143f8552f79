//! The confirmation gate in front of contact disclosure.
//!
//! Sharing contact information is irreversible: the resulting message holds
//! a frozen snapshot of the sender's contact value and stays in the history
//! for both participants. There is no unshare. The prompt below is the only
//! place this crate produces a contact-share draft, so the explicit-consent
//! step is structural rather than a UI convention.
//!
//! The raw contact value itself never leaves the client here: the draft
//! goes out with empty content and the server freezes the sender's current
//! value into the stored message. To the recipient it is opaque message
//! content like any other; the type tag exists for rendering only.

use std::sync::Arc;

use tokio::sync::Notify;

use crate::api::client::ChatBackend;
use crate::api::error::ApiError;
use crate::api::models::{Message, Outgoing};

/// A pending contact share awaiting the user's decision.
///
/// Obtained from [`ConversationView::share_contact`]; consumed by either
/// [`confirm`] or [`decline`], so a prompt cannot be submitted twice.
///
/// [`ConversationView::share_contact`]: crate::sync::ConversationView::share_contact
/// [`confirm`]: ContactSharePrompt::confirm
/// [`decline`]: ContactSharePrompt::decline
#[must_use = "a contact share does nothing until confirmed or declined"]
pub struct ContactSharePrompt {
    backend: Arc<dyn ChatBackend>,
    conversation_id: String,
    refresh: Arc<Notify>,
}

impl ContactSharePrompt {
    pub(crate) fn new(
        backend: Arc<dyn ChatBackend>,
        conversation_id: String,
        refresh: Arc<Notify>,
    ) -> Self {
        Self {
            backend,
            conversation_id,
            refresh,
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// The user confirmed: submit the share and force a reconciliation pass
    /// so the new message shows up immediately.
    pub async fn confirm(self) -> Result<Message, ApiError> {
        let msg = self
            .backend
            .send_message(&self.conversation_id, Outgoing::ContactShare)
            .await?;
        self.refresh.notify_one();
        Ok(msg)
    }

    /// The user backed out. Nothing is transmitted.
    pub fn decline(self) {}
}
