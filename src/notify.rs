//! Push-channel subscription and unread-state propagation.
//!
//! One websocket per login, joined to the user's own room right after the
//! handshake. The connection lives for the whole session: switching views
//! never reconnects, only logout tears it down. Inbound "new message"
//! events for conversations other than the currently open one set that
//! conversation's unread flag and emit a transient notice; events for the
//! open conversation carry no news the 3-second poll will not deliver.
//! Unread flags are process-local, never persisted.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use url::Url;

use crate::api::error::ApiError;
use crate::api::events::PushFrame;

/// Delay before re-dialing after the channel drops. Fixed, no backoff.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// A transient "new message elsewhere" signal for the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub conversation_id: String,
}

/// Per-conversation unread flags plus the currently open conversation.
#[derive(Debug, Default)]
pub struct UnreadState {
    unread: HashSet<String>,
    active: Option<String>,
}

impl UnreadState {
    /// Apply one inbound frame. Returns a notice when the event concerns a
    /// conversation that is not currently open.
    pub fn apply(&mut self, frame: &PushFrame) -> Option<Notice> {
        match frame {
            PushFrame::NewMessage { conversation_id } => {
                if self.active.as_deref() == Some(conversation_id.as_str()) {
                    // The open view's poll converges on its own.
                    None
                } else {
                    self.unread.insert(conversation_id.clone());
                    Some(Notice {
                        conversation_id: conversation_id.clone(),
                    })
                }
            }
            // Client -> server only; a server echo carries no state.
            PushFrame::Join { .. } => None,
        }
    }

    pub fn open_conversation(&mut self, conversation_id: &str) {
        self.active = Some(conversation_id.to_string());
        self.unread.remove(conversation_id);
    }

    pub fn close_conversation(&mut self) {
        self.active = None;
    }

    pub fn clear_all(&mut self) {
        self.unread.clear();
    }

    pub fn is_unread(&self, conversation_id: &str) -> bool {
        self.unread.contains(conversation_id)
    }
}

/// The per-login push channel.
pub struct NotificationBus {
    state: Arc<Mutex<UnreadState>>,
    task: JoinHandle<()>,
}

impl NotificationBus {
    /// Establish the channel once after login. Returns the bus and the
    /// notice stream for the UI layer.
    pub fn connect(ws_url: Url, user_id: String) -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let state = Arc::new(Mutex::new(UnreadState::default()));
        let (notices, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_channel(ws_url, user_id, Arc::clone(&state), notices));
        (Self { state, task }, rx)
    }

    /// Mark a conversation as the open one and clear its unread flag.
    pub fn open_conversation(&self, conversation_id: &str) {
        self.state.lock().unwrap().open_conversation(conversation_id);
    }

    pub fn close_conversation(&self) {
        self.state.lock().unwrap().close_conversation();
    }

    /// Opening the messages tab clears every flag.
    pub fn open_messages_tab(&self) {
        self.state.lock().unwrap().clear_all();
    }

    pub fn is_unread(&self, conversation_id: &str) -> bool {
        self.state.lock().unwrap().is_unread(conversation_id)
    }

    /// Tear the channel down at logout.
    pub fn disconnect(self) {}
}

impl Drop for NotificationBus {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_channel(
    ws_url: Url,
    user_id: String,
    state: Arc<Mutex<UnreadState>>,
    notices: mpsc::UnboundedSender<Notice>,
) {
    loop {
        if let Err(e) = run_connection(&ws_url, &user_id, &state, &notices).await {
            log::warn!("push channel dropped: {e}");
        }
        if notices.is_closed() {
            return;
        }
        log::info!("reconnecting push channel in {:?}", RECONNECT_DELAY);
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}

async fn run_connection(
    ws_url: &Url,
    user_id: &str,
    state: &Mutex<UnreadState>,
    notices: &mpsc::UnboundedSender<Notice>,
) -> Result<(), ApiError> {
    let (mut stream, _) = connect_async(ws_url.as_str())
        .await
        .map_err(|e| ApiError::Push(e.to_string()))?;
    log::debug!("push channel connected, joining room {user_id}");

    let join = PushFrame::Join {
        user_id: user_id.to_string(),
    };
    let text = serde_json::to_string(&join)?;
    stream
        .send(WsMessage::Text(text))
        .await
        .map_err(|e| ApiError::Push(e.to_string()))?;

    while let Some(inbound) = stream.next().await {
        match inbound.map_err(|e| ApiError::Push(e.to_string()))? {
            WsMessage::Text(text) => match serde_json::from_str::<PushFrame>(&text) {
                Ok(frame) => {
                    let notice = state.lock().unwrap().apply(&frame);
                    if let Some(notice) = notice {
                        if notices.send(notice).is_err() {
                            return Ok(());
                        }
                    }
                }
                Err(e) => log::debug!("unrecognized push frame: {e}"),
            },
            WsMessage::Close(_) => break,
            // Pings are answered by the protocol layer.
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_message(id: &str) -> PushFrame {
        PushFrame::NewMessage {
            conversation_id: id.into(),
        }
    }

    #[test]
    fn event_for_other_conversation_sets_flag_and_notice() {
        let mut state = UnreadState::default();
        state.open_conversation("c1");

        let notice = state.apply(&new_message("c2"));
        assert_eq!(
            notice,
            Some(Notice {
                conversation_id: "c2".into()
            })
        );
        assert!(state.is_unread("c2"));
        assert!(!state.is_unread("c1"));
    }

    #[test]
    fn event_for_open_conversation_is_informational() {
        let mut state = UnreadState::default();
        state.open_conversation("c1");

        assert_eq!(state.apply(&new_message("c1")), None);
        assert!(!state.is_unread("c1"));
    }

    #[test]
    fn opening_a_conversation_clears_its_flag() {
        let mut state = UnreadState::default();
        state.apply(&new_message("c3"));
        assert!(state.is_unread("c3"));

        state.open_conversation("c3");
        assert!(!state.is_unread("c3"));
    }

    #[test]
    fn closing_the_view_makes_events_flag_again() {
        let mut state = UnreadState::default();
        state.open_conversation("c1");
        assert_eq!(state.apply(&new_message("c1")), None);

        state.close_conversation();
        assert!(state.apply(&new_message("c1")).is_some());
        assert!(state.is_unread("c1"));
    }

    #[test]
    fn messages_tab_clears_everything() {
        let mut state = UnreadState::default();
        state.apply(&new_message("c1"));
        state.apply(&new_message("c2"));

        state.clear_all();
        assert!(!state.is_unread("c1"));
        assert!(!state.is_unread("c2"));
    }

    #[test]
    fn join_echo_is_ignored() {
        let mut state = UnreadState::default();
        let frame = PushFrame::Join {
            user_id: "u1".into(),
        };
        assert_eq!(state.apply(&frame), None);
    }
}
