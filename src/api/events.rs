use serde::{Deserialize, Serialize};

/// Frames exchanged on the push channel.
///
/// The client sends one `Join` after connecting; the server then streams
/// `NewMessage` events for every conversation the joined user participates
/// in. The event only identifies the conversation, the message itself comes
/// from the next poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum PushFrame {
    Join {
        #[serde(rename = "userId")]
        user_id: String,
    },
    NewMessage {
        #[serde(rename = "conversationId")]
        conversation_id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_frame_wire_format() {
        let frame = PushFrame::Join { user_id: "u1".into() };
        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            serde_json::json!({ "event": "join", "userId": "u1" })
        );
    }

    #[test]
    fn new_message_frame_parses() {
        let frame: PushFrame =
            serde_json::from_str(r#"{"event":"new-message","conversationId":"c7"}"#).unwrap();
        assert_eq!(
            frame,
            PushFrame::NewMessage { conversation_id: "c7".into() }
        );
    }
}
