//! Send message types.

use crate::types::{Jid, MessageId};
use std::time::SystemTime;

/// Marker prepended to every outbound text.
pub const MESSAGE_TAG: &str = "[wtc]";

/// Outbound message content (the `conversation` field of a WhatsApp `Message`).
///
/// Built once through [`OutboundMessage::tagged`] and never modified; the text
/// always starts with [`MESSAGE_TAG`].
#[derive(Clone, PartialEq, prost::Message)]
pub struct OutboundMessage {
    #[prost(string, optional, tag = "1")]
    conversation: Option<String>,
}

impl OutboundMessage {
    /// Text message carrying `text` behind the [`MESSAGE_TAG`] marker.
    pub fn tagged(text: &str) -> Self {
        Self {
            conversation: Some(format!("{MESSAGE_TAG}{text}")),
        }
    }

    /// Full payload text, tag included.
    pub fn text(&self) -> &str {
        self.conversation.as_deref().unwrap_or_default()
    }
}

/// Frame handed to the transport for one send: message ID, recipient, content.
#[derive(Clone, PartialEq, prost::Message)]
pub struct SendRequest {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub to: String,
    #[prost(message, optional, tag = "3")]
    pub message: Option<OutboundMessage>,
}

/// Response from sending a message.
#[derive(Clone, Debug)]
pub struct SendResponse {
    pub timestamp: SystemTime,
    pub id: MessageId,
    pub sender: Option<Jid>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn tagged_prefixes_marker() {
        let msg = OutboundMessage::tagged("Hello, world!");
        assert_eq!(msg.text(), "[wtc]Hello, world!");
        assert_eq!(OutboundMessage::tagged("").text(), "[wtc]");
    }

    #[test]
    fn send_request_decodes_to_same_content() {
        let req = SendRequest {
            id: "3EB0AA".into(),
            to: "1@s.whatsapp.net".into(),
            message: Some(OutboundMessage::tagged("hi")),
        };
        let decoded = SendRequest::decode(req.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded.to, "1@s.whatsapp.net");
        assert_eq!(decoded.message.unwrap().text(), "[wtc]hi");
    }
}
