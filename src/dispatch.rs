//! Turning a recipient and text into one send call.

use crate::client::{OutboundMessage, ProtocolClient, SendResponse};
use crate::types::Jid;
use crate::{Error, Result};

/// Sends exactly one tagged text message through a [`ProtocolClient`].
pub struct MessageDispatcher<'a> {
    client: &'a dyn ProtocolClient,
}

impl<'a> MessageDispatcher<'a> {
    pub fn new(client: &'a dyn ProtocolClient) -> Self {
        Self { client }
    }

    /// Parse `recipient`, build the tagged message and send it once.
    ///
    /// `recipient` must already be normalized. A malformed address fails with
    /// [`Error::InvalidRecipient`] before anything is sent; a send failure is
    /// returned as [`Error::Send`] and never retried.
    pub async fn dispatch(&self, recipient: &str, text: &str) -> Result<SendResponse> {
        let jid: Jid = recipient.parse()?;
        let message = OutboundMessage::tagged(text);
        match self.client.send_message(&jid, &message).await {
            Ok(resp) => {
                tracing::info!(to = %jid, id = %resp.id, "message sent");
                Ok(resp)
            }
            Err(e @ Error::Send(_)) => Err(e),
            Err(e) => Err(Error::Send(crate::error::SendError::Transport(e.to_string()))),
        }
    }
}
