//! Bridge from client events to the terminal and the pairing signal.

use crate::client::EventHandler;
use crate::events::Event;
use crate::render::QrRenderer;
use crate::waiter::PairingSignal;
use std::sync::Arc;

/// Reacts to the two events the send flow cares about: shows the first QR
/// code and fires the pairing signal on success. Everything else is ignored.
#[derive(Clone)]
pub struct PairingEventHandler {
    signal: PairingSignal,
    renderer: Arc<dyn QrRenderer>,
}

impl PairingEventHandler {
    pub fn new(signal: PairingSignal, renderer: Arc<dyn QrRenderer>) -> Self {
        Self { signal, renderer }
    }

    pub fn handle(&self, evt: Event) {
        match evt {
            Event::Qr { codes } => {
                let Some(code) = codes.first() else {
                    tracing::warn!("QR event without codes");
                    return;
                };
                tracing::info!("QR code received");
                if let Err(e) = self.renderer.render(code) {
                    tracing::error!(error = %e, "failed to render QR code");
                }
            }
            Event::PairSuccess { id, .. } => {
                if self.signal.fire() {
                    tracing::info!(jid = %id, "pairing succeeded");
                }
            }
            other => tracing::trace!(kind = other.kind(), "ignoring event"),
        }
    }

    /// Box the handler for [`ProtocolClient::add_event_handler`](crate::ProtocolClient::add_event_handler).
    pub fn into_event_handler(self) -> EventHandler {
        Box::new(move |evt| self.handle(evt))
    }
}
