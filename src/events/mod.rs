//! Event types emitted by the client.

use crate::types::Jid;

/// Events emitted by a [`ProtocolClient`](crate::ProtocolClient) to registered handlers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// QR codes for pairing. Show them one by one (first ~60s, others ~20s).
    Qr { codes: Vec<String> },

    /// Pairing completed after scanning QR.
    PairSuccess {
        id: Jid,
        lid: Jid,
        business_name: String,
        platform: String,
    },

    /// Pairing failed after pair-success from server.
    PairError { id: Jid, error: String },

    /// Client connected and authenticated.
    Connected,

    /// Logged out from another device or rejected on connect.
    LoggedOut { on_connect: bool },

    /// Connection closed.
    Disconnected { reason: String },
}

impl Event {
    /// Short name used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Qr { .. } => "qr",
            Self::PairSuccess { .. } => "pair_success",
            Self::PairError { .. } => "pair_error",
            Self::Connected => "connected",
            Self::LoggedOut { .. } => "logged_out",
            Self::Disconnected { .. } => "disconnected",
        }
    }
}
