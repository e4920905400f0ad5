use std::time::Duration;
use thiserror::Error;

use crate::types::JidParseError;

/// Library result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can end a `wtc` run.
///
/// Every variant is terminal: the process reports it on one line and exits
/// with [`Error::exit_code`].
#[derive(Error, Debug)]
pub enum Error {
    /// Too few command-line arguments. Carries the usage text to print.
    #[error("{0}")]
    Usage(String),

    /// `--help` or `--version` was requested. Carries the text to print.
    #[error("{0}")]
    Help(String),

    #[error("store: {0}")]
    Store(#[from] StoreError),

    #[error("failed to get device: {0}")]
    Device(StoreError),

    #[error("connection: {0}")]
    Connection(#[from] ConnectionError),

    #[error("pairing: {0}")]
    Pairing(#[from] PairingError),

    #[error("timeout waiting for QR code scan after {}s", .0.as_secs())]
    PairingTimeout(Duration),

    #[error("invalid recipient: {0}")]
    InvalidRecipient(#[from] JidParseError),

    #[error("send failed: {0}")]
    Send(#[from] SendError),

    #[error("not connected")]
    NotConnected,

    #[error("not logged in")]
    NotLoggedIn,

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Process exit status for this error. Every failure maps to 1; only an
    /// explicit help or version request exits 0.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Help(_) => 0,
            _ => 1,
        }
    }

    /// True when the message is command-line text for stdout rather than a
    /// runtime failure.
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Usage(_) | Self::Help(_))
    }
}

/// Connection-related errors.
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("websocket: {0}")]
    WebSocket(String),

    #[error("no transport available (built without the `full` feature)")]
    NoTransport,

    #[error("frame too large ({0} bytes)")]
    FrameTooLarge(usize),

    #[error("disconnected")]
    Disconnected,
}

/// Pairing-related errors.
#[derive(Error, Debug)]
pub enum PairingError {
    #[error("invalid device identity HMAC")]
    InvalidDeviceIdentityHmac,

    #[error("protocol: {0}")]
    Protocol(String),
}

/// Store (device/session) errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("open failed: {0}")]
    Open(String),

    #[error("save failed: {0}")]
    Save(String),

    #[error("load failed: {0}")]
    Load(String),

    #[error("no device available")]
    NoDevice,
}

/// Send message errors.
#[derive(Error, Debug)]
pub enum SendError {
    #[error("transport: {0}")]
    Transport(String),

    #[error("timeout waiting for response")]
    Timeout,

    #[error("server error: {0}")]
    Server(String),
}
