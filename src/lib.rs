//! # wtc
//!
//! Send a single WhatsApp text message from the command line.
//!
//! A run loads (or creates) the first device identity from a local session
//! store, connects, waits for the QR code to be scanned if the device is not
//! paired yet, sends one message tagged with `[wtc]` and disconnects.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use wtc::{app, cli::Invocation, render::TerminalQr, store::MemoryStore, Client, Config, DeviceStore};
//!
//! #[tokio::main]
//! async fn main() -> wtc::Result<()> {
//!     let store = Arc::new(MemoryStore::new());
//!     let device = store.get_or_create_first_device().await?;
//!     let connector = Arc::new(wtc::socket::WebSocketConnector::new(wtc::client::DEFAULT_WS_URL));
//!     let client = Client::new(store, device, connector);
//!     let invocation = Invocation {
//!         recipient: wtc::types::normalize_recipient("15551234567"),
//!         text: "Hello, world!".into(),
//!     };
//!     app::run(&client, &invocation, &Config::default(), Arc::new(TerminalQr)).await?;
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod cli;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod handler;
pub mod pairing;
pub mod render;
pub mod socket;
pub mod store;
pub mod transport;
pub mod types;
pub mod waiter;

pub use client::{Client, CompletePairingParams, OutboundMessage, ProtocolClient, SendResponse};
pub use config::Config;
pub use error::{Error, Result};
pub use events::Event;
pub use store::{Device, DeviceStore, Store};
pub use transport::{Connection, Connector, Transport};
pub use types::Jid;
