//! WebSocket client connection (requires `full` feature).

use crate::error::ConnectionError;
use crate::transport::{Connection, Connector, Transport, INBOUND_CAPACITY};
use crate::Result;
use async_trait::async_trait;
use futures::sink::SinkExt;
use futures::stream::{SplitSink, SplitStream, StreamExt};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::Message;

use super::{decode_frame, encode_frame};

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

fn ws_error(e: impl std::fmt::Display) -> crate::Error {
    ConnectionError::WebSocket(e.to_string()).into()
}

/// Send half of a framed WebSocket: implements Transport.
pub struct FramedSend {
    writer: Mutex<SplitSink<WsStream, Message>>,
}

impl FramedSend {
    /// Write one frame as a single WebSocket binary message: 3-byte length + body.
    pub async fn send_frame(&self, data: &[u8]) -> Result<()> {
        let frame = encode_frame(data)?;
        let mut w = self.writer.lock().await;
        w.send(Message::Binary(frame)).await.map_err(ws_error)?;
        Ok(())
    }
}

#[async_trait]
impl Transport for FramedSend {
    async fn send(&self, data: &[u8]) -> Result<()> {
        self.send_frame(data).await
    }

    async fn close(&self) -> Result<()> {
        let mut w = self.writer.lock().await;
        w.close().await.map_err(ws_error)?;
        Ok(())
    }
}

/// Opens WebSocket transports to a fixed URL.
#[derive(Clone, Debug)]
pub struct WebSocketConnector {
    url: String,
}

impl WebSocketConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self) -> Result<Connection> {
        tracing::debug!(url = %self.url, "opening websocket");
        let (ws_stream, _response) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(ws_error)?;
        let (write_half, read_half) = ws_stream.split();
        let (tx, rx) = mpsc::channel(INBOUND_CAPACITY);
        tokio::spawn(read_frames(read_half, tx));
        let transport = Arc::new(FramedSend {
            writer: Mutex::new(write_half),
        });
        Ok(Connection::new(transport, rx))
    }
}

/// Forward inbound frame bodies to `tx` until the socket or the receiver closes.
async fn read_frames(mut reader: SplitStream<WsStream>, tx: mpsc::Sender<Vec<u8>>) {
    while let Some(msg) = reader.next().await {
        match msg {
            Ok(Message::Binary(data)) => match decode_frame(&data) {
                Some(body) => {
                    tracing::debug!(len = body.len(), "incoming frame");
                    if tx.send(body.to_vec()).await.is_err() {
                        break;
                    }
                }
                None => tracing::warn!(len = data.len(), "malformed frame"),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(error = %e, "websocket read ended");
                break;
            }
        }
    }
}
