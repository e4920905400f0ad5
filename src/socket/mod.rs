//! WebSocket socket layer with length-prefixed framing.
//!
//! Each frame is: 3-byte big-endian length (max 16MiB) then payload.
//! The WebSocket connector requires the `full` feature.

#[cfg(feature = "full")]
mod ws;

#[cfg(feature = "full")]
pub use ws::{FramedSend, WebSocketConnector};

/// Maximum frame body size (3-byte length = 2^24 - 1).
pub const MAX_FRAME_SIZE: usize = (1 << 24) - 1;

/// Prefix `payload` with its 3-byte big-endian length.
pub fn encode_frame(payload: &[u8]) -> crate::Result<Vec<u8>> {
    let len = payload.len();
    if len > MAX_FRAME_SIZE {
        return Err(crate::error::ConnectionError::FrameTooLarge(len).into());
    }
    let mut frame = Vec::with_capacity(3 + len);
    frame.extend_from_slice(&[(len >> 16) as u8, (len >> 8) as u8, len as u8]);
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Split a frame into its payload, checking the length prefix.
pub fn decode_frame(frame: &[u8]) -> Option<&[u8]> {
    if frame.len() < 3 {
        return None;
    }
    let (header, body) = frame.split_at(3);
    let len = ((header[0] as usize) << 16) | ((header[1] as usize) << 8) | (header[2] as usize);
    (body.len() == len).then_some(body)
}
