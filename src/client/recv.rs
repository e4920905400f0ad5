//! Inbound server frames.

/// Pair-success notification sent once the QR code has been scanned.
#[derive(Clone, PartialEq, prost::Message)]
pub struct PairSuccessNode {
    /// Device identity payload followed by its HMAC-SHA256 tag, keyed with the
    /// device's adv secret.
    #[prost(bytes = "vec", tag = "1")]
    pub device_identity: Vec<u8>,
    #[prost(string, tag = "2")]
    pub business_name: String,
    #[prost(string, tag = "3")]
    pub platform: String,
    #[prost(string, tag = "4")]
    pub jid: String,
    #[prost(string, tag = "5")]
    pub lid: String,
}

/// Envelope for every inbound frame body. Frames this client does not act on
/// decode with every field unset.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ServerFrame {
    #[prost(message, optional, tag = "1")]
    pub pair_success: Option<PairSuccessNode>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn unrelated_frame_has_no_pair_success() {
        // Field 9, varint 1: unknown to ServerFrame.
        let frame = ServerFrame::decode([0x48, 0x01].as_slice()).unwrap();
        assert!(frame.pair_success.is_none());
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(ServerFrame::decode([0x0a, 0xff].as_slice()).is_err());
    }
}
