use bytes::{BufMut, BytesMut};

/// Frame header: payload length (4) + message type ID (4) = 8 bytes.
pub const HEADER_SIZE: usize = 8;

/// The fixed header preceding every message body.
///
/// Wire format:
/// ```text
/// ┌────────────────────┬────────────────────┬───────────────────────┐
/// │ Payload length     │ Message type ID    │ Body                  │
/// │ (4B LE)            │ (4B LE)            │ (payload_len bytes)   │
/// └────────────────────┴────────────────────┴───────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Number of body bytes that follow the header.
    pub payload_len: u32,
    /// Descriptor ID of the message the body encodes.
    pub type_id: u32,
}

/// Append a header to the wire buffer.
pub fn encode_header(header: FrameHeader, dst: &mut BytesMut) {
    dst.reserve(HEADER_SIZE);
    dst.put_u32_le(header.payload_len);
    dst.put_u32_le(header.type_id);
}

/// Parse a raw 8-byte header.
pub fn parse_header(raw: [u8; HEADER_SIZE]) -> FrameHeader {
    FrameHeader {
        payload_len: u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]),
        type_id: u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]),
    }
}
