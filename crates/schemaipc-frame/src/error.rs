/// Errors that can occur while reading or writing frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The stream ended inside a frame header.
    #[error("invalid header length (must be 8 bytes)")]
    HeaderLength,

    /// The stream ended before `payload_length` body bytes arrived.
    #[error("invalid payload length (body ended early)")]
    PayloadLength,

    /// An inbound payload exceeds the configured message size limit.
    #[error("exceeded message limit ({size} bytes, max {max})")]
    MessageTooLarge { size: u32, max: u32 },

    /// An outbound payload does not fit the 32-bit length field.
    #[error("payload too large ({size} bytes)")]
    PayloadTooLarge { size: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed at a frame boundary.
    #[error("connection closed")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
