/// Errors that can occur in connection and server operations.
#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] schemaipc_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] schemaipc_frame::FrameError),

    /// Body encode/decode error.
    #[error("codec error: {0}")]
    Codec(#[from] schemaipc_codec::CodecError),

    /// Schema or registry configuration error.
    #[error("schema error: {0}")]
    Schema(#[from] schemaipc_schema::SchemaError),

    /// The peer sent a message type no descriptor is registered for.
    #[error("unknown message descriptor: {0}")]
    UnknownDescriptor(u32),

    /// The peer sent a message whose descriptor is server-to-client only.
    #[error("peer sent an outbound message ({0})")]
    InvalidDirection(u32),

    /// The peer sent a user message before the handshake completed.
    #[error("peer sent a user message before the handshake completed ({0})")]
    InvalidDescriptor(u32),

    /// No registered message carries the requested signature.
    #[error("no registered message named '{0}' for this direction")]
    UnknownMessage(String),

    /// The handshake exchange did not follow the protocol.
    #[error("handshake failed: {0}")]
    Handshake(String),
}

pub type Result<T> = std::result::Result<T, PeerError>;
