//! Schema-driven binary IPC.
//!
//! A process declares a schema of named, directional messages, binds
//! handlers to the inbound ones, and serves framed connections. Each
//! connection opens with a Hello handshake in which the server advertises
//! its schema on the wire; afterwards both sides exchange length-prefixed
//! typed messages decoded straight into user structs.
//!
//! # Crate Structure
//!
//! - [`transport`] — byte-stream listener/stream abstraction (TCP, UDS)
//! - [`frame`] — 8-byte header framing (payload length + message type ID)
//! - [`schema`] — schema model and descriptor registry
//! - [`codec`] — schema-guided encoder/decoder and record binding
//! - [`peer`] — connection state machine, handshake, server and client

/// Re-export transport types.
pub mod transport {
    pub use schemaipc_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use schemaipc_frame::*;
}

/// Re-export schema types.
pub mod schema {
    pub use schemaipc_schema::*;
}

/// Re-export codec types.
pub mod codec {
    pub use schemaipc_codec::*;
}

/// Re-export peer types.
pub mod peer {
    pub use schemaipc_peer::*;
}
