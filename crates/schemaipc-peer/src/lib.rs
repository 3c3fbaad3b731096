//! Connection state machine and server runtime for schemaipc.
//!
//! A [`Server`] owns a frozen descriptor registry and serves framed
//! connections: each accepted endpoint gets a thread that reads frames,
//! validates direction, type and connection state, and dispatches bodies to
//! bound handlers. Connections open in `WaitHello` and are established by
//! the internal Hello exchange, which advertises the user schema on the
//! wire. A [`Client`] is the matching initiator side.

pub mod conn;
pub mod connector;
pub mod error;
pub mod handshake;
pub mod meta;
pub mod server;

pub use conn::{Conn, ConnState};
pub use connector::Client;
pub use error::{PeerError, Result};
pub use handshake::{HelloReply, HelloRequest, Ping};
pub use meta::{decode_registry_advert, decode_schema_advert, MetaDescriptor, MetaField};
pub use server::{
    Handler, OverflowPolicy, Registry, Server, ServerConfig, DEFAULT_MAX_MESSAGE_SIZE,
};
