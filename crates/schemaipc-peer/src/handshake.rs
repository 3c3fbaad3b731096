//! The internal protocol: Hello exchange and Ping keepalive.
//!
//! A connection opens in `WaitHello`. The first user-visible obligation of
//! the server is to answer an inbound Hello with an outbound Hello carrying
//! its versions and the schema advertisement, flipping the connection to
//! `Established`. Version negotiation beyond that is application policy; the
//! default handlers accept every peer.

use std::sync::Arc;

use schemaipc_codec::record;
use schemaipc_schema::{MessageDirection, HELLO_OUTBOUND_ID, PING_ID};
use tracing::debug;

use crate::conn::Conn;
use crate::error::Result;
use crate::server::Registry;

record! {
    /// Body of the client's opening Hello (ID 0).
    pub struct HelloRequest {
        "minVersion" => pub min_version: i32 [i32],
        "currVersion" => pub curr_version: i32 [i32],
    }
}

record! {
    /// Body of the server's Hello reply (ID 1).
    pub struct HelloReply {
        "minVersion" => pub min_version: i32 [i32],
        "currVersion" => pub curr_version: i32 [i32],
        "schema" => pub schema: Vec<u8> [bytes],
        "descriptorRegistry" => pub descriptor_registry: Vec<u8> [bytes],
    }
}

record! {
    /// Body of the duplex Ping keepalive (ID 2).
    pub struct Ping {
        "timestamp" => pub timestamp: i64 [i64],
    }
}

/// Bind the default internal handlers onto a freshly registered registry.
pub(crate) fn install(registry: &mut Registry) -> Result<()> {
    registry.bind_internal_handler(
        MessageDirection::Inbound,
        "Hello",
        Arc::new(hello_handler),
    )?;
    registry.bind_internal_handler(MessageDirection::Inbound, "Ping", Arc::new(ping_handler))?;
    Ok(())
}

fn hello_handler(
    decoder: &mut schemaipc_codec::Decoder<'_>,
    conn: &Conn,
) -> Result<()> {
    let mut hello = HelloRequest::default();
    decoder.decode(&mut hello)?;

    debug!(
        peer = %conn.peer(),
        min = hello.min_version,
        curr = hello.curr_version,
        "hello received"
    );

    conn.establish();

    let shared = conn.shared();
    let reply = HelloReply {
        min_version: shared.min_version,
        curr_version: shared.curr_version,
        schema: shared.schema_advert.to_vec(),
        descriptor_registry: shared.registry_advert.to_vec(),
    };
    conn.send_by_id(HELLO_OUTBOUND_ID, &reply)
}

fn ping_handler(
    decoder: &mut schemaipc_codec::Decoder<'_>,
    conn: &Conn,
) -> Result<()> {
    let mut ping = Ping::default();
    decoder.decode(&mut ping)?;

    conn.send_by_id(
        PING_ID,
        &Ping {
            timestamp: ping.timestamp,
        },
    )
}
