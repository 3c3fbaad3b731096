//! Client-side connection: handshake, typed send/receive.
//!
//! The client mirrors the server's registry from the same schema so its IDs
//! line up, opens with an inbound Hello, and records the versions and schema
//! advertisement the server replies with.

use bytes::Bytes;
use schemaipc_codec::{encode, Decoder, Record};
use schemaipc_frame::{FrameHeader, FrameReader, FrameWriter};
use schemaipc_schema::{
    DescriptorRegistry, MessageDirection, Schema, HELLO_INBOUND_ID, HELLO_OUTBOUND_ID, PING_ID,
};
use schemaipc_transport::IpcStream;
use tracing::debug;

use crate::error::{PeerError, Result};
use crate::handshake::{HelloReply, HelloRequest, Ping};
use crate::meta::{decode_schema_advert, MetaDescriptor};

/// A connected, handshaken client endpoint.
pub struct Client {
    reader: FrameReader<IpcStream>,
    writer: FrameWriter<IpcStream>,
    registry: DescriptorRegistry<()>,
    server_min_version: i32,
    server_curr_version: i32,
    advertised: Vec<MetaDescriptor>,
}

impl Client {
    /// Connect and perform the handshake with protocol versions 1/1.
    pub fn connect(network: &str, address: &str, schema: Schema) -> Result<Self> {
        Self::connect_with_versions(network, address, schema, 1, 1)
    }

    /// Connect and perform the handshake with explicit protocol versions.
    pub fn connect_with_versions(
        network: &str,
        address: &str,
        schema: Schema,
        min_version: i32,
        curr_version: i32,
    ) -> Result<Self> {
        let stream = schemaipc_transport::connect(network, address)?;
        Self::from_stream(stream, schema, min_version, curr_version)
    }

    /// Perform the handshake over an already-connected endpoint.
    pub fn from_stream(
        stream: IpcStream,
        schema: Schema,
        min_version: i32,
        curr_version: i32,
    ) -> Result<Self> {
        let reader_stream = stream.try_clone()?;

        let mut registry = DescriptorRegistry::new();
        registry.register_internal()?;
        registry.register_schema(schema)?;

        let mut client = Self {
            reader: FrameReader::new(reader_stream),
            writer: FrameWriter::new(stream),
            registry,
            server_min_version: 0,
            server_curr_version: 0,
            advertised: Vec::new(),
        };
        client.handshake(min_version, curr_version)?;
        Ok(client)
    }

    fn handshake(&mut self, min_version: i32, curr_version: i32) -> Result<()> {
        self.send_by_id(
            HELLO_INBOUND_ID,
            &HelloRequest {
                min_version,
                curr_version,
            },
        )?;

        let (header, payload) = self.read_frame()?;
        if header.type_id != HELLO_OUTBOUND_ID {
            return Err(PeerError::Handshake(format!(
                "expected hello reply, got message {}",
                header.type_id
            )));
        }

        let mut reply = HelloReply::default();
        self.decode_by_id(HELLO_OUTBOUND_ID, &payload, &mut reply)?;

        debug!(
            min = reply.min_version,
            curr = reply.curr_version,
            "hello reply received"
        );

        self.server_min_version = reply.min_version;
        self.server_curr_version = reply.curr_version;
        self.advertised = decode_schema_advert(&reply.schema)?;
        Ok(())
    }

    /// Versions the server announced in its Hello reply.
    pub fn server_versions(&self) -> (i32, i32) {
        (self.server_min_version, self.server_curr_version)
    }

    /// Descriptors the server advertised in its Hello reply.
    pub fn advertised(&self) -> &[MetaDescriptor] {
        &self.advertised
    }

    /// Encode `record` against the inbound user message `name` and send it.
    pub fn send(&mut self, name: &str, record: &dyn Record) -> Result<()> {
        let id = self
            .registry
            .lookup_user(MessageDirection::Inbound, name)
            .ok_or_else(|| PeerError::UnknownMessage(name.to_string()))?;
        self.send_by_id(id, record)
    }

    /// Receive the next frame undecoded.
    pub fn recv(&mut self) -> Result<(u32, Bytes)> {
        let (header, payload) = self.read_frame()?;
        Ok((header.type_id, payload))
    }

    /// Receive the next frame and decode it into `record`; returns the
    /// frame's descriptor ID.
    pub fn recv_into(&mut self, record: &mut dyn Record) -> Result<u32> {
        let (header, payload) = self.read_frame()?;
        let descriptor = self
            .registry
            .lookup(header.type_id)
            .ok_or(PeerError::UnknownDescriptor(header.type_id))?;
        Decoder::new(&payload, &descriptor.message).decode_dyn(record)?;
        Ok(header.type_id)
    }

    /// Send a Ping and wait for its echo; returns the echoed timestamp.
    pub fn ping(&mut self, timestamp: i64) -> Result<i64> {
        self.send_by_id(PING_ID, &Ping { timestamp })?;

        let (header, payload) = self.read_frame()?;
        if header.type_id != PING_ID {
            return Err(PeerError::Handshake(format!(
                "expected ping reply, got message {}",
                header.type_id
            )));
        }

        let mut pong = Ping::default();
        self.decode_by_id(PING_ID, &payload, &mut pong)?;
        Ok(pong.timestamp)
    }

    fn send_by_id(&mut self, id: u32, record: &dyn Record) -> Result<()> {
        let descriptor = self
            .registry
            .lookup(id)
            .ok_or(PeerError::UnknownDescriptor(id))?;
        let body = encode(&descriptor.message, record)?;
        self.writer.send(id, &body)?;
        Ok(())
    }

    fn decode_by_id(&self, id: u32, payload: &[u8], record: &mut dyn Record) -> Result<()> {
        let descriptor = self
            .registry
            .lookup(id)
            .ok_or(PeerError::UnknownDescriptor(id))?;
        Decoder::new(payload, &descriptor.message).decode_dyn(record)?;
        Ok(())
    }

    fn read_frame(&mut self) -> Result<(FrameHeader, Bytes)> {
        let header = self.reader.read_header()?;
        let payload = self.reader.read_payload(header.payload_len)?;
        Ok((header, payload))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::net::UnixStream;
    use std::thread;

    use schemaipc_codec::record;
    use schemaipc_schema::{FieldType, MessageField, SchemaMessage};

    use super::*;
    use crate::server::{Server, ServerConfig};

    record! {
        struct EchoMessage {
            "payload" => payload: Vec<u8> [bytes],
        }
    }

    fn echo_schema() -> Schema {
        Schema::new(vec![SchemaMessage::new(
            MessageDirection::Duplex,
            "Echo",
            vec![MessageField::required("payload", FieldType::DynamicBinary)],
        )])
    }

    fn connected_client() -> (Client, thread::JoinHandle<()>) {
        let (client_side, server_side) = UnixStream::pair().expect("socketpair should open");

        let mut server = Server::new(echo_schema(), ServerConfig::default());
        server.bind(MessageDirection::Inbound, "Echo", |decoder, conn| {
            let mut message = EchoMessage::default();
            decoder.decode(&mut message)?;
            conn.send("Echo", &message)
        });
        server.init().expect("server init should succeed");

        let handle = thread::spawn(move || {
            let _ = server.handle_connection(server_side.into());
        });

        let client = Client::from_stream(client_side.into(), echo_schema(), 1, 1)
            .expect("handshake should succeed");
        (client, handle)
    }

    #[test]
    fn handshake_records_versions_and_schema() {
        let (client, handle) = connected_client();

        assert_eq!(client.server_versions(), (1, 1));
        assert_eq!(client.advertised().len(), 1);
        assert_eq!(client.advertised()[0].name, b"Echo");
        assert_eq!(client.advertised()[0].id, 3);

        drop(client);
        handle.join().unwrap();
    }

    #[test]
    fn typed_send_and_receive() {
        let (mut client, handle) = connected_client();

        client
            .send(
                "Echo",
                &EchoMessage {
                    payload: b"typed".to_vec(),
                },
            )
            .unwrap();

        let mut reply = EchoMessage::default();
        let id = client.recv_into(&mut reply).unwrap();
        assert_eq!(id, 3);
        assert_eq!(reply.payload, b"typed");

        drop(client);
        handle.join().unwrap();
    }

    #[test]
    fn ping_roundtrip() {
        let (mut client, handle) = connected_client();

        assert_eq!(client.ping(-99).unwrap(), -99);

        drop(client);
        handle.join().unwrap();
    }

    #[test]
    fn send_rejects_unknown_names() {
        let (mut client, handle) = connected_client();

        let err = client
            .send("Nope", &EchoMessage::default())
            .unwrap_err();
        assert!(matches!(err, PeerError::UnknownMessage(name) if name == "Nope"));

        drop(client);
        handle.join().unwrap();
    }

    #[test]
    fn raw_recv_exposes_frame_payload() {
        let (mut client, handle) = connected_client();

        client
            .send(
                "Echo",
                &EchoMessage {
                    payload: b"raw".to_vec(),
                },
            )
            .unwrap();

        let (id, payload) = client.recv().unwrap();
        assert_eq!(id, 3);
        assert_eq!(payload.as_ref(), &[0x03, 0x00, b'r', b'a', b'w']);

        drop(client);
        handle.join().unwrap();
    }
}
