use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use schemaipc_codec::{encode, Decoder, Record};
use schemaipc_frame::{FrameError, FrameReader, FrameWriter};
use schemaipc_schema::MessageDirection;
use schemaipc_transport::IpcStream;
use tracing::{debug, info, warn};

use crate::error::{PeerError, Result};
use crate::server::{OverflowPolicy, Shared};

/// Lifecycle state of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    /// Nothing but internal messages accepted; waiting for inbound Hello.
    WaitHello,
    /// Handshake complete; user messages accepted.
    Established,
}

const STATE_WAIT_HELLO: u8 = 0;
const STATE_ESTABLISHED: u8 = 1;

/// Per-connection handle passed to message handlers.
///
/// All outbound frames go through one internal mutex, so a handler reply and
/// any concurrent emitter never interleave bytes on the wire.
pub struct Conn {
    shared: Arc<Shared>,
    writer: Mutex<FrameWriter<IpcStream>>,
    state: AtomicU8,
    peer: String,
}

impl Conn {
    pub(crate) fn new(shared: Arc<Shared>, stream: IpcStream, peer: String) -> Self {
        Self {
            shared,
            writer: Mutex::new(FrameWriter::new(stream)),
            state: AtomicU8::new(STATE_WAIT_HELLO),
            peer,
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnState {
        match self.state.load(Ordering::Acquire) {
            STATE_WAIT_HELLO => ConnState::WaitHello,
            _ => ConnState::Established,
        }
    }

    /// Transition the connection to `Established`. Called by the Hello
    /// handler once the handshake is acceptable, not by the read loop.
    pub fn establish(&self) {
        self.state.store(STATE_ESTABLISHED, Ordering::Release);
    }

    /// Short peer description for log lines.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Encode `record` against the outbound user message `name` and emit it.
    pub fn send(&self, name: &str, record: &dyn Record) -> Result<()> {
        let id = self
            .shared
            .registry
            .lookup_user(MessageDirection::Outbound, name)
            .ok_or_else(|| PeerError::UnknownMessage(name.to_string()))?;
        self.send_by_id(id, record)
    }

    /// Emit a frame for an already-resolved descriptor ID.
    pub(crate) fn send_by_id(&self, id: u32, record: &dyn Record) -> Result<()> {
        let descriptor = self
            .shared
            .registry
            .lookup(id)
            .ok_or(PeerError::UnknownDescriptor(id))?;
        let body = encode(&descriptor.message, record)?;

        let mut writer = self.writer_lock();
        writer.send(id, &body)?;
        Ok(())
    }

    pub(crate) fn shared(&self) -> &Shared {
        &self.shared
    }

    fn writer_lock(&self) -> MutexGuard<'_, FrameWriter<IpcStream>> {
        match self.writer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Drive one connection to completion on the calling thread.
///
/// Reads frames until the peer disconnects or a protocol violation occurs,
/// then logs the closure reason once and drops the endpoint.
pub(crate) fn drive(shared: Arc<Shared>, stream: IpcStream) {
    let peer = stream.peer_label();

    let reader_stream = match stream.try_clone() {
        Ok(cloned) => cloned,
        Err(err) => {
            warn!(%peer, "failed to clone connection stream: {err}");
            return;
        }
    };
    let mut reader = FrameReader::new(reader_stream);
    let conn = Conn::new(shared, stream, peer);

    info!(peer = %conn.peer, "connection open");

    loop {
        match next_message(&mut reader, &conn) {
            Ok(()) => {}
            Err(PeerError::Frame(FrameError::ConnectionClosed)) => {
                info!(peer = %conn.peer, "connection closed by peer");
                break;
            }
            Err(err) => {
                warn!(peer = %conn.peer, "connection closed: {err}");
                break;
            }
        }
    }
}

/// Read and dispatch exactly one frame.
fn next_message(reader: &mut FrameReader<IpcStream>, conn: &Conn) -> Result<()> {
    let header = reader.read_header()?;
    let shared = conn.shared();

    if header.payload_len > shared.max_message_size {
        match shared.overflow_policy {
            OverflowPolicy::Discard => {
                debug!(
                    peer = %conn.peer,
                    size = header.payload_len,
                    "discarding oversized message"
                );
                reader.discard_payload(header.payload_len)?;
                return Ok(());
            }
            OverflowPolicy::Terminate => {
                return Err(FrameError::MessageTooLarge {
                    size: header.payload_len,
                    max: shared.max_message_size,
                }
                .into());
            }
        }
    }

    // A proper client never sends a type absent from the advertised schema.
    let descriptor = shared
        .registry
        .lookup(header.type_id)
        .ok_or(PeerError::UnknownDescriptor(header.type_id))?;

    if descriptor.message.direction == MessageDirection::Outbound {
        return Err(PeerError::InvalidDirection(header.type_id));
    }

    if !descriptor.internal && conn.state() == ConnState::WaitHello {
        return Err(PeerError::InvalidDescriptor(header.type_id));
    }

    let Some(handler) = &descriptor.handler else {
        // User messages nobody listens to are consumed and dropped.
        reader.discard_payload(header.payload_len)?;
        return Ok(());
    };

    let payload = reader.read_payload(header.payload_len)?;
    let mut decoder = Decoder::new(&payload, &descriptor.message);
    handler(&mut decoder, conn)
}
