use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use schemaipc_codec::Decoder;
use schemaipc_schema::{DescriptorRegistry, MessageDirection, Schema};
use schemaipc_transport::{IpcListener, IpcStream, TransportError};
use tracing::{error, info, warn};

use crate::conn::{self, Conn};
use crate::error::Result;
use crate::handshake;
use crate::meta;

/// Handler invoked for one inbound message: a decoder bound to the message
/// body and the connection handle for replies.
pub type Handler =
    Arc<dyn Fn(&mut Decoder<'_>, &Conn) -> Result<()> + Send + Sync>;

/// The descriptor registry instantiated with connection handlers.
pub type Registry = DescriptorRegistry<Handler>;

/// What to do with an inbound message larger than the configured limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Consume and drop the body, keep the connection.
    #[default]
    Discard,
    /// Close the connection.
    Terminate,
}

/// Default cap on inbound message bodies: 16 MiB.
pub const DEFAULT_MAX_MESSAGE_SIZE: u32 = 16 * 1024 * 1024;

const ACCEPT_RETRY_DELAY: Duration = Duration::from_secs(3);

/// Server configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    /// Upper bound on inbound `payload_length`.
    pub max_message_size: u32,
    /// Policy applied when `payload_length` exceeds the bound.
    pub overflow_policy: OverflowPolicy,
    /// Oldest protocol version this server still speaks.
    pub min_version: i32,
    /// Protocol version this server prefers.
    pub curr_version: i32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            overflow_policy: OverflowPolicy::Discard,
            min_version: 1,
            curr_version: 1,
        }
    }
}

/// Read-only state shared by every connection of one server.
pub(crate) struct Shared {
    pub(crate) registry: Registry,
    pub(crate) max_message_size: u32,
    pub(crate) overflow_policy: OverflowPolicy,
    pub(crate) min_version: i32,
    pub(crate) curr_version: i32,
    pub(crate) schema_advert: Bytes,
    pub(crate) registry_advert: Bytes,
}

/// A schema-driven IPC server.
///
/// Construct with a user schema, bind handlers, then serve. `init` installs
/// the internal descriptors (IDs 0-2), registers the user schema (IDs from
/// 3), binds all handlers and precomputes the schema advertisement; after
/// that the registry is read-only for the life of the server.
pub struct Server {
    config: ServerConfig,
    schema: Schema,
    handlers: Vec<(MessageDirection, String, Handler)>,
    shared: Option<Arc<Shared>>,
}

impl Server {
    pub fn new(schema: Schema, config: ServerConfig) -> Self {
        Self {
            config,
            schema,
            handlers: Vec::new(),
            shared: None,
        }
    }

    /// Queue a handler for the user message with the given signature.
    /// Handlers are attached to descriptors during `init`.
    pub fn bind<F>(&mut self, direction: MessageDirection, name: impl Into<String>, handler: F)
    where
        F: Fn(&mut Decoder<'_>, &Conn) -> Result<()> + Send + Sync + 'static,
    {
        self.handlers
            .push((direction, name.into(), Arc::new(handler)));
    }

    /// Build the frozen registry: internal descriptors, user schema,
    /// handlers, advertisement blobs.
    pub fn init(&mut self) -> Result<()> {
        if self.shared.is_some() {
            return Err(schemaipc_schema::SchemaError::AlreadyRegistered.into());
        }

        let mut registry = Registry::new();
        registry.register_internal()?;
        handshake::install(&mut registry)?;
        registry.register_schema(self.schema.clone())?;

        for (direction, name, handler) in self.handlers.drain(..) {
            registry.bind_handler(direction, &name, handler)?;
        }

        let (schema_advert, registry_advert) = meta::encode_advertisement(&registry)?;

        self.shared = Some(Arc::new(Shared {
            registry,
            max_message_size: self.config.max_message_size,
            overflow_policy: self.config.overflow_policy,
            min_version: self.config.min_version,
            curr_version: self.config.curr_version,
            schema_advert,
            registry_advert,
        }));

        Ok(())
    }

    /// Bind a listener and serve connections until the listener fails
    /// permanently or is closed.
    ///
    /// Each accepted endpoint gets its own thread driving the connection
    /// state machine; transient accept errors retry after a short backoff.
    pub fn listen_and_serve(&mut self, network: &str, address: &str) -> Result<()> {
        let shared = self.shared()?;
        let listener = IpcListener::bind(network, address)?;

        info!(endpoint = %listener.local_label(), "schemaipc listening");

        let mut next_conn_id: u64 = 1;
        loop {
            match listener.accept() {
                Ok(stream) => {
                    let shared = Arc::clone(&shared);
                    let conn_id = next_conn_id;
                    next_conn_id += 1;

                    let spawned = thread::Builder::new()
                        .name(format!("schemaipc-conn-{conn_id}"))
                        .spawn(move || conn::drive(shared, stream));
                    if let Err(err) = spawned {
                        warn!("failed to spawn connection thread: {err}");
                    }
                }
                Err(TransportError::Accept(err)) if is_temporary(&err) => {
                    warn!("temporary error while accepting connection: {err}");
                    thread::sleep(ACCEPT_RETRY_DELAY);
                }
                Err(TransportError::Accept(err)) if is_closed(&err) => {
                    info!("listener closed; schemaipc server shutting down");
                    return Ok(());
                }
                Err(err) => {
                    error!("permanent error while accepting connection: {err}");
                    return Err(err.into());
                }
            }
        }
    }

    /// Drive one already-connected endpoint on the calling thread.
    pub fn handle_connection(&mut self, stream: IpcStream) -> Result<()> {
        let shared = self.shared()?;
        conn::drive(shared, stream);
        Ok(())
    }

    fn shared(&mut self) -> Result<Arc<Shared>> {
        if self.shared.is_none() {
            self.init()?;
        }
        match &self.shared {
            Some(shared) => Ok(Arc::clone(shared)),
            None => Err(schemaipc_schema::SchemaError::InternalNotRegistered.into()),
        }
    }

    #[cfg(test)]
    pub(crate) fn shared_for_tests(&mut self) -> Arc<Shared> {
        self.shared().expect("init should succeed")
    }
}

fn is_temporary(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::Interrupted
    )
}

fn is_closed(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::InvalidInput | std::io::ErrorKind::NotConnected
    )
}
