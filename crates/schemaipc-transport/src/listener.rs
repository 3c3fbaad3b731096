use std::net::{SocketAddr, TcpListener, TcpStream};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::stream::IpcStream;

/// A bound byte-stream listener on one of the supported networks.
pub struct IpcListener {
    inner: ListenerInner,
}

enum ListenerInner {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix(crate::uds::UnixDomainSocket),
}

impl IpcListener {
    /// Bind a listener. `network` selects the transport: `tcp` binds a TCP
    /// socket address, `unix` a filesystem socket path.
    pub fn bind(network: &str, address: &str) -> Result<Self> {
        match network {
            "tcp" => {
                let listener = TcpListener::bind(address).map_err(|e| TransportError::Bind {
                    addr: address.to_string(),
                    source: e,
                })?;
                info!(%address, "listening on tcp");
                Ok(Self {
                    inner: ListenerInner::Tcp(listener),
                })
            }
            #[cfg(unix)]
            "unix" => {
                let socket = crate::uds::UnixDomainSocket::bind(address)?;
                Ok(Self {
                    inner: ListenerInner::Unix(socket),
                })
            }
            other => Err(TransportError::UnknownNetwork(other.to_string())),
        }
    }

    /// Accept an incoming connection (blocking).
    pub fn accept(&self) -> Result<IpcStream> {
        match &self.inner {
            ListenerInner::Tcp(listener) => {
                let (stream, addr) = listener.accept().map_err(TransportError::Accept)?;
                debug!(%addr, "accepted tcp connection");
                Ok(IpcStream::from_tcp(stream))
            }
            #[cfg(unix)]
            ListenerInner::Unix(socket) => socket.accept(),
        }
    }

    /// The bound TCP address, when listening on TCP.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &self.inner {
            ListenerInner::Tcp(listener) => listener.local_addr().ok(),
            #[cfg(unix)]
            ListenerInner::Unix(_) => None,
        }
    }

    /// Short description of the bound endpoint for log lines.
    pub fn local_label(&self) -> String {
        match &self.inner {
            ListenerInner::Tcp(listener) => match listener.local_addr() {
                Ok(addr) => format!("tcp:{addr}"),
                Err(_) => "tcp:unknown".to_string(),
            },
            #[cfg(unix)]
            ListenerInner::Unix(socket) => format!("unix:{}", socket.path().display()),
        }
    }
}

/// Connect to a listening endpoint (blocking).
pub fn connect(network: &str, address: &str) -> Result<IpcStream> {
    match network {
        "tcp" => {
            let stream = TcpStream::connect(address).map_err(|e| TransportError::Connect {
                addr: address.to_string(),
                source: e,
            })?;
            debug!(%address, "connected to tcp");
            Ok(IpcStream::from_tcp(stream))
        }
        #[cfg(unix)]
        "unix" => crate::uds::UnixDomainSocket::connect(address),
        other => Err(TransportError::UnknownNetwork(other.to_string())),
    }
}
