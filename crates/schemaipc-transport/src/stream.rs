use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};
#[cfg(unix)]
use std::os::unix::net::UnixStream;
use std::time::Duration;

use crate::error::Result;

/// A connected byte-stream endpoint — implements Read + Write.
///
/// This is the fundamental I/O type returned by transport operations. It
/// wraps either a TCP stream or a Unix domain socket stream.
pub struct IpcStream {
    inner: IpcStreamInner,
}

enum IpcStreamInner {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl Read for IpcStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            IpcStreamInner::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for IpcStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            IpcStreamInner::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            IpcStreamInner::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => stream.flush(),
        }
    }
}

impl IpcStream {
    pub(crate) fn from_tcp(stream: TcpStream) -> Self {
        Self {
            inner: IpcStreamInner::Tcp(stream),
        }
    }

    #[cfg(unix)]
    pub(crate) fn from_unix(stream: UnixStream) -> Self {
        Self {
            inner: IpcStreamInner::Unix(stream),
        }
    }

    /// Set read timeout on the underlying stream.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            IpcStreamInner::Tcp(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
        }
    }

    /// Set write timeout on the underlying stream.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            IpcStreamInner::Tcp(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
        }
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            IpcStreamInner::Tcp(stream) => Ok(Self::from_tcp(stream.try_clone()?)),
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => Ok(Self::from_unix(stream.try_clone()?)),
        }
    }

    /// Shut down both halves of the stream.
    pub fn shutdown(&self) -> Result<()> {
        match &self.inner {
            IpcStreamInner::Tcp(stream) => stream.shutdown(Shutdown::Both).map_err(Into::into),
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => stream.shutdown(Shutdown::Both).map_err(Into::into),
        }
    }

    /// Short peer description for log lines.
    pub fn peer_label(&self) -> String {
        match &self.inner {
            IpcStreamInner::Tcp(stream) => match stream.peer_addr() {
                Ok(addr) => format!("tcp:{addr}"),
                Err(_) => "tcp:unknown".to_string(),
            },
            #[cfg(unix)]
            IpcStreamInner::Unix(_) => "unix".to_string(),
        }
    }
}

impl From<TcpStream> for IpcStream {
    fn from(stream: TcpStream) -> Self {
        Self::from_tcp(stream)
    }
}

#[cfg(unix)]
impl From<UnixStream> for IpcStream {
    fn from(stream: UnixStream) -> Self {
        Self::from_unix(stream)
    }
}

impl std::fmt::Debug for IpcStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            IpcStreamInner::Tcp(_) => f.debug_struct("IpcStream").field("type", &"tcp").finish(),
            #[cfg(unix)]
            IpcStreamInner::Unix(_) => f.debug_struct("IpcStream").field("type", &"unix").finish(),
        }
    }
}
