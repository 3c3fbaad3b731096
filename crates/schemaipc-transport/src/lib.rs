//! Byte-stream transport abstraction for schemaipc.
//!
//! Provides a unified interface over the supported local transports:
//! - TCP sockets (`network = "tcp"`)
//! - Unix domain sockets (`network = "unix"`)
//!
//! This is the lowest layer of schemaipc. Everything else builds on the
//! [`IpcStream`] type provided here.

pub mod error;
pub mod listener;
pub mod stream;

#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};
pub use listener::{connect, IpcListener};
pub use stream::IpcStream;

#[cfg(unix)]
pub use uds::UnixDomainSocket;
