//! Typed-message framing for schemaipc.
//!
//! Every message on the wire is an 8-byte header — payload length then
//! message type ID, both `u32` little-endian — followed by exactly
//! `payload_length` body bytes. The reader issues full blocking reads and
//! splits header from body so the connection layer can apply its size policy
//! before the body is pulled in.

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{encode_header, parse_header, FrameHeader, HEADER_SIZE};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;
