use std::io::{self, ErrorKind, Read};

use bytes::{Bytes, BytesMut};

use crate::codec::{parse_header, FrameHeader, HEADER_SIZE};
use crate::error::{FrameError, Result};

/// Reads frames from any `Read` stream with full blocking reads.
///
/// The header and body are read separately so callers can apply a size
/// policy (discard or terminate) between the two.
pub struct FrameReader<T> {
    inner: T,
}

impl<T: Read> FrameReader<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// Read the next 8-byte header (blocking).
    ///
    /// EOF at a frame boundary is `ConnectionClosed`; EOF inside the header
    /// is `HeaderLength`.
    pub fn read_header(&mut self) -> Result<FrameHeader> {
        let mut raw = [0u8; HEADER_SIZE];
        let mut filled = 0usize;

        while filled < HEADER_SIZE {
            match self.inner.read(&mut raw[filled..]) {
                Ok(0) if filled == 0 => return Err(FrameError::ConnectionClosed),
                Ok(0) => return Err(FrameError::HeaderLength),
                Ok(read) => filled += read,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        Ok(parse_header(raw))
    }

    /// Read exactly `len` body bytes (blocking).
    pub fn read_payload(&mut self, len: u32) -> Result<Bytes> {
        let mut buf = BytesMut::zeroed(len as usize);
        let mut filled = 0usize;

        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => return Err(FrameError::PayloadLength),
                Ok(read) => filled += read,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        Ok(buf.freeze())
    }

    /// Consume and drop exactly `len` body bytes.
    pub fn discard_payload(&mut self, len: u32) -> Result<()> {
        let mut taken = (&mut self.inner).take(u64::from(len));
        let copied = io::copy(&mut taken, &mut io::sink())?;

        if copied < u64::from(len) {
            return Err(FrameError::PayloadLength);
        }
        Ok(())
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
