use std::io::{ErrorKind, Read, Write};

use crate::error::{Result, TransportError};

/// Synchronous outbound half of a channel link.
///
/// `send` either puts the whole frame on the wire or fails; the caller does
/// not proceed until it returns.
pub trait ByteSink {
    fn send(&mut self, bytes: &[u8]) -> Result<()>;
}

/// Non-blocking inbound half of a channel link.
pub trait ByteSource {
    /// Copy bytes that have already arrived into `buf`.
    ///
    /// Returns `Ok(0)` when nothing is pending. Never waits for more data.
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize>;
}

impl<T: ByteSink + ?Sized> ByteSink for &mut T {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).send(bytes)
    }
}

impl<T: ByteSink + ?Sized> ByteSink for Box<T> {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).send(bytes)
    }
}

impl<T: ByteSource + ?Sized> ByteSource for &mut T {
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read_available(buf)
    }
}

/// Adapts any `Read`/`Write` stream into a channel link.
pub struct StreamLink<T> {
    inner: T,
}

impl<T> StreamLink<T> {
    /// Wrap a stream.
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the link and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Write> ByteSink for StreamLink<T> {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        while offset < bytes.len() {
            match self.inner.write(&bytes[offset..]) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }

        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }
}

impl<T: Read> ByteSource for StreamLink<T> {
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            match self.inner.read(buf) {
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    return Ok(0)
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }
}

impl<T> std::fmt::Debug for StreamLink<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamLink")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}
