//! The duplex byte channel a single request/response exchange runs over.
//!
//! Timeouts are not reported as read errors: a read that times out returns
//! zero bytes and raises the `timed_out` flag, which callers inspect after
//! the read phase (see [`ChannelMetadata`]).

use std::io;
use std::time::Duration;

/// Snapshot of a channel's state flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelMetadata {
    pub timed_out: bool,
    pub eof: bool,
    /// Bytes handed out to readers so far.
    pub position: u64,
    pub closed: bool,
}

/// An open, ordered, byte-oriented duplex connection to a remote peer.
///
/// Implemented by [`crate::netcap::SocketChannel`] for real TCP/TLS sockets
/// and by [`crate::netcap::MemoryChannel`] for tests.
pub trait Channel {
    /// Reads up to `buf.len()` bytes.
    ///
    /// Returns `Ok(0)` at end of stream or on timeout (with
    /// [`Channel::timed_out`] raised). Fails once the channel is closed.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Appends bytes up to and including the next `\n` to `line`.
    ///
    /// A final line without terminator is returned as is. Returns the
    /// number of bytes appended, zero at end of stream or on timeout.
    fn read_line(&mut self, line: &mut Vec<u8>) -> io::Result<usize>;

    /// Single write attempt.
    ///
    /// `Ok(0)` means nothing was accepted; whether the channel is merely
    /// busy or broken is for the caller to find out.
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize>;

    fn flush(&mut self) -> io::Result<()>;

    /// Reports whether a write could make progress, waiting at most `wait`.
    fn poll_writable(&mut self, wait: Duration) -> io::Result<bool>;

    fn timed_out(&self) -> bool;

    fn eof(&self) -> bool;

    fn position(&self) -> u64;

    fn is_closed(&self) -> bool;

    /// Closes the channel. Closing twice is a no-op.
    fn close(&mut self) -> io::Result<()>;

    fn metadata(&self) -> ChannelMetadata {
        ChannelMetadata {
            timed_out: self.timed_out(),
            eof: self.eof(),
            position: self.position(),
            closed: self.is_closed(),
        }
    }

    /// Drains the channel until end of stream (or timeout) into `out`.
    fn read_to_end(&mut self, out: &mut Vec<u8>) -> io::Result<usize> {
        let mut buffer = [0u8; 8192];
        let mut total = 0;
        loop {
            let read = self.read(&mut buffer)?;
            if read == 0 {
                return Ok(total);
            }
            out.extend_from_slice(&buffer[..read]);
            total += read;
        }
    }
}

impl<C: Channel + ?Sized> Channel for Box<C> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }

    fn read_line(&mut self, line: &mut Vec<u8>) -> io::Result<usize> {
        (**self).read_line(line)
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        (**self).write(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }

    fn poll_writable(&mut self, wait: Duration) -> io::Result<bool> {
        (**self).poll_writable(wait)
    }

    fn timed_out(&self) -> bool {
        (**self).timed_out()
    }

    fn eof(&self) -> bool {
        (**self).eof()
    }

    fn position(&self) -> u64 {
        (**self).position()
    }

    fn is_closed(&self) -> bool {
        (**self).is_closed()
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

/// True for errors that mean "try again later" rather than "broken".
#[must_use]
pub fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}

pub(crate) fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "channel is closed")
}
