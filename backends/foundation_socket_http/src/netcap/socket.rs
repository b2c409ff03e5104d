#![cfg(not(target_arch = "wasm32"))]

//! [`Channel`] over a real TCP socket, optionally wrapped in TLS.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use super::channel::{closed_error, is_transient, Channel};
use super::ssl::ClientTlsStream;

/// Unified stream: plain TCP or TLS.
pub enum Transport {
    Plain(TcpStream),
    Tls(Box<ClientTlsStream>),
}

impl Transport {
    fn tcp(&self) -> &TcpStream {
        match self {
            Self::Plain(stream) => stream,
            Self::Tls(stream) => stream.get_ref(),
        }
    }

    #[must_use]
    pub fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }
}

impl core::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain(stream) => f.debug_tuple("Plain").field(stream).finish(),
            Self::Tls(stream) => f.debug_tuple("Tls").field(stream.get_ref()).finish(),
        }
    }
}

impl Read for Transport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Plain(stream) => stream.read(buf),
            Self::Tls(stream) => stream.read(buf),
        }
    }
}

impl Write for Transport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Plain(stream) => stream.write(buf),
            Self::Tls(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Plain(stream) => stream.flush(),
            Self::Tls(stream) => stream.flush(),
        }
    }
}

/// Connected socket channel. Reads are buffered so the status line and
/// headers can be read line by line without losing the body bytes behind
/// them.
#[derive(Debug)]
pub struct SocketChannel {
    reader: BufReader<Transport>,
    timed_out: bool,
    eof: bool,
    closed: bool,
    position: u64,
}

impl SocketChannel {
    #[must_use]
    pub fn new(transport: Transport) -> Self {
        Self {
            reader: BufReader::new(transport),
            timed_out: false,
            eof: false,
            closed: false,
            position: 0,
        }
    }

    #[must_use]
    pub fn is_tls(&self) -> bool {
        self.reader.get_ref().is_tls()
    }

    pub fn peer_addr(&self) -> io::Result<std::net::SocketAddr> {
        self.reader.get_ref().tcp().peer_addr()
    }

    fn ensure_open(&self) -> io::Result<()> {
        if self.closed {
            return Err(closed_error());
        }
        Ok(())
    }

    /// Folds a read error into the channel flags. Returns `None` when the
    /// error was absorbed as timeout or end of stream.
    fn absorb_read_error(&mut self, err: io::Error) -> Option<io::Error> {
        if matches!(err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) {
            self.timed_out = true;
            return None;
        }

        // Peers commonly drop the TCP connection without a TLS close_notify
        // once the response is complete.
        if self.is_tls() && err.kind() == io::ErrorKind::UnexpectedEof {
            self.eof = true;
            return None;
        }

        Some(err)
    }
}

impl Channel for SocketChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.ensure_open()?;
        if buf.is_empty() {
            return Ok(0);
        }

        loop {
            match self.reader.read(buf) {
                Ok(0) => {
                    self.eof = true;
                    return Ok(0);
                }
                Ok(read) => {
                    self.position += read as u64;
                    return Ok(read);
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    return match self.absorb_read_error(err) {
                        Some(err) => Err(err),
                        None => Ok(0),
                    }
                }
            }
        }
    }

    fn read_line(&mut self, line: &mut Vec<u8>) -> io::Result<usize> {
        self.ensure_open()?;

        let before = line.len();
        let result = self.reader.read_until(b'\n', line);
        let appended = line.len() - before;
        self.position += appended as u64;

        match result {
            Ok(0) => {
                self.eof = true;
                Ok(0)
            }
            Ok(read) => {
                if !line.ends_with(b"\n") {
                    self.eof = true;
                }
                Ok(read)
            }
            Err(err) => match self.absorb_read_error(err) {
                Some(err) => Err(err),
                None => Ok(appended),
            },
        }
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.ensure_open()?;
        match self.reader.get_mut().write(bytes) {
            Err(err) if is_transient(&err) => Ok(0),
            other => other,
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.ensure_open()?;
        match self.reader.get_mut().flush() {
            Err(err) if is_transient(&err) => Ok(()),
            other => other,
        }
    }

    fn poll_writable(&mut self, wait: Duration) -> io::Result<bool> {
        self.ensure_open()?;
        poll_writable(self.reader.get_ref().tcp(), wait)
    }

    fn timed_out(&self) -> bool {
        self.timed_out
    }

    fn eof(&self) -> bool {
        self.eof
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn close(&mut self) -> io::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        if let Transport::Tls(stream) = self.reader.get_mut() {
            stream.conn.send_close_notify();
            // best effort, the peer may already be gone
            let _ = stream.flush();
        }

        match self.reader.get_ref().tcp().shutdown(Shutdown::Both) {
            Err(err) if err.kind() != io::ErrorKind::NotConnected => Err(err),
            _ => Ok(()),
        }
    }
}

#[cfg(unix)]
fn poll_writable(stream: &TcpStream, wait: Duration) -> io::Result<bool> {
    use std::os::unix::io::AsRawFd;

    let mut poll_fd = libc::pollfd {
        fd: stream.as_raw_fd(),
        events: libc::POLLOUT,
        revents: 0,
    };
    let timeout_ms = libc::c_int::try_from(wait.as_millis()).unwrap_or(libc::c_int::MAX);

    loop {
        // SAFETY: `poll_fd` is a valid, initialised pollfd and we pass a count of one.
        let ready = unsafe { libc::poll(&mut poll_fd, 1, timeout_ms) };
        if ready < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }

        // errored or hung-up sockets count as writable: the next write reports it
        let writable = libc::POLLOUT | libc::POLLERR | libc::POLLHUP;
        return Ok(ready > 0 && (poll_fd.revents & writable) != 0);
    }
}

#[cfg(not(unix))]
fn poll_writable(stream: &TcpStream, _wait: Duration) -> io::Result<bool> {
    Ok(stream.take_error()?.is_none())
}
