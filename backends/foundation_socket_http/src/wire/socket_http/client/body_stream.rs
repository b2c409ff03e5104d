//! Lazily read response body.
//!
//! The stream owns the channel the response arrived on. When the response
//! declared a `Content-Length` the stream never reads past it, whatever the
//! peer keeps sending; without one it reads until the peer closes.

use std::io;
use std::sync::Arc;

use crate::netcap::channel::{Channel, ChannelMetadata};
use crate::wire::socket_http::{NetworkError, NetworkErrorKind, RequestHead};

/// Upper bound for a single read buffer.
const READ_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug)]
pub struct BodyStream<C: Channel> {
    channel: Option<C>,
    size: Option<u64>,
    consumed: u64,
    /// Channel position where the body starts.
    start: u64,
    request: Arc<RequestHead>,
}

impl<C: Channel> BodyStream<C> {
    pub fn new(channel: C, size: Option<u64>, request: Arc<RequestHead>) -> Self {
        let start = channel.position();
        Self {
            channel: Some(channel),
            size,
            consumed: 0,
            start,
            request,
        }
    }

    fn error(&self, kind: NetworkErrorKind, message: impl Into<String>) -> NetworkError {
        NetworkError::new(self.request.clone(), kind, message)
    }

    fn open_channel(&mut self) -> Result<&mut C, NetworkError> {
        let request = self.request.clone();
        match self.channel.as_mut() {
            Some(channel) if !channel.is_closed() => Ok(channel),
            Some(_) => Err(NetworkError::new(
                request,
                NetworkErrorKind::Closed,
                "body stream is closed",
            )),
            None => Err(NetworkError::new(
                request,
                NetworkErrorKind::Closed,
                "body stream is detached",
            )),
        }
    }

    /// Reads into `buf`, returning the byte count; zero at end of body.
    ///
    /// # Errors
    ///
    /// Fails when the stream is closed, on read errors, and when the read
    /// timed out before a declared length was reached.
    pub fn read_into(&mut self, buf: &mut [u8]) -> Result<usize, NetworkError> {
        let request = self.request.clone();
        let size = self.size;
        let consumed = self.consumed;

        let wanted = match size {
            Some(total) if consumed >= total => return Ok(0),
            Some(total) => {
                let remaining = usize::try_from(total - consumed).unwrap_or(usize::MAX);
                buf.len().min(remaining)
            }
            None => buf.len(),
        };

        let channel = self.open_channel()?;
        let read = channel
            .read(&mut buf[..wanted])
            .map_err(|err| NetworkError::from_io(request.clone(), NetworkErrorKind::Read, &err))?;

        if size.is_some() && channel.timed_out() {
            tracing::error!("Body read timed out after {} bytes", consumed);
            return Err(NetworkError::new(
                request,
                NetworkErrorKind::TimedOut,
                "response body read timed out",
            ));
        }

        self.consumed += read as u64;
        Ok(read)
    }

    /// Reads up to `length` bytes; empty at end of body.
    ///
    /// # Errors
    ///
    /// See [`BodyStream::read_into`].
    pub fn read(&mut self, length: usize) -> Result<Vec<u8>, NetworkError> {
        let capacity = match self.size {
            Some(total) => {
                let remaining = total.saturating_sub(self.consumed);
                length.min(usize::try_from(remaining).unwrap_or(usize::MAX))
            }
            None => length,
        };
        let mut buf = vec![0u8; capacity.min(READ_CHUNK_SIZE)];
        let read = self.read_into(&mut buf)?;
        buf.truncate(read);
        Ok(buf)
    }

    /// Everything not read yet.
    ///
    /// # Errors
    ///
    /// Fails when the peer closes or times out before the declared length
    /// was delivered, and when a read-until-close body timed out.
    pub fn get_contents(&mut self) -> Result<Vec<u8>, NetworkError> {
        let Some(total) = self.size else {
            let request = self.request.clone();
            let channel = self.open_channel()?;
            let mut out = Vec::new();
            channel
                .read_to_end(&mut out)
                .map_err(|err| NetworkError::from_io(request.clone(), NetworkErrorKind::Read, &err))?;
            if channel.timed_out() {
                return Err(NetworkError::new(
                    request,
                    NetworkErrorKind::TimedOut,
                    "response body read timed out",
                ));
            }
            self.consumed += out.len() as u64;
            return Ok(out);
        };

        let remaining = usize::try_from(total.saturating_sub(self.consumed)).unwrap_or(usize::MAX);
        let mut out = Vec::with_capacity(remaining.min(1 << 20));
        let mut buf = vec![0u8; remaining.clamp(1, READ_CHUNK_SIZE)];
        while self.consumed < total {
            let read = self.read_into(&mut buf)?;
            if read == 0 {
                tracing::error!(
                    "Connection closed after {} of {} body bytes",
                    self.consumed,
                    total
                );
                return Err(self.error(
                    NetworkErrorKind::Read,
                    format!(
                        "connection closed after {} of {} body bytes",
                        self.consumed, total
                    ),
                ));
            }
            out.extend_from_slice(&buf[..read]);
        }
        Ok(out)
    }

    /// [`BodyStream::get_contents`] as lossy UTF-8.
    ///
    /// # Errors
    ///
    /// See [`BodyStream::get_contents`].
    pub fn contents_string(&mut self) -> Result<String, NetworkError> {
        let contents = self.get_contents()?;
        Ok(String::from_utf8_lossy(&contents).into_owned())
    }

    /// Declared body length, `None` when the body runs until close.
    #[must_use]
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    #[must_use]
    pub fn eof(&self) -> bool {
        match (self.size, &self.channel) {
            (Some(total), _) => self.consumed >= total,
            (None, Some(channel)) => channel.eof(),
            (None, None) => true,
        }
    }

    /// Body bytes read so far.
    #[must_use]
    pub fn tell(&self) -> u64 {
        match (self.size, &self.channel) {
            (None, Some(channel)) => channel.position().saturating_sub(self.start),
            _ => self.consumed,
        }
    }

    #[must_use]
    pub fn is_readable(&self) -> bool {
        self.channel
            .as_ref()
            .is_some_and(|channel| !channel.is_closed())
    }

    #[must_use]
    pub fn is_seekable(&self) -> bool {
        false
    }

    #[must_use]
    pub fn is_writable(&self) -> bool {
        false
    }

    /// # Errors
    ///
    /// Always: the body is forward-only.
    pub fn seek(&mut self, _offset: u64) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "response body is not seekable",
        ))
    }

    /// # Errors
    ///
    /// Always: the body is forward-only.
    pub fn rewind(&mut self) -> io::Result<()> {
        self.seek(0)
    }

    /// # Errors
    ///
    /// Always: the body is read-only.
    pub fn write(&mut self, _bytes: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "response body is not writable",
        ))
    }

    /// Closes the underlying connection. Closing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Propagates a failing socket shutdown.
    pub fn close(&mut self) -> Result<(), NetworkError> {
        let request = self.request.clone();
        match self.channel.as_mut() {
            Some(channel) => channel
                .close()
                .map_err(|err| NetworkError::from_io(request, NetworkErrorKind::Closed, &err)),
            None => Ok(()),
        }
    }

    /// Hands the channel to the caller; the stream is unusable afterwards.
    pub fn detach(&mut self) -> Option<C> {
        self.channel.take()
    }

    /// Channel state; a detached stream reports closed.
    #[must_use]
    pub fn metadata(&self) -> ChannelMetadata {
        match &self.channel {
            Some(channel) => channel.metadata(),
            None => ChannelMetadata {
                closed: true,
                ..ChannelMetadata::default()
            },
        }
    }
}

impl<C: Channel> io::Read for BodyStream<C> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_into(buf).map_err(|err| {
            let kind = match err.kind {
                NetworkErrorKind::TimedOut => io::ErrorKind::TimedOut,
                NetworkErrorKind::Closed => io::ErrorKind::NotConnected,
                _ => io::ErrorKind::Other,
            };
            io::Error::new(kind, err)
        })
    }
}

impl<C: Channel> Drop for BodyStream<C> {
    fn drop(&mut self) {
        if let Some(channel) = self.channel.as_mut() {
            if let Err(err) = channel.close() {
                tracing::debug!("Closing body channel on drop failed: {}", err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netcap::memory::MemoryChannel;
    use crate::wire::socket_http::Request;
    use std::io::Read;
    use tracing_test::traced_test;

    fn head() -> Arc<RequestHead> {
        Arc::new(
            Request::build("GET", "http://example.test/")
                .unwrap()
                .head()
                .clone(),
        )
    }

    /// WHY: Callers may mix partial reads with a final drain
    /// WHAT: get_contents after reading n bytes returns exactly size - n bytes
    #[test]
    fn test_contents_after_partial_read() {
        let channel = MemoryChannel::new("hello world").with_read_chunk(3);
        let mut body = BodyStream::new(channel, Some(11), head());

        assert_eq!(body.read(4).unwrap(), b"hel");
        assert_eq!(body.tell(), 3);
        assert_eq!(body.get_contents().unwrap(), b"lo world");
        assert!(body.eof());
        assert!(body.get_contents().unwrap().is_empty());
    }

    /// WHY: Some peers keep sending or keep the socket open past the entity
    /// WHAT: A declared length caps reads regardless of the channel's own EOF
    #[test]
    fn test_declared_length_caps_reads() {
        let channel = MemoryChannel::new("helloEXTRA");
        let mut body = BodyStream::new(channel, Some(5), head());

        assert_eq!(body.read(100).unwrap(), b"hello");
        assert!(body.eof());
        assert!(body.read(100).unwrap().is_empty());
        assert_eq!(body.metadata().position, 5);
    }

    #[test]
    fn test_unknown_size_reads_until_close() {
        let channel = MemoryChannel::new("all of it").with_read_chunk(2);
        let mut body = BodyStream::new(channel, None, head());

        assert_eq!(body.size(), None);
        assert_eq!(body.contents_string().unwrap(), "all of it");
        assert!(body.eof());
        assert_eq!(body.tell(), 9);
    }

    /// WHY: A stalled peer must not look like a short body
    /// WHAT: Timeout during a sized read fails with TimedOut
    #[test]
    fn test_timeout_during_sized_read() {
        let channel = MemoryChannel::new("hello").with_timeout_after(2);
        let mut body = BodyStream::new(channel, Some(5), head());

        let err = body.get_contents().unwrap_err();
        assert_eq!(err.kind, NetworkErrorKind::TimedOut);
    }

    #[test]
    #[traced_test]
    fn test_early_close_fails_sized_contents() {
        let channel = MemoryChannel::new("hel");
        let mut body = BodyStream::new(channel, Some(5), head());

        let err = body.get_contents().unwrap_err();
        assert_eq!(err.kind, NetworkErrorKind::Read);
        assert!(err.message.contains("3 of 5"));
        assert!(logs_contain("Connection closed after 3 of 5 body bytes"));
    }

    /// WHAT: Asking for more than the declared length only returns the body
    #[test]
    fn test_read_oversized_length() {
        let mut body = BodyStream::new(MemoryChannel::new("helloEXTRA"), Some(5), head());

        assert_eq!(body.read(usize::MAX).unwrap(), b"hello");
        assert!(body.read(usize::MAX).unwrap().is_empty());
    }

    #[test]
    fn test_read_oversized_length_until_close() {
        let mut body = BodyStream::new(MemoryChannel::new("abc"), None, head());

        assert_eq!(body.read(usize::MAX).unwrap(), b"abc");
        assert!(body.read(usize::MAX).unwrap().is_empty());
    }

    /// WHY: A closed body must never silently reopen its connection
    /// WHAT: Reads after close fail, and close closes the channel once
    #[test]
    fn test_close_closes_channel() {
        let channel = MemoryChannel::new("hello");
        let probe = channel.probe();
        let mut body = BodyStream::new(channel, Some(5), head());

        body.close().unwrap();
        body.close().unwrap();
        assert!(!body.is_readable());
        assert_eq!(body.read(1).unwrap_err().kind, NetworkErrorKind::Closed);

        drop(body);
        assert_eq!(probe.close_count(), 1);
    }

    #[test]
    fn test_forward_only() {
        let mut body = BodyStream::new(MemoryChannel::new(""), Some(0), head());
        assert!(!body.is_seekable());
        assert!(!body.is_writable());
        assert!(body.seek(0).is_err());
        assert!(body.rewind().is_err());
        assert!(body.write(b"x").is_err());
    }

    #[test]
    fn test_detach_hands_over_channel() {
        let channel = MemoryChannel::new("hello");
        let probe = channel.probe();
        let mut body = BodyStream::new(channel, Some(5), head());

        let mut channel = body.detach().unwrap();
        assert!(body.metadata().closed);
        assert!(body.read(1).is_err());
        drop(body);
        assert_eq!(probe.close_count(), 0);

        let mut rest = Vec::new();
        channel.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, b"hello");
    }

    #[test]
    fn test_io_read_impl() {
        let mut body = BodyStream::new(MemoryChannel::new("abc"), Some(3), head());
        let mut out = String::new();
        body.read_to_string(&mut out).unwrap();
        assert_eq!(out, "abc");
    }
}
