//! In-memory [`Channel`] with scripted behaviour.
//!
//! Serves a fixed byte string to readers and records everything written.
//! Write results and writability probes can be scripted to reproduce
//! backpressure and broken peers; reads can be capped per call and cut off
//! by a simulated timeout.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use super::channel::{closed_error, Channel};

/// Scripted outcome of one `write` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStep {
    /// Accept at most this many bytes.
    Accept(usize),
    /// Accept nothing.
    Zero,
    /// Fail with this error kind.
    Fail(io::ErrorKind),
}

#[derive(Debug, Default)]
struct Observed {
    written: Mutex<Vec<u8>>,
    closes: AtomicUsize,
    write_calls: AtomicUsize,
    probes: AtomicUsize,
}

/// Read-only view onto what happened to a [`MemoryChannel`], usable after
/// the channel itself has been moved into a response.
#[derive(Debug, Clone)]
pub struct ChannelProbe(Arc<Observed>);

impl ChannelProbe {
    #[must_use]
    pub fn written(&self) -> Vec<u8> {
        self.0
            .written
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn written_string(&self) -> String {
        String::from_utf8_lossy(&self.written()).into_owned()
    }

    #[must_use]
    pub fn close_count(&self) -> usize {
        self.0.closes.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.close_count() > 0
    }

    #[must_use]
    pub fn write_calls(&self) -> usize {
        self.0.write_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn writability_probes(&self) -> usize {
        self.0.probes.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct MemoryChannel {
    input: Vec<u8>,
    cursor: usize,
    read_chunk: Option<usize>,
    timeout_at: Option<usize>,
    write_script: VecDeque<WriteStep>,
    writable_script: VecDeque<bool>,
    timed_out: bool,
    eof: bool,
    closed: bool,
    observed: Arc<Observed>,
}

impl MemoryChannel {
    /// A channel whose peer sends `input` and then closes.
    pub fn new(input: impl Into<Vec<u8>>) -> Self {
        Self {
            input: input.into(),
            cursor: 0,
            read_chunk: None,
            timeout_at: None,
            write_script: VecDeque::new(),
            writable_script: VecDeque::new(),
            timed_out: false,
            eof: false,
            closed: false,
            observed: Arc::new(Observed::default()),
        }
    }

    /// Caps every `read` at `size` bytes, like a socket delivering short reads.
    #[must_use]
    pub fn with_read_chunk(mut self, size: usize) -> Self {
        self.read_chunk = Some(size.max(1));
        self
    }

    /// After `offset` bytes have been read, further reads time out.
    #[must_use]
    pub fn with_timeout_after(mut self, offset: usize) -> Self {
        self.timeout_at = Some(offset);
        self
    }

    /// Outcomes for the next write calls; once used up writes accept everything.
    #[must_use]
    pub fn with_write_script(mut self, steps: impl IntoIterator<Item = WriteStep>) -> Self {
        self.write_script.extend(steps);
        self
    }

    /// Answers for the next writability probes; once used up probes say writable.
    #[must_use]
    pub fn with_writable_script(mut self, answers: impl IntoIterator<Item = bool>) -> Self {
        self.writable_script.extend(answers);
        self
    }

    #[must_use]
    pub fn probe(&self) -> ChannelProbe {
        ChannelProbe(self.observed.clone())
    }

    /// End of the readable window: the input length or the timeout offset.
    fn limit(&self) -> usize {
        match self.timeout_at {
            Some(offset) => offset.min(self.input.len()),
            None => self.input.len(),
        }
    }

    /// Marks the end of the readable window as EOF or timeout.
    fn hit_limit(&mut self) {
        if self.timeout_at.is_some_and(|offset| offset < self.input.len()) {
            self.timed_out = true;
        } else {
            self.eof = true;
        }
    }
}

impl Channel for MemoryChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.closed {
            return Err(closed_error());
        }
        if buf.is_empty() {
            return Ok(0);
        }

        let limit = self.limit();
        if self.cursor >= limit {
            self.hit_limit();
            return Ok(0);
        }

        let mut wanted = buf.len().min(limit - self.cursor);
        if let Some(chunk) = self.read_chunk {
            wanted = wanted.min(chunk);
        }
        buf[..wanted].copy_from_slice(&self.input[self.cursor..self.cursor + wanted]);
        self.cursor += wanted;
        Ok(wanted)
    }

    fn read_line(&mut self, line: &mut Vec<u8>) -> io::Result<usize> {
        if self.closed {
            return Err(closed_error());
        }

        let limit = self.limit();
        if self.cursor >= limit {
            self.hit_limit();
            return Ok(0);
        }

        let window = &self.input[self.cursor..limit];
        let end = match window.iter().position(|byte| *byte == b'\n') {
            Some(index) => index + 1,
            None => window.len(),
        };
        line.extend_from_slice(&window[..end]);
        self.cursor += end;
        if self.cursor >= limit && !line.ends_with(b"\n") {
            self.hit_limit();
        }
        Ok(end)
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        if self.closed {
            return Err(closed_error());
        }
        self.observed.write_calls.fetch_add(1, Ordering::SeqCst);

        let accepted = match self.write_script.pop_front() {
            Some(WriteStep::Accept(max)) => bytes.len().min(max),
            Some(WriteStep::Zero) => 0,
            Some(WriteStep::Fail(kind)) => return Err(io::Error::from(kind)),
            None => bytes.len(),
        };

        self.observed
            .written
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(&bytes[..accepted]);
        Ok(accepted)
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.closed {
            return Err(closed_error());
        }
        Ok(())
    }

    fn poll_writable(&mut self, _wait: Duration) -> io::Result<bool> {
        if self.closed {
            return Err(closed_error());
        }
        self.observed.probes.fetch_add(1, Ordering::SeqCst);
        Ok(self.writable_script.pop_front().unwrap_or(true))
    }

    fn timed_out(&self) -> bool {
        self.timed_out
    }

    fn eof(&self) -> bool {
        self.eof
    }

    fn position(&self) -> u64 {
        self.cursor as u64
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn close(&mut self) -> io::Result<()> {
        if !self.closed {
            self.closed = true;
            self.observed.closes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}
