//! Writes that tell backpressure apart from a dead peer.
//!
//! A write that accepts zero bytes is ambiguous: the channel may be
//! momentarily full, or the peer may be gone. [`write_resilient`] probes
//! writability once and retries once to decide. The single retry is a
//! tunable policy rather than a proven rule; callers that need to wait
//! longer use [`write_all`], which bounds its wait with a stall timeout.

use std::io;
use std::time::Duration;

use crate::netcap::channel::{is_transient, Channel};

#[derive(Debug)]
pub enum WriteFailure {
    /// The channel claimed to be writable but still accepted nothing.
    Broken,
    /// No progress was possible within the stall timeout.
    Stalled(Duration),
    Io(io::Error),
}

impl WriteFailure {
    #[must_use]
    pub fn os_code(&self) -> Option<i32> {
        match self {
            Self::Io(err) => err.raw_os_error(),
            _ => None,
        }
    }
}

impl std::error::Error for WriteFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl core::fmt::Display for WriteFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Broken => write!(f, "connection broken: write accepted no bytes"),
            Self::Stalled(wait) => write!(f, "write stalled for {wait:?}"),
            Self::Io(err) => write!(f, "write failed: {err}"),
        }
    }
}

fn attempt<C: Channel + ?Sized>(channel: &mut C, bytes: &[u8]) -> Result<usize, WriteFailure> {
    match channel.write(bytes) {
        Ok(written) => Ok(written),
        Err(err) if is_transient(&err) => Ok(0),
        Err(err) => Err(WriteFailure::Io(err)),
    }
}

/// One write with zero-byte disambiguation.
///
/// Returns the bytes accepted, possibly fewer than `bytes.len()`. `Ok(0)`
/// means transient backpressure and the caller may retry later.
///
/// # Errors
///
/// [`WriteFailure::Broken`] when the channel reports writable yet accepts
/// nothing twice in a row, [`WriteFailure::Io`] for hard write errors.
pub fn write_resilient<C: Channel + ?Sized>(
    channel: &mut C,
    bytes: &[u8],
) -> Result<usize, WriteFailure> {
    if bytes.is_empty() {
        return Ok(0);
    }

    let written = attempt(channel, bytes)?;
    if written > 0 {
        return Ok(written);
    }

    if !channel.poll_writable(Duration::ZERO).map_err(WriteFailure::Io)? {
        tracing::warn!("Channel not writable, backing off ({} bytes pending)", bytes.len());
        return Ok(0);
    }

    match attempt(channel, bytes)? {
        0 => Err(WriteFailure::Broken),
        written => Ok(written),
    }
}

/// Writes all of `bytes`, looping on partial writes and waiting up to
/// `stall_timeout` for writability whenever the channel backs off.
///
/// # Errors
///
/// Any [`write_resilient`] failure, or [`WriteFailure::Stalled`].
pub fn write_all<C: Channel + ?Sized>(
    channel: &mut C,
    mut bytes: &[u8],
    stall_timeout: Duration,
) -> Result<(), WriteFailure> {
    while !bytes.is_empty() {
        let written = write_resilient(channel, bytes)?;
        if written > 0 {
            bytes = &bytes[written..];
            continue;
        }

        if !channel.poll_writable(stall_timeout).map_err(WriteFailure::Io)? {
            return Err(WriteFailure::Stalled(stall_timeout));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netcap::memory::{MemoryChannel, WriteStep};
    use tracing_test::traced_test;

    #[test]
    fn test_nonzero_write_is_returned_as_is() {
        let mut channel = MemoryChannel::new("").with_write_script([WriteStep::Accept(3)]);
        let probe = channel.probe();

        assert_eq!(write_resilient(&mut channel, b"hello").unwrap(), 3);
        assert_eq!(probe.writability_probes(), 0);
        assert_eq!(probe.written(), b"hel");
    }

    /// WHY: A full socket buffer is not an error
    /// WHAT: Zero write plus not-writable probe returns zero without retrying
    #[test]
    #[traced_test]
    fn test_not_writable_is_backpressure() {
        let mut channel = MemoryChannel::new("")
            .with_write_script([WriteStep::Zero])
            .with_writable_script([false]);
        let probe = channel.probe();

        assert_eq!(write_resilient(&mut channel, b"hello").unwrap(), 0);
        assert_eq!(probe.write_calls(), 1);
        assert_eq!(probe.writability_probes(), 1);
        assert!(logs_contain("not writable"));
    }

    /// WHY: A peer that hung up looks writable but never accepts data
    /// WHAT: Writable probe followed by a second zero write is Broken
    #[test]
    fn test_writable_but_zero_is_broken() {
        let mut channel = MemoryChannel::new("")
            .with_write_script([WriteStep::Zero, WriteStep::Zero])
            .with_writable_script([true]);

        assert!(matches!(
            write_resilient(&mut channel, b"hello"),
            Err(WriteFailure::Broken)
        ));
    }

    #[test]
    fn test_retry_after_writable_probe_succeeds() {
        let mut channel = MemoryChannel::new("")
            .with_write_script([WriteStep::Fail(io::ErrorKind::WouldBlock)])
            .with_writable_script([true]);
        let probe = channel.probe();

        assert_eq!(write_resilient(&mut channel, b"hello").unwrap(), 5);
        assert_eq!(probe.written(), b"hello");
    }

    #[test]
    fn test_hard_error_propagates() {
        let mut channel =
            MemoryChannel::new("").with_write_script([WriteStep::Fail(io::ErrorKind::BrokenPipe)]);

        match write_resilient(&mut channel, b"hello") {
            Err(WriteFailure::Io(err)) => assert_eq!(err.kind(), io::ErrorKind::BrokenPipe),
            other => panic!("unexpected {other:?}"),
        }
    }

    /// WHY: Partial writes and backpressure must not lose or reorder bytes
    /// WHAT: write_all loops through short writes and a back-off
    #[test]
    fn test_write_all_handles_partial_and_backoff() {
        let mut channel = MemoryChannel::new("")
            .with_write_script([WriteStep::Accept(2), WriteStep::Zero, WriteStep::Accept(1)])
            .with_writable_script([false, true]);
        let probe = channel.probe();

        write_all(&mut channel, b"abcdef", Duration::from_millis(10)).unwrap();
        assert_eq!(probe.written(), b"abcdef");
    }

    #[test]
    fn test_write_all_stalls() {
        let mut channel = MemoryChannel::new("")
            .with_write_script([WriteStep::Zero])
            .with_writable_script([false, false]);

        assert!(matches!(
            write_all(&mut channel, b"abc", Duration::from_millis(5)),
            Err(WriteFailure::Stalled(_))
        ));
    }
}
