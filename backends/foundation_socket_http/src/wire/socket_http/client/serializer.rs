//! Request rendering onto a channel.

use std::io::{self, Read};

use super::writer::{write_all, WriteFailure};
use crate::config::ClientConfig;
use crate::netcap::channel::Channel;
use crate::wire::socket_http::{Request, RequestHead};

/// Returns `request` with the headers every outgoing request carries:
/// `Connection: close` (replacing any caller value), `Content-Length` for a
/// non-empty body of known size, and a `User-Agent` when none was given.
#[must_use]
pub fn with_default_headers(request: Request, config: &ClientConfig) -> Request {
    let mut request = request.with_header("Connection", "close");

    if !request.has_header("Content-Length") {
        if let Some(size) = request.body().size().filter(|size| *size > 0) {
            request = request.with_header("Content-Length", size.to_string());
        }
    }

    if !request.has_header("User-Agent") {
        request = request.with_header("User-Agent", config.default_user_agent.clone());
    }

    request
}

/// Request line and header block, including the terminating blank line.
#[must_use]
pub fn render_head(head: &RequestHead) -> Vec<u8> {
    let mut out = format!(
        "{} {} HTTP/{}\r\n",
        head.method,
        head.uri.request_target(),
        head.protocol_version
    );
    for (name, values) in head.headers.iter() {
        out.push_str(name);
        out.push_str(": ");
        out.push_str(&values.join(", "));
        out.push_str("\r\n");
    }
    out.push_str("\r\n");
    out.into_bytes()
}

/// Writes `request` to `channel`: the head, then the body in chunks of the
/// configured buffer size. Returns the number of body bytes sent.
///
/// `request` is expected to already carry its default headers, see
/// [`with_default_headers`].
///
/// # Errors
///
/// Any [`WriteFailure`] from the channel, or [`WriteFailure::Io`] when the
/// body itself cannot be read.
pub fn write_request<C: Channel + ?Sized>(
    channel: &mut C,
    request: &mut Request,
    config: &ClientConfig,
) -> Result<u64, WriteFailure> {
    let head = render_head(request.head());
    write_all(channel, &head, config.write_stall_timeout)?;
    tracing::debug!("Wrote request head ({} bytes)", head.len());

    let body = request.body_mut();
    if !body.is_readable() {
        channel.flush().map_err(WriteFailure::Io)?;
        return Ok(0);
    }

    if body.is_seekable() {
        body.rewind().map_err(WriteFailure::Io)?;
    }

    let mut buffer = vec![0u8; config.effective_write_buffer_size()];
    let mut sent: u64 = 0;
    loop {
        let read = match body.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                return Err(WriteFailure::Io(io::Error::new(
                    err.kind(),
                    format!("reading request body: {err}"),
                )))
            }
        };

        write_all(channel, &buffer[..read], config.write_stall_timeout)?;
        sent += read as u64;
    }

    channel.flush().map_err(WriteFailure::Io)?;
    tracing::debug!("Wrote request body ({} bytes)", sent);
    Ok(sent)
}
