//! Status line and header parsing.

use std::sync::Arc;

use super::body_stream::BodyStream;
use crate::netcap::channel::Channel;
use crate::wire::socket_http::{
    NetworkError, NetworkErrorKind, RequestHead, Response, ResponseFactory,
};

/// Reads header lines up to the first blank line, without line endings.
///
/// # Errors
///
/// `NoHeaders` when nothing was read, `TimedOut` when the channel timed out
/// during the header block, `Read` on channel errors.
pub fn read_head_lines<C: Channel + ?Sized>(
    channel: &mut C,
    request: &Arc<RequestHead>,
) -> Result<Vec<String>, NetworkError> {
    let mut lines = Vec::new();
    let mut buffer = Vec::new();

    loop {
        buffer.clear();
        let read = channel
            .read_line(&mut buffer)
            .map_err(|err| NetworkError::from_io(request.clone(), NetworkErrorKind::Read, &err))?;
        if read == 0 || channel.timed_out() {
            break;
        }

        let line = String::from_utf8_lossy(&buffer);
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            break;
        }
        lines.push(line.to_string());
    }

    if lines.is_empty() {
        return Err(NetworkError::new(
            request.clone(),
            NetworkErrorKind::NoHeaders,
            "no headers",
        ));
    }

    if channel.timed_out() {
        return Err(NetworkError::new(
            request.clone(),
            NetworkErrorKind::TimedOut,
            "response timed out",
        ));
    }

    Ok(lines)
}

/// Status line parts: protocol version, status code, reason phrase.
///
/// # Errors
///
/// `MalformedStatusLine` when there is no status code or it is not numeric.
pub fn parse_status_line(
    line: &str,
    request: &Arc<RequestHead>,
) -> Result<(String, u16, String), NetworkError> {
    let malformed = || {
        NetworkError::new(
            request.clone(),
            NetworkErrorKind::MalformedStatusLine,
            format!("malformed status line: {line:?}"),
        )
    };

    let mut parts = line.splitn(3, ' ');
    let (Some(protocol), Some(status)) = (parts.next(), parts.next()) else {
        return Err(malformed());
    };
    let reason = parts.next().unwrap_or_default();

    let status: u16 = status.trim().parse().map_err(|_| malformed())?;

    // "HTTP/1.1" -> "1.1"
    let version = match protocol.char_indices().rev().nth(2) {
        Some((index, _)) => &protocol[index..],
        None => protocol,
    };

    Ok((version.to_string(), status, reason.trim().to_string()))
}

/// Splits a header line on its first colon. Lines without one become a
/// header with an empty value.
#[must_use]
pub fn parse_header_line(line: &str) -> (&str, &str) {
    match line.split_once(':') {
        Some((name, value)) => (name.trim(), value.trim()),
        None => {
            tracing::warn!("Header line without colon: {:?}", line);
            (line.trim(), "")
        }
    }
}

/// Builds the response from the head lines, status line first.
///
/// # Errors
///
/// See [`parse_status_line`].
pub fn parse_head<F: ResponseFactory + ?Sized>(
    lines: &[String],
    factory: &F,
    request: &Arc<RequestHead>,
) -> Result<Response, NetworkError> {
    let Some((status_line, header_lines)) = lines.split_first() else {
        return Err(NetworkError::new(
            request.clone(),
            NetworkErrorKind::NoHeaders,
            "no headers",
        ));
    };

    let (version, status, reason) = parse_status_line(status_line, request)?;
    tracing::debug!("Received status line: {}", status_line);

    let mut response = factory
        .create_response(status, &reason)
        .with_protocol_version(version);
    for line in header_lines {
        let (name, value) = parse_header_line(line);
        response = response.with_added_header(name, value);
    }

    Ok(response)
}

/// Reads one response from `channel` and hands the channel to its body.
///
/// The channel is closed before any error is returned.
///
/// # Errors
///
/// See [`read_head_lines`] and [`parse_status_line`].
pub fn read_response<C: Channel, F: ResponseFactory + ?Sized>(
    mut channel: C,
    factory: &F,
    request: Arc<RequestHead>,
) -> Result<Response<BodyStream<C>>, NetworkError> {
    let parsed = read_head_lines(&mut channel, &request)
        .and_then(|lines| parse_head(&lines, factory, &request));

    let response = match parsed {
        Ok(response) => response,
        Err(err) => {
            if let Err(close_err) = channel.close() {
                tracing::debug!("Closing channel after failed read: {}", close_err);
            }
            return Err(err);
        }
    };

    let size = content_length(&response);
    Ok(response.with_body(BodyStream::new(channel, size, request)))
}

fn content_length<B>(response: &Response<B>) -> Option<u64> {
    let value = response.header("Content-Length").first()?;
    match value.trim().parse() {
        Ok(size) => Some(size),
        Err(_) => {
            tracing::warn!("Ignoring invalid Content-Length {:?}", value);
            None
        }
    }
}
