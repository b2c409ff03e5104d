//! Outbound request body handle.

use std::io::{self, Read};

use bytes::Bytes;

/// Body of an outbound request.
///
/// In-memory bodies know their size and can be rewound; streamed bodies
/// are read once and only know their size when the caller provides it.
#[derive(Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Bytes {
        data: Bytes,
        position: usize,
    },
    Stream {
        reader: Box<dyn Read + Send>,
        size: Option<u64>,
    },
}

impl RequestBody {
    pub fn bytes(data: impl Into<Bytes>) -> Self {
        Self::Bytes {
            data: data.into(),
            position: 0,
        }
    }

    pub fn stream(reader: impl Read + Send + 'static, size: Option<u64>) -> Self {
        Self::Stream {
            reader: Box::new(reader),
            size,
        }
    }

    /// Total size in bytes, when known.
    #[must_use]
    pub fn size(&self) -> Option<u64> {
        match self {
            Self::Empty => Some(0),
            Self::Bytes { data, .. } => Some(data.len() as u64),
            Self::Stream { size, .. } => *size,
        }
    }

    #[must_use]
    pub fn is_readable(&self) -> bool {
        !matches!(self, Self::Empty)
    }

    #[must_use]
    pub fn is_seekable(&self) -> bool {
        matches!(self, Self::Bytes { .. })
    }

    /// Moves back to the first byte. Fails for streamed bodies.
    pub fn rewind(&mut self) -> io::Result<()> {
        match self {
            Self::Empty => Ok(()),
            Self::Bytes { position, .. } => {
                *position = 0;
                Ok(())
            }
            Self::Stream { .. } => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "streamed body cannot be rewound",
            )),
        }
    }
}

impl Read for RequestBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Empty => Ok(0),
            Self::Bytes { data, position } => {
                let remaining = &data[(*position).min(data.len())..];
                let count = remaining.len().min(buf.len());
                buf[..count].copy_from_slice(&remaining[..count]);
                *position += count;
                Ok(count)
            }
            Self::Stream { reader, .. } => reader.read(buf),
        }
    }
}

impl core::fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "RequestBody::Empty"),
            Self::Bytes { data, position } => f
                .debug_struct("RequestBody::Bytes")
                .field("len", &data.len())
                .field("position", position)
                .finish(),
            Self::Stream { size, .. } => f
                .debug_struct("RequestBody::Stream")
                .field("size", size)
                .finish_non_exhaustive(),
        }
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(value: Vec<u8>) -> Self {
        Self::bytes(value)
    }
}

impl From<&'static str> for RequestBody {
    fn from(value: &'static str) -> Self {
        Self::bytes(value)
    }
}

impl From<String> for RequestBody {
    fn from(value: String) -> Self {
        Self::bytes(value)
    }
}
