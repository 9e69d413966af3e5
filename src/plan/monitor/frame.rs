//! Decoder for the engine's multiplexed log stream.
//!
//! Each frame is an 8-byte header followed by its payload:
//!
//! ```text
//! [stream type: u8][0, 0, 0][payload length: u32 big-endian][payload...]
//! ```
//!
//! Stream type is 0 for stdin, 1 for stdout and 2 for stderr.

use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};

pub const HEADER_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdin,
    Stdout,
    Stderr,
    Other(u8),
}

impl From<u8> for StreamKind {
    fn from(b: u8) -> Self {
        match b {
            0 => Self::Stdin,
            1 => Self::Stdout,
            2 => Self::Stderr,
            other => Self::Other(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub kind: StreamKind,
    pub len: u32,
}

impl FrameHeader {
    pub fn parse(raw: &[u8; HEADER_LEN]) -> Self {
        Self {
            kind: StreamKind::from(raw[0]),
            len: u32::from_be_bytes([raw[4], raw[5], raw[6], raw[7]]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: StreamKind,
    pub payload: Vec<u8>,
}

impl Frame {
    /// Payload as text with the trailing line break removed.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.payload)
            .trim_end_matches(['\r', '\n'])
            .to_string()
    }
}

/// Reads frames one at a time from a log stream.
pub struct FrameReader<R> {
    inner: R,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Next frame, `None` on a clean end of stream.
    ///
    /// End of stream inside a header or payload is an
    /// [`io::ErrorKind::UnexpectedEof`] error.
    pub async fn next_frame(&mut self) -> io::Result<Option<Frame>> {
        let mut raw = [0u8; HEADER_LEN];
        let mut filled = 0;
        while filled < HEADER_LEN {
            let n = self.inner.read(&mut raw[filled..]).await?;
            if n == 0 {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("truncated frame header: got {filled} of {HEADER_LEN} bytes"),
                ));
            }
            filled += n;
        }

        let header = FrameHeader::parse(&raw);
        let expected = header.len as usize;
        let mut payload = Vec::with_capacity(expected.min(64 * 1024));
        (&mut self.inner)
            .take(u64::from(header.len))
            .read_to_end(&mut payload)
            .await?;
        if payload.len() < expected {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "truncated frame payload: got {} of {expected} bytes",
                    payload.len()
                ),
            ));
        }

        Ok(Some(Frame {
            kind: header.kind,
            payload,
        }))
    }
}
