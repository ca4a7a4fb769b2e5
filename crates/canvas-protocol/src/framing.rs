//! Newline-delimited frames over byte transports
//!
//! One frame per line. Frames never contain a raw newline because JSON
//! escapes them inside strings.

use crate::codec::Frame;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Writes frames as NDJSON
#[derive(Debug)]
pub struct FrameWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    #[inline]
    #[must_use]
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Write one frame followed by `\n` and flush
    ///
    /// # Errors
    /// Transport write failure
    pub async fn write_frame(&mut self, frame: &Frame) -> std::io::Result<()> {
        self.inner.write_all(frame.as_str().as_bytes()).await?;
        self.inner.write_all(b"\n").await?;
        self.inner.flush().await
    }

    #[inline]
    #[must_use]
    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Reads NDJSON lines back into frames
#[derive(Debug)]
pub struct FrameReader<R> {
    inner: R,
    line: String,
}

impl<R: AsyncBufRead + Unpin> FrameReader<R> {
    #[inline]
    #[must_use]
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            line: String::new(),
        }
    }

    /// Next non-blank line, `None` at end of input
    ///
    /// # Errors
    /// Transport read failure or invalid UTF-8
    pub async fn next_frame(&mut self) -> std::io::Result<Option<Frame>> {
        loop {
            self.line.clear();
            if self.inner.read_line(&mut self.line).await? == 0 {
                return Ok(None);
            }
            let trimmed = self.line.trim();
            if !trimmed.is_empty() {
                return Ok(Some(Frame::from_raw(trimmed)));
            }
        }
    }
}
