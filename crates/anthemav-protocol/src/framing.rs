//! Line framing for the receiver's text protocol.
//!
//! Outgoing commands end with `;`. Incoming data is split on `;`, `\r` and
//! `\n`; empty segments are dropped and surrounding whitespace trimmed.
//!
//! ```text
//! Z1POW1;Z1VOL-35;\r\nIDMMRX 720;
//! ```

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::warn;

use crate::MAX_LINE_LENGTH;
use crate::error::{ProtocolError, ProtocolResult};

/// Command terminator appended to every outgoing line.
pub const TERMINATOR: &str = ";";

fn is_delimiter(byte: u8) -> bool {
    matches!(byte, b';' | b'\r' | b'\n')
}

/// Renders a command as wire bytes.
pub fn encode_line(command: &str) -> ProtocolResult<Vec<u8>> {
    let len = command.len() + TERMINATOR.len();
    if len > MAX_LINE_LENGTH {
        return Err(ProtocolError::LineTooLong {
            len,
            max: MAX_LINE_LENGTH,
        });
    }

    let mut buffer = Vec::with_capacity(len);
    buffer.extend_from_slice(command.as_bytes());
    buffer.extend_from_slice(TERMINATOR.as_bytes());
    Ok(buffer)
}

/// Incremental splitter turning arbitrary byte chunks into lines.
#[derive(Debug, Default)]
pub struct LineDecoder {
    pending: Vec<u8>,
    discarding: bool,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk and returns every line it completes.
    ///
    /// A partial line longer than [`MAX_LINE_LENGTH`] is dropped up to its
    /// next delimiter.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();

        for &byte in chunk {
            if is_delimiter(byte) {
                if self.discarding {
                    self.discarding = false;
                } else if let Some(line) = self.take_line() {
                    lines.push(line);
                }
                continue;
            }

            if self.discarding {
                continue;
            }

            self.pending.push(byte);
            if self.pending.len() > MAX_LINE_LENGTH {
                warn!(
                    len = self.pending.len(),
                    max = MAX_LINE_LENGTH,
                    "discarding overlong line"
                );
                self.pending.clear();
                self.discarding = true;
            }
        }

        lines
    }

    /// Bytes buffered for a line not yet terminated.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn take_line(&mut self) -> Option<String> {
        let raw = std::mem::take(&mut self.pending);
        let line = String::from_utf8_lossy(&raw).trim().to_string();
        (!line.is_empty()).then_some(line)
    }
}

/// Reads delimited lines from an async byte stream.
pub struct LineReader<R> {
    reader: R,
    decoder: LineDecoder,
    ready: std::collections::VecDeque<String>,
    buf: Box<[u8]>,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            decoder: LineDecoder::new(),
            ready: std::collections::VecDeque::new(),
            buf: vec![0u8; 4096].into_boxed_slice(),
        }
    }

    /// Returns the next non-empty line.
    ///
    /// Returns `Ok(None)` once the peer closes the stream. A trailing
    /// unterminated fragment at EOF is dropped.
    pub async fn next_line(&mut self) -> ProtocolResult<Option<String>> {
        loop {
            if let Some(line) = self.ready.pop_front() {
                return Ok(Some(line));
            }

            let n = self.reader.read(&mut self.buf).await?;
            if n == 0 {
                return Ok(None);
            }
            self.ready.extend(self.decoder.push(&self.buf[..n]));
        }
    }

    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

/// Writes terminated commands to an async byte stream.
pub struct LineWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> LineWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes one command followed by the terminator and flushes.
    pub async fn write_line(&mut self, command: &str) -> ProtocolResult<()> {
        let data = encode_line(command)?;
        self.writer.write_all(&data).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Shuts down the write half.
    pub async fn shutdown(&mut self) -> ProtocolResult<()> {
        self.writer.shutdown().await?;
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
