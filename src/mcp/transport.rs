//! MCP transport layer.
//!
//! Newline-delimited envelopes over any async byte stream. The transport
//! hands out exactly one line per call and never reads ahead, so the server
//! loop decides when the next request is looked at.

use async_trait::async_trait;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout,
};
use tracing::{debug, trace};

use crate::error::Result;

/// Transport trait for MCP communication.
#[async_trait]
pub trait Transport: Send {
    /// Read the next line, without its terminator. `None` at end of input.
    async fn read_line(&mut self) -> Result<Option<String>>;

    /// Write one already-terminated line and flush it.
    async fn write_line(&mut self, line: &str) -> Result<()>;
}

/// Line transport over a buffered reader and a writer.
pub struct LineTransport<R, W> {
    reader: R,
    writer: W,
    buf: Vec<u8>,
}

/// Stdio transport for MCP.
pub type StdioTransport = LineTransport<BufReader<Stdin>, Stdout>;

impl<R, W> LineTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Create a transport over the given streams.
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            buf: Vec::with_capacity(4096),
        }
    }

    /// Give back the writer (used by tests to inspect output).
    pub fn into_writer(self) -> W {
        self.writer
    }
}

impl LineTransport<BufReader<Stdin>, Stdout> {
    /// Transport over the process's stdin/stdout.
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

#[async_trait]
impl<R, W> Transport for LineTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn read_line(&mut self) -> Result<Option<String>> {
        self.buf.clear();
        let n = self.reader.read_until(b'\n', &mut self.buf).await?;
        if n == 0 {
            debug!("EOF on input, stopping transport");
            return Ok(None);
        }

        // Invalid UTF-8 is a bad line for the codec to reject, not a broken stream.
        let line = String::from_utf8_lossy(&self.buf);
        let line = line.trim_end_matches(&['\n', '\r'][..]).to_string();
        trace!("Received: {}", line);
        Ok(Some(line))
    }

    async fn write_line(&mut self, line: &str) -> Result<()> {
        trace!("Sending: {}", line.trim_end());
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reads_one_line_at_a_time() {
        let input: &[u8] = b"first\r\nsecond\nthird";
        let mut transport = LineTransport::new(input, Vec::new());

        assert_eq!(transport.read_line().await.unwrap().as_deref(), Some("first"));
        assert_eq!(transport.read_line().await.unwrap().as_deref(), Some("second"));
        assert_eq!(transport.read_line().await.unwrap().as_deref(), Some("third"));
        assert_eq!(transport.read_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_still_a_line() {
        let input: &[u8] = b"\xff\xfe\n";
        let mut transport = LineTransport::new(input, Vec::new());

        let line = transport.read_line().await.unwrap().unwrap();
        assert!(!line.is_empty());
    }

    #[tokio::test]
    async fn test_write_line_passes_through() {
        let input: &[u8] = b"";
        let mut transport = LineTransport::new(input, Vec::new());
        transport.write_line("{\"id\":null}\n").await.unwrap();

        let written = transport.into_writer();
        assert_eq!(written, b"{\"id\":null}\n");
    }

    #[tokio::test]
    async fn test_line_split_across_reads() {
        let reader = tokio_test::io::Builder::new()
            .read(b"{\"jsonrpc\":")
            .read(b"\"2.0\"}\n{\"id\"")
            .read(b":1}\n")
            .build();
        let writer = tokio_test::io::Builder::new().write(b"ok\n").build();
        let mut transport = LineTransport::new(BufReader::new(reader), writer);

        assert_eq!(
            transport.read_line().await.unwrap().as_deref(),
            Some("{\"jsonrpc\":\"2.0\"}")
        );
        assert_eq!(transport.read_line().await.unwrap().as_deref(), Some("{\"id\":1}"));
        assert_eq!(transport.read_line().await.unwrap(), None);
        transport.write_line("ok\n").await.unwrap();
    }
}
