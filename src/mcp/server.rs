//! Stdio MCP server session.
//!
//! Reads chunks from the input stream, splits them into frames, and answers
//! each frame in arrival order before looking at the next one.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tracing::{debug, info};

use super::dispatcher::Dispatcher;
use super::framing::MessageFramer;
use super::writer::{ResponseWriter, WriteError};

/// Bytes requested per read unless configured otherwise.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 4096;

/// Error type for server sessions.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to read input: {0}")]
    Read(#[source] std::io::Error),

    #[error(transparent)]
    Write(#[from] WriteError),
}

/// Counters describing a finished (or running) session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Bytes read from input
    pub bytes_read: u64,
    /// Frames extracted
    pub frames: u64,
    /// Responses written
    pub responses: u64,
    /// Corrupt header blocks skipped
    pub resyncs: u64,
}

/// One server session over an input and output stream.
#[derive(Debug)]
pub struct Server<R, W> {
    input: R,
    writer: ResponseWriter<W>,
    framer: MessageFramer,
    dispatcher: Dispatcher,
    chunk_size: usize,
    stats: SessionStats,
}

impl<R, W> Server<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Create a session.
    pub fn new(input: R, output: W, dispatcher: Dispatcher) -> Self {
        Self {
            input,
            writer: ResponseWriter::new(output),
            framer: MessageFramer::new(),
            dispatcher,
            chunk_size: DEFAULT_READ_CHUNK_SIZE,
            stats: SessionStats::default(),
        }
    }

    /// Set how many bytes to request per read. Zero is treated as one.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Session counters so far.
    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Run until the input reaches end-of-stream.
    ///
    /// Bytes left in the framer at end-of-stream (an unterminated line or a
    /// truncated body) are dropped without a reply.
    pub async fn run(&mut self) -> Result<SessionStats, ServerError> {
        info!(tools = self.dispatcher.registry().len(), "MCP server ready");
        let mut chunk = vec![0u8; self.chunk_size];

        loop {
            let n = self.input.read(&mut chunk).await.map_err(ServerError::Read)?;
            if n == 0 {
                break;
            }
            self.stats.bytes_read += n as u64;
            self.framer.append(&chunk[..n]);
            self.drain().await?;
        }

        self.stats.resyncs = self.framer.resyncs();
        if self.framer.buffered() > 0 {
            debug!(bytes = self.framer.buffered(), "discarding incomplete message at end of input");
        }
        info!(
            frames = self.stats.frames,
            responses = self.stats.responses,
            resyncs = self.stats.resyncs,
            "input closed, shutting down"
        );
        Ok(self.stats)
    }

    /// Answer every complete frame currently buffered.
    async fn drain(&mut self) -> Result<(), ServerError> {
        while let Some(frame) = self.framer.next_message() {
            self.stats.frames += 1;
            debug!(framing = ?frame.framing, len = frame.payload.len(), "frame received");

            if let Some(response) = self.dispatcher.handle_frame(&frame.payload).await {
                self.writer.write(&response).await?;
                self.stats.responses += 1;
            }
        }
        self.stats.resyncs = self.framer.resyncs();
        Ok(())
    }

    /// Unwrap the output stream.
    pub fn into_output(self) -> W {
        self.writer.into_inner()
    }
}

/// Serve on the process's stdin and stdout until stdin closes.
pub async fn run_stdio(dispatcher: Dispatcher, chunk_size: usize) -> Result<SessionStats, ServerError> {
    let mut server =
        Server::new(tokio::io::stdin(), tokio::io::stdout(), dispatcher).with_chunk_size(chunk_size);
    server.run().await
}
